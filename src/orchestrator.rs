use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{ watch, Mutex };
use tokio::time::MissedTickBehavior;
use tracing::{ debug, error, info, warn };
use uuid::Uuid;

use crate::dex::{ QuoteRequest, RoutedQuote, RouteQuoter };
use crate::enums::{ NotificationKind, SwapStatus };
use crate::error::{ AppError, Result };
use crate::executor::SwapExecutor;
use crate::limits::LimitTracker;
use crate::notify::{ HistoryStore, Notifier, SwapEvent, SwapHistoryEntry };
use crate::providers::{ ChainProvider, WalletSigner };
use crate::rules::{ RuleStore, TokenRule, UserConfig };
use crate::tokens;

struct Session {
    stop: watch::Sender<bool>,
}

/// Drives the auto-swap lifecycle: per-wallet activation with an approval
/// pre-step, a periodic evaluation loop over the wallet's enabled rules, and
/// clean deactivation. One wallet's rules are always evaluated sequentially;
/// a failing rule never blocks the ones after it.
pub struct Orchestrator {
    rules: Arc<RuleStore>,
    limits: Arc<LimitTracker>,
    provider: Arc<dyn ChainProvider>,
    quoter: Arc<RouteQuoter>,
    executor: Arc<SwapExecutor>,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
    poll_interval: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<RuleStore>,
        limits: Arc<LimitTracker>,
        provider: Arc<dyn ChainProvider>,
        quoter: Arc<RouteQuoter>,
        executor: Arc<SwapExecutor>,
        history: Arc<HistoryStore>,
        notifier: Arc<Notifier>,
        poll_interval: Duration
    ) -> Self {
        Self {
            rules,
            limits,
            provider,
            quoter,
            executor,
            history,
            notifier,
            poll_interval,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn is_active(&self, wallet: &str) -> bool {
        self.sessions.lock().await.contains_key(wallet)
    }

    /// Start auto-swapping for the signer's wallet. Runs the approval
    /// pre-step for every enabled rule first; activation fails as a whole if
    /// any approval is denied. A second activation for an already active
    /// wallet is rejected.
    pub async fn activate(self: &Arc<Self>, signer: Arc<dyn WalletSigner>) -> Result<()> {
        let wallet = signer.pubkey().to_string();

        // Reserve the session slot first and release the map lock before the
        // approval round-trips, which can suspend on wallet interaction.
        // Other wallets' activations and deactivations must not wait on them.
        let (stop, stop_rx) = watch::channel(false);
        {
            let mut sessions = self.sessions.lock().await;
            if sessions.contains_key(&wallet) {
                return Err(
                    AppError::Validation(format!("Auto-swap is already active for {}", wallet))
                );
            }
            sessions.insert(wallet.clone(), Session { stop });
        }

        let prepared = match self.rules.load(&wallet).await {
            Ok(config) => self.approve_enabled_rules(&wallet, &config, signer.as_ref()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = prepared {
            self.sessions.lock().await.remove(&wallet);
            return Err(e);
        }

        let this = self.clone();
        let loop_wallet = wallet.clone();
        tokio::spawn(async move {
            this.run_loop(loop_wallet, signer, stop_rx).await;
        });

        info!("Auto-swap activated for {}", wallet);
        self.notifier.publish(
            SwapEvent::new(
                NotificationKind::Info,
                &wallet,
                "Auto-swap activated",
                "Token rules will be evaluated periodically".to_string()
            )
        );

        Ok(())
    }

    /// Stop the wallet's evaluation loop. Idempotent.
    pub async fn deactivate(&self, wallet: &str) {
        let session = self.sessions.lock().await.remove(wallet);

        if let Some(session) = session {
            let _ = session.stop.send(true);
            info!("Auto-swap deactivated for {}", wallet);
            self.notifier.publish(
                SwapEvent::new(
                    NotificationKind::Info,
                    wallet,
                    "Auto-swap deactivated",
                    "The evaluation loop has been stopped".to_string()
                )
            );
        }
    }

    async fn approve_enabled_rules(
        &self,
        wallet: &str,
        config: &UserConfig,
        signer: &dyn WalletSigner
    ) -> Result<()> {
        for rule in config.enabled_rules() {
            let decimals = match tokens::get_token_by_mint(&rule.mint) {
                Some(info) => info.decimals,
                None => self.provider.get_token_balance(wallet, &rule.mint).await?.decimals,
            };

            self.executor.ensure_allowance(signer, rule, decimals).await?;
        }
        Ok(())
    }

    async fn run_loop(
        self: Arc<Self>,
        wallet: String,
        signer: Arc<dyn WalletSigner>,
        mut stop: watch::Receiver<bool>
    ) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Deactivation may have raced the spawn.
            if *stop.borrow() {
                debug!("Evaluation loop for {} stopped", wallet);
                return;
            }

            tokio::select! {
                _ = stop.changed() => {
                    debug!("Evaluation loop for {} stopped", wallet);
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle(&wallet, signer.as_ref(), &stop).await {
                        error!("Orchestration cycle for {} failed: {}", wallet, e);
                    }
                }
            }
        }
    }

    /// One evaluation pass over the wallet's rules. Per-rule failures are
    /// reported and swallowed so the remaining rules still run. A
    /// deactivation request lets an in-flight rule finish but stops before
    /// the next one.
    pub async fn run_cycle(
        &self,
        wallet: &str,
        signer: &dyn WalletSigner,
        stop: &watch::Receiver<bool>
    ) -> Result<()> {
        let config = self.rules.load(wallet).await?;

        if !config.auto_swap_enabled {
            debug!("Auto-swap master switch is off for {}, skipping cycle", wallet);
            return Ok(());
        }

        for rule in config.enabled_rules() {
            if *stop.borrow() {
                debug!("Deactivation requested for {}, stopping mid-cycle", wallet);
                return Ok(());
            }

            if let Err(e) = self.evaluate_rule(wallet, &config, rule, signer).await {
                warn!("Rule {} for {} failed this cycle: {}", rule.symbol, wallet, e);
            }
        }

        Ok(())
    }

    async fn evaluate_rule(
        &self,
        wallet: &str,
        config: &UserConfig,
        rule: &TokenRule,
        signer: &dyn WalletSigner
    ) -> Result<()> {
        let balance = self.provider.get_token_balance(wallet, &rule.mint).await?;

        if balance.amount < rule.min_amount {
            debug!(
                "{} balance {} below trigger {} for {}, skipping",
                rule.symbol,
                balance.amount,
                rule.min_amount,
                wallet
            );
            return Ok(());
        }

        let amount = balance.amount.min(rule.max_amount);

        let within_caps = self.limits.check_limit(
            wallet,
            &rule.mint,
            amount,
            config.limits.daily,
            config.limits.monthly
        ).await?;

        if !within_caps {
            self.notifier.publish(
                SwapEvent::new(
                    NotificationKind::Warning,
                    wallet,
                    "Spend limit reached",
                    format!("Swapping {} {} would exceed a spend cap", amount, rule.symbol)
                )
            );
            return Ok(());
        }

        let output_mint = tokens
            ::resolve_mint(&rule.target_stablecoin)
            .unwrap_or_else(|| rule.target_stablecoin.clone());

        let request = QuoteRequest {
            input_mint: rule.mint.clone(),
            output_mint,
            amount_base: tokens::to_base_units(amount, balance.decimals),
            slippage_bps: rule.slippage_bps(),
        };

        let routed = match self.quoter.best_quote(&request).await {
            Ok(routed) => routed,
            Err(AppError::NoRouteFound) => {
                self.notifier.publish(
                    SwapEvent::new(
                        NotificationKind::Info,
                        wallet,
                        "No route found",
                        format!(
                            "No aggregator offered a route for {} -> {}",
                            rule.symbol,
                            rule.target_stablecoin
                        )
                    )
                );
                return Ok(());
            }
            Err(e) => {
                return Err(e);
            }
        };

        info!(
            "Best route for {} {}: {} via {}",
            amount,
            rule.symbol,
            routed.quote.out_amount,
            routed.quote.aggregator
        );

        // An approval denial is a permanent, rule-scoped failure and must
        // reach the user like an exhausted execution, not just the log.
        if let Err(e) = self.executor.ensure_allowance(signer, rule, balance.decimals).await {
            self.record_outcome(wallet, rule, amount, &routed, Err(&e)).await;
            return Ok(());
        }

        match self.executor.execute(rule, amount, &routed, signer).await {
            Ok(execution) => {
                self.limits.record_spend(wallet, &rule.mint, amount).await?;
                self.record_outcome(wallet, rule, amount, &routed, Ok(&execution.signature)).await;
            }
            Err(e) => {
                self.record_outcome(wallet, rule, amount, &routed, Err(&e)).await;
            }
        }

        Ok(())
    }

    async fn record_outcome(
        &self,
        wallet: &str,
        rule: &TokenRule,
        amount: f64,
        routed: &RoutedQuote,
        outcome: std::result::Result<&str, &AppError>
    ) {
        let out_decimals = tokens
            ::get_token_by_mint(&routed.quote.output_mint)
            .map(|info| info.decimals)
            .unwrap_or(6);

        let entry = SwapHistoryEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            wallet: wallet.to_string(),
            from_token: rule.symbol.clone(),
            to_token: rule.target_stablecoin.clone(),
            from_amount: amount,
            to_amount: outcome
                .is_ok()
                .then(|| tokens::from_base_units(routed.quote.out_amount, out_decimals)),
            status: if outcome.is_ok() {
                SwapStatus::Success
            } else {
                SwapStatus::Failed
            },
            aggregator: Some(routed.quote.aggregator.clone()),
            signature: outcome.ok().map(|s| s.to_string()),
            error: outcome.err().map(|e| e.to_string()),
        };

        if let Err(e) = self.history.record(entry).await {
            error!("Failed to record swap history for {}: {}", wallet, e);
        }

        match outcome {
            Ok(signature) => {
                self.notifier.publish(
                    SwapEvent::new(
                        NotificationKind::Success,
                        wallet,
                        "Swap completed",
                        format!(
                            "Swapped {} {} to {} ({})",
                            amount,
                            rule.symbol,
                            rule.target_stablecoin,
                            signature
                        )
                    )
                );
            }
            Err(e) => {
                self.notifier.publish(
                    SwapEvent::new(
                        NotificationKind::Error,
                        wallet,
                        "Swap failed",
                        format!("Swapping {} {} failed: {}", amount, rule.symbol, e)
                    )
                );
            }
        }
    }
}
