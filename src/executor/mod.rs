use std::sync::Arc;
use std::time::Duration;

use tokio::time::{ sleep, timeout };
use tracing::{ info, warn };
use uuid::Uuid;

use crate::dex::RoutedQuote;
use crate::error::{ AppError, Result };
use crate::providers::{ ChainProvider, WalletSigner };
use crate::rules::TokenRule;
use crate::tokens;

pub mod retry;
use retry::{ retry_delay, RetryPolicy };

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Phase timeouts for one swap attempt. Signing gets its own bound because
/// it can block on out-of-band user or hardware interaction.
#[derive(Debug, Clone)]
pub struct ExecutionTimeouts {
    pub sign: Duration,
    pub submit: Duration,
    pub confirm: Duration,
}

impl Default for ExecutionTimeouts {
    fn default() -> Self {
        Self {
            sign: Duration::from_secs(120),
            submit: Duration::from_secs(30),
            confirm: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Pending,
    Success(String),
    Failed(String),
}

/// One execution try. Reaches exactly one terminal outcome and is never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct SwapAttempt {
    pub id: Uuid,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
}

impl SwapAttempt {
    fn started(attempt: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt,
            outcome: AttemptOutcome::Pending,
        }
    }
}

/// Result of a successful execution.
#[derive(Debug, Clone)]
pub struct SwapExecution {
    pub signature: String,
    pub attempts: u32,
}

/// Builds, signs, submits, and confirms swap transactions under a bounded
/// retry policy with exponential backoff.
pub struct SwapExecutor {
    provider: Arc<dyn ChainProvider>,
    policy: RetryPolicy,
    timeouts: ExecutionTimeouts,
    /// Delegate granted token allowances for automated swaps.
    authority: String,
}

impl SwapExecutor {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        policy: RetryPolicy,
        timeouts: ExecutionTimeouts,
        authority: String
    ) -> Self {
        Self {
            provider,
            policy,
            timeouts,
            authority,
        }
    }

    /// Idempotent approval pre-step: make sure the swap authority may move
    /// up to the rule's maximum amount. Not retried; a failure here aborts
    /// the rule with `ApprovalDenied`.
    pub async fn ensure_allowance(
        &self,
        signer: &dyn WalletSigner,
        rule: &TokenRule,
        decimals: u8
    ) -> Result<()> {
        let wallet = signer.pubkey().to_string();
        let needed = tokens::to_base_units(rule.max_amount, decimals);

        let current = self.provider
            .delegated_amount(&wallet, &rule.mint, &self.authority).await
            .map_err(|e|
                AppError::ApprovalDenied(
                    format!("Could not read allowance for {}: {}", rule.symbol, e)
                )
            )?;

        if current >= needed {
            return Ok(());
        }

        let signature = self.provider
            .approve_delegate(signer, &rule.mint, &self.authority, needed).await
            .map_err(|e|
                AppError::ApprovalDenied(format!("Approval for {} failed: {}", rule.symbol, e))
            )?;

        info!("Approved {} allowance for {} ({})", rule.max_amount, rule.symbol, signature);
        Ok(())
    }

    /// Run the swap with bounded retries. Returns the confirmed signature,
    /// or the last attempt's error once retries are exhausted.
    pub async fn execute(
        &self,
        rule: &TokenRule,
        amount: f64,
        routed: &RoutedQuote,
        signer: &dyn WalletSigner
    ) -> Result<SwapExecution> {
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=self.policy.max_retries {
            let delay = retry_delay(attempt, &self.policy);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            let mut record = SwapAttempt::started(attempt);

            match self.attempt_swap(routed, signer).await {
                Ok(signature) => {
                    record.outcome = AttemptOutcome::Success(signature.clone());
                    info!(
                        "Swap {} {} -> {} confirmed on attempt {}/{}: {}",
                        amount,
                        rule.symbol,
                        rule.target_stablecoin,
                        attempt,
                        self.policy.max_retries,
                        signature
                    );
                    return Ok(SwapExecution {
                        signature,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    record.outcome = AttemptOutcome::Failed(e.to_string());
                    warn!(
                        "Swap attempt {}/{} for {} failed ({}): {}",
                        attempt,
                        self.policy.max_retries,
                        rule.symbol,
                        record.id,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(
            last_error.unwrap_or_else(||
                AppError::Internal("Swap executor ran zero attempts".to_string())
            )
        )
    }

    async fn attempt_swap(
        &self,
        routed: &RoutedQuote,
        signer: &dyn WalletSigner
    ) -> Result<String> {
        let user = signer.pubkey().to_string();

        let unsigned = routed.aggregator.build_swap_transaction(&routed.quote, &user).await?;

        let signed = timeout(self.timeouts.sign, signer.sign_versioned_transaction(unsigned)).await
            .map_err(|_| AppError::ExecutionTimeout("Wallet signature timed out".to_string()))??;

        let signature = timeout(
            self.timeouts.submit,
            self.provider.submit_transaction(&signed)
        ).await.map_err(|_|
            AppError::ExecutionTimeout("Transaction submission timed out".to_string())
        )??;

        self.await_confirmation(&signature).await?;

        Ok(signature)
    }

    async fn await_confirmation(&self, signature: &str) -> Result<()> {
        let poll = async {
            loop {
                if self.provider.confirm_signature(signature).await? {
                    return Ok(());
                }
                sleep(CONFIRM_POLL_INTERVAL).await;
            }
        };

        timeout(self.timeouts.confirm, poll).await.map_err(|_|
            AppError::ExecutionTimeout(format!("Confirmation of {} timed out", signature))
        )?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::transaction::{ Transaction, VersionedTransaction };
    use std::sync::Mutex;

    use crate::dex::{ DexAggregator, Quote, QuoteRequest };
    use crate::providers::TokenBalance;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_factor: 2,
        }
    }

    struct MockSigner {
        pubkey: Pubkey,
    }

    #[async_trait]
    impl WalletSigner for MockSigner {
        fn pubkey(&self) -> Pubkey {
            self.pubkey
        }

        async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction> {
            Ok(transaction)
        }

        async fn sign_versioned_transaction(
            &self,
            transaction: VersionedTransaction
        ) -> Result<VersionedTransaction> {
            Ok(transaction)
        }
    }

    /// Scripted provider: submissions fail until `failures` is exhausted.
    struct MockProvider {
        submit_failures: Mutex<u32>,
        submit_calls: Mutex<u32>,
        delegated: u64,
        approvals: Mutex<u32>,
        approve_fails: bool,
    }

    impl MockProvider {
        fn failing(failures: u32) -> Self {
            Self {
                submit_failures: Mutex::new(failures),
                submit_calls: Mutex::new(0),
                delegated: 0,
                approvals: Mutex::new(0),
                approve_fails: false,
            }
        }
    }

    #[async_trait]
    impl ChainProvider for MockProvider {
        async fn get_token_balance(&self, _wallet: &str, _mint: &str) -> Result<TokenBalance> {
            Ok(TokenBalance { amount: 0.0, base_units: 0, decimals: 9 })
        }

        async fn delegated_amount(
            &self,
            _wallet: &str,
            _mint: &str,
            _delegate: &str
        ) -> Result<u64> {
            Ok(self.delegated)
        }

        async fn approve_delegate(
            &self,
            _signer: &dyn WalletSigner,
            _mint: &str,
            _delegate: &str,
            _amount_base: u64
        ) -> Result<String> {
            *self.approvals.lock().unwrap() += 1;
            if self.approve_fails {
                Err(AppError::ExecutionRejected("User rejected the approval".to_string()))
            } else {
                Ok("approval-signature".to_string())
            }
        }

        async fn submit_transaction(
            &self,
            _transaction: &VersionedTransaction
        ) -> Result<String> {
            *self.submit_calls.lock().unwrap() += 1;
            let mut failures = self.submit_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::ExecutionRejected("Blockhash expired".to_string()));
            }
            Ok("swap-signature".to_string())
        }

        async fn confirm_signature(&self, _signature: &str) -> Result<bool> {
            Ok(true)
        }

        fn validate_address(&self, _address: &str) -> bool {
            true
        }
    }

    struct PassthroughAggregator;

    #[async_trait]
    impl DexAggregator for PassthroughAggregator {
        async fn get_quote(&self, _request: &QuoteRequest) -> Result<Quote> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn build_swap_transaction(
            &self,
            _quote: &Quote,
            _user_public_key: &str
        ) -> Result<VersionedTransaction> {
            Ok(VersionedTransaction::default())
        }

        fn name(&self) -> &str {
            "Mock"
        }
    }

    fn routed_quote() -> RoutedQuote {
        RoutedQuote {
            quote: Quote {
                aggregator: "Mock".to_string(),
                input_mint: "So11111111111111111111111111111111111111112".to_string(),
                output_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
                in_amount: 1_000_000_000,
                out_amount: 100_000_000,
                other_amount_threshold: 99_000_000,
                price_impact_pct: 0.1,
                fee: 0,
                route: vec!["Pool".to_string()],
                raw: serde_json::json!({}),
            },
            aggregator: Arc::new(PassthroughAggregator),
        }
    }

    fn rule() -> TokenRule {
        TokenRule {
            symbol: "SOL".to_string(),
            mint: "So11111111111111111111111111111111111111112".to_string(),
            enabled: true,
            target_stablecoin: "USDC".to_string(),
            slippage: 1.0,
            min_amount: 0.1,
            max_amount: 10.0,
        }
    }

    fn executor(provider: Arc<MockProvider>) -> SwapExecutor {
        SwapExecutor::new(
            provider,
            fast_policy(),
            ExecutionTimeouts::default(),
            "AutoSwap111111111111111111111111111111111111".to_string()
        )
    }

    #[tokio::test]
    async fn succeeds_on_the_third_attempt() {
        let provider = Arc::new(MockProvider::failing(2));
        let executor = executor(provider.clone());
        let signer = MockSigner { pubkey: Pubkey::new_unique() };

        let execution = executor.execute(&rule(), 1.0, &routed_quote(), &signer).await.unwrap();

        assert_eq!(execution.attempts, 3);
        assert_eq!(execution.signature, "swap-signature");
        assert_eq!(*provider.submit_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_the_last_error() {
        let provider = Arc::new(MockProvider::failing(10));
        let executor = executor(provider.clone());
        let signer = MockSigner { pubkey: Pubkey::new_unique() };

        let result = executor.execute(&rule(), 1.0, &routed_quote(), &signer).await;

        assert!(matches!(result, Err(AppError::ExecutionRejected(_))));
        assert_eq!(*provider.submit_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn adequate_allowance_skips_the_approval() {
        let mut provider = MockProvider::failing(0);
        provider.delegated = tokens::to_base_units(10.0, 9);
        let provider = Arc::new(provider);
        let executor = executor(provider.clone());
        let signer = MockSigner { pubkey: Pubkey::new_unique() };

        executor.ensure_allowance(&signer, &rule(), 9).await.unwrap();
        assert_eq!(*provider.approvals.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_allowance_triggers_one_approval() {
        let provider = Arc::new(MockProvider::failing(0));
        let executor = executor(provider.clone());
        let signer = MockSigner { pubkey: Pubkey::new_unique() };

        executor.ensure_allowance(&signer, &rule(), 9).await.unwrap();
        executor.ensure_allowance(&signer, &rule(), 9).await.unwrap();
        // Not idempotent here because the mock never raises its delegation,
        // but each call issues exactly one approval and no retries.
        assert_eq!(*provider.approvals.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn rejected_approval_maps_to_approval_denied() {
        let mut provider = MockProvider::failing(0);
        provider.approve_fails = true;
        let provider = Arc::new(provider);
        let executor = executor(provider.clone());
        let signer = MockSigner { pubkey: Pubkey::new_unique() };

        let result = executor.ensure_allowance(&signer, &rule(), 9).await;
        assert!(matches!(result, Err(AppError::ApprovalDenied(_))));
        assert_eq!(*provider.approvals.lock().unwrap(), 1);
    }
}
