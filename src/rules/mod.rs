use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::{ Deserialize, Serialize };
use solana_sdk::pubkey::Pubkey;

use crate::error::{ AppError, Result };
use crate::storage::KvStore;
use crate::tokens;

const CONFIG_PREFIX: &str = "autoswap_config_";

/// One user-configured auto-swap policy: watch a token, convert it into a
/// target stablecoin when the trigger bounds are met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRule {
    pub symbol: String,
    pub mint: String,
    pub enabled: bool,
    #[serde(rename = "targetStablecoin")]
    pub target_stablecoin: String,
    /// Allowed slippage in percent, 0.1 to 5.0.
    pub slippage: f64,
    /// Balance at or above this amount triggers a swap (token units).
    #[serde(rename = "minAmount")]
    pub min_amount: f64,
    /// Upper bound on the amount actually swapped (token units).
    #[serde(rename = "maxAmount")]
    pub max_amount: f64,
}

impl TokenRule {
    /// Slippage expressed in basis points, as DEX aggregators expect it.
    pub fn slippage_bps(&self) -> u32 {
        (self.slippage * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendLimits {
    pub daily: f64,
    pub monthly: f64,
}

/// Aggregate configuration owned by one wallet address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "autoSwapEnabled")]
    pub auto_swap_enabled: bool,
    pub tokens: Vec<TokenRule>,
    pub limits: SpendLimits,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            auto_swap_enabled: false,
            tokens: vec![TokenRule {
                symbol: "SOL".to_string(),
                mint: "So11111111111111111111111111111111111111112".to_string(),
                enabled: true,
                target_stablecoin: "USDC".to_string(),
                slippage: 1.0,
                min_amount: 0.1,
                max_amount: 10.0,
            }],
            limits: SpendLimits {
                daily: 1000.0,
                monthly: 10000.0,
            },
        }
    }
}

impl UserConfig {
    pub fn enabled_rules(&self) -> impl Iterator<Item = &TokenRule> {
        self.tokens.iter().filter(|rule| rule.enabled)
    }

    /// Check every invariant. Called before any write so a save is
    /// all-or-nothing.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.tokens {
            if rule.symbol.trim().is_empty() {
                return Err(AppError::Validation("Rule has an empty token symbol".to_string()));
            }

            if Pubkey::from_str(&rule.mint).is_err() {
                return Err(
                    AppError::Validation(
                        format!("Rule {} has an invalid mint address: {}", rule.symbol, rule.mint)
                    )
                );
            }

            if tokens::resolve_mint(&rule.target_stablecoin).is_none()
                && Pubkey::from_str(&rule.target_stablecoin).is_err()
            {
                return Err(
                    AppError::Validation(
                        format!(
                            "Rule {} has an unknown target stablecoin: {}",
                            rule.symbol,
                            rule.target_stablecoin
                        )
                    )
                );
            }

            if rule.slippage < 0.1 || rule.slippage > 5.0 {
                return Err(
                    AppError::Validation(
                        format!("Slippage for {} must be between 0.1% and 5%", rule.symbol)
                    )
                );
            }

            if rule.min_amount < 0.0 || rule.max_amount < 0.0 {
                return Err(
                    AppError::Validation(
                        format!("Amounts for {} must not be negative", rule.symbol)
                    )
                );
            }

            if rule.min_amount > rule.max_amount {
                return Err(
                    AppError::Validation(
                        format!(
                            "Minimum amount for {} cannot exceed the maximum amount",
                            rule.symbol
                        )
                    )
                );
            }
        }

        // No two enabled rules may watch the same token.
        let mut symbols = HashSet::new();
        let mut mints = HashSet::new();
        for rule in self.enabled_rules() {
            if !symbols.insert(rule.symbol.to_lowercase()) {
                return Err(
                    AppError::Validation(
                        format!("Duplicate enabled rule for symbol {}", rule.symbol)
                    )
                );
            }
            if !mints.insert(rule.mint.to_lowercase()) {
                return Err(
                    AppError::Validation(format!("Duplicate enabled rule for mint {}", rule.mint))
                );
            }
        }

        if self.limits.daily <= 0.0 || self.limits.monthly <= 0.0 {
            return Err(AppError::Validation("Spend limits must be greater than zero".to_string()));
        }

        if self.limits.daily > self.limits.monthly {
            return Err(
                AppError::Validation(
                    "The daily limit cannot exceed the monthly limit".to_string()
                )
            );
        }

        Ok(())
    }
}

/// Per-wallet configuration persistence.
pub struct RuleStore {
    storage: Arc<dyn KvStore>,
}

impl RuleStore {
    pub fn new(storage: Arc<dyn KvStore>) -> Self {
        Self { storage }
    }

    fn storage_key(wallet: &str) -> String {
        format!("{}{}", CONFIG_PREFIX, wallet)
    }

    /// Load the stored configuration, or the default one on first use.
    pub async fn load(&self, wallet: &str) -> Result<UserConfig> {
        match self.storage.get(&Self::storage_key(wallet)).await? {
            Some(raw) =>
                serde_json
                    ::from_str(&raw)
                    .map_err(|e| AppError::Storage(format!("Corrupt config for {}: {}", wallet, e))),
            None => Ok(UserConfig::default()),
        }
    }

    /// Validate and persist atomically: either every invariant holds and the
    /// full config is written in one put, or nothing is stored.
    pub async fn save(&self, wallet: &str, config: &UserConfig) -> Result<()> {
        config.validate()?;

        let raw = serde_json
            ::to_string(config)
            .map_err(|e| AppError::Internal(format!("Failed to serialize config: {}", e)))?;

        self.storage.put(&Self::storage_key(wallet), raw).await
    }
}
