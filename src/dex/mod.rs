use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use solana_sdk::transaction::VersionedTransaction;

use crate::error::Result;

pub mod jupiter;
pub mod raydium;
mod quoter;
pub use quoter::{ RouteQuoter, RoutedQuote };

/// Inputs for a routing query. Amount is in the input mint's base units.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount_base: u64,
    pub slippage_bps: u32,
}

/// A priced, time-limited offer from one aggregator. Consumed immediately
/// by the executor; never persisted beyond the attempt that used it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub aggregator: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    /// Minimum received after slippage, in output base units.
    pub other_amount_threshold: u64,
    pub price_impact_pct: f64,
    /// Total routing fee reported by the aggregator, in base units.
    pub fee: u64,
    /// Ordered hop labels of the selected route.
    pub route: Vec<String>,
    /// Verbatim aggregator payload, replayed when requesting the swap
    /// transaction.
    pub raw: serde_json::Value,
}

/// Trait for DEX aggregators (Jupiter, Raydium, ...).
#[async_trait]
pub trait DexAggregator: Send + Sync {
    /// Get a quote for swapping tokens.
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote>;

    /// Build the serialized swap transaction for a previously obtained
    /// quote. The caller signs and submits it.
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        user_public_key: &str
    ) -> Result<VersionedTransaction>;

    /// Aggregator display name.
    fn name(&self) -> &str;
}
