use async_trait::async_trait;
use base64::Engine;
use serde::{ Deserialize, Serialize };
use solana_sdk::transaction::VersionedTransaction;

use crate::error::{ AppError, Result };

use super::{ DexAggregator, Quote, QuoteRequest };

#[derive(Debug, Deserialize)]
struct RaydiumQuoteResponse {
    #[serde(rename = "inAmount")]
    in_amount: String,
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "priceImpact", default)]
    price_impact: f64,
    #[serde(default)]
    fee: f64,
    #[serde(default)]
    route: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RaydiumSwapRequest {
    quote: serde_json::Value,
    #[serde(rename = "userPublicKey")]
    user_public_key: String,
    #[serde(rename = "wrapUnwrapSOL")]
    wrap_unwrap_sol: bool,
}

#[derive(Debug, Deserialize)]
struct RaydiumSwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

pub struct RaydiumAggregator {
    api_url: String,
    client: reqwest::Client,
}

impl RaydiumAggregator {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Minimum received after applying the requested slippage.
    fn minimum_out(out_amount: u64, slippage_bps: u32) -> u64 {
        let factor = 1.0 - (slippage_bps as f64) / 10_000.0;
        ((out_amount as f64) * factor).floor() as u64
    }
}

#[async_trait]
impl DexAggregator for RaydiumAggregator {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.api_url,
            request.input_mint,
            request.output_mint,
            request.amount_base,
            request.slippage_bps
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(
                AppError::Aggregator(format!("Raydium quote returned {}", response.status()))
            );
        }

        let raw: serde_json::Value = response
            .json().await
            .map_err(|e| AppError::Aggregator(format!("Malformed Raydium response: {}", e)))?;

        let quote: RaydiumQuoteResponse = serde_json
            ::from_value(raw.clone())
            .map_err(|e| AppError::Aggregator(format!("Malformed Raydium quote: {}", e)))?;

        if quote.route.is_empty() {
            return Err(AppError::NoRouteFound);
        }

        let in_amount = quote.in_amount
            .parse::<u64>()
            .map_err(|_| AppError::Aggregator("Raydium returned a malformed inAmount".to_string()))?;
        let out_amount = quote.out_amount
            .parse::<u64>()
            .map_err(|_| AppError::Aggregator("Raydium returned a malformed outAmount".to_string()))?;

        Ok(Quote {
            aggregator: self.name().to_string(),
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount,
            out_amount,
            other_amount_threshold: Self::minimum_out(out_amount, request.slippage_bps),
            price_impact_pct: quote.price_impact,
            fee: quote.fee.max(0.0).floor() as u64,
            route: quote.route,
            raw,
        })
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        user_public_key: &str
    ) -> Result<VersionedTransaction> {
        let url = format!("{}/swap", self.api_url);

        let request = RaydiumSwapRequest {
            quote: quote.raw.clone(),
            user_public_key: user_public_key.to_string(),
            wrap_unwrap_sol: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(
                AppError::Aggregator(format!("Raydium swap returned {}", response.status()))
            );
        }

        let swap: RaydiumSwapResponse = response
            .json().await
            .map_err(|e| AppError::Aggregator(format!("Malformed Raydium swap response: {}", e)))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&swap.swap_transaction)
            .map_err(|e|
                AppError::Aggregator(format!("Invalid base64 swap transaction: {}", e))
            )?;

        bincode
            ::deserialize(&bytes)
            .map_err(|e| AppError::Aggregator(format!("Invalid swap transaction: {}", e)))
    }

    fn name(&self) -> &str {
        "Raydium"
    }
}
