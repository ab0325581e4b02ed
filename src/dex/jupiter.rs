use async_trait::async_trait;
use base64::Engine;
use serde::{ Deserialize, Serialize };
use solana_sdk::transaction::VersionedTransaction;

use crate::error::{ AppError, Result };

use super::{ DexAggregator, Quote, QuoteRequest };

// Jupiter v6 API response structures
#[derive(Debug, Deserialize)]
struct JupiterQuoteResponse {
    #[serde(rename = "inAmount")]
    in_amount: String,
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "otherAmountThreshold")]
    other_amount_threshold: String,
    #[serde(rename = "priceImpactPct")]
    price_impact_pct: serde_json::Value,
    #[serde(rename = "routePlan", default)]
    route_plan: Vec<RoutePlanStep>,
}

#[derive(Debug, Deserialize)]
struct RoutePlanStep {
    #[serde(rename = "swapInfo")]
    swap_info: SwapInfo,
}

#[derive(Debug, Deserialize)]
struct SwapInfo {
    label: String,
    #[serde(rename = "feeAmount", default)]
    fee_amount: Option<String>,
}

#[derive(Debug, Serialize)]
struct JupiterSwapRequest {
    #[serde(rename = "quoteResponse")]
    quote_response: serde_json::Value,
    #[serde(rename = "userPublicKey")]
    user_public_key: String,
    #[serde(rename = "wrapAndUnwrapSol")]
    wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Deserialize)]
struct JupiterSwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

pub struct JupiterAggregator {
    api_url: String,
    client: reqwest::Client,
}

impl JupiterAggregator {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn parse_amount(value: &str, field: &str) -> Result<u64> {
        value
            .parse::<u64>()
            .map_err(|_|
                AppError::Aggregator(format!("Jupiter returned a malformed {}: {}", field, value))
            )
    }

    /// Sum of per-hop `feeAmount` values; hops without one contribute zero.
    fn total_fee(route_plan: &[RoutePlanStep]) -> u64 {
        route_plan
            .iter()
            .filter_map(|step| step.swap_info.fee_amount.as_deref())
            .filter_map(|fee| fee.parse::<u64>().ok())
            .sum()
    }

    // priceImpactPct arrives as a number or a numeric string depending on
    // the API version.
    fn parse_price_impact(value: &serde_json::Value) -> f64 {
        match value {
            serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
            serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

#[async_trait]
impl DexAggregator for JupiterAggregator {
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
                AppError::Aggregator(format!("Jupiter quote returned {}", response.status()))
            );
        }

        let raw: serde_json::Value = response
            .json().await
            .map_err(|e| AppError::Aggregator(format!("Malformed Jupiter response: {}", e)))?;

        let quote: JupiterQuoteResponse = serde_json
            ::from_value(raw.clone())
            .map_err(|e| AppError::Aggregator(format!("Malformed Jupiter quote: {}", e)))?;

        if quote.route_plan.is_empty() {
            return Err(AppError::NoRouteFound);
        }

        let route = quote.route_plan
            .iter()
            .map(|step| step.swap_info.label.clone())
            .collect();

        Ok(Quote {
            aggregator: self.name().to_string(),
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount: Self::parse_amount(&quote.in_amount, "inAmount")?,
            out_amount: Self::parse_amount(&quote.out_amount, "outAmount")?,
            other_amount_threshold: Self::parse_amount(
                &quote.other_amount_threshold,
                "otherAmountThreshold"
            )?,
            price_impact_pct: Self::parse_price_impact(&quote.price_impact_pct),
            fee: Self::total_fee(&quote.route_plan),
            route,
            raw,
        })
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        user_public_key: &str
    ) -> Result<VersionedTransaction> {
        let url = format!("{}/swap", self.api_url);

        let request = JupiterSwapRequest {
            quote_response: quote.raw.clone(),
            user_public_key: user_public_key.to_string(),
            wrap_and_unwrap_sol: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(
                AppError::Aggregator(format!("Jupiter swap returned {}", response.status()))
            );
        }

        let swap: JupiterSwapResponse = response
            .json().await
            .map_err(|e| AppError::Aggregator(format!("Malformed Jupiter swap response: {}", e)))?;

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
        "Jupiter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_impact_accepts_number_or_string() {
        assert_eq!(
            JupiterAggregator::parse_price_impact(&serde_json::json!(0.25)),
            0.25
        );
        assert_eq!(
            JupiterAggregator::parse_price_impact(&serde_json::json!("0.5")),
            0.5
        );
        assert_eq!(JupiterAggregator::parse_price_impact(&serde_json::json!(null)), 0.0);
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        assert!(JupiterAggregator::parse_amount("12345", "inAmount").is_ok());
        assert!(JupiterAggregator::parse_amount("12.5", "inAmount").is_err());
        assert!(JupiterAggregator::parse_amount("", "inAmount").is_err());
    }

    #[test]
    fn sums_fees_across_route_hops() {
        let plan: Vec<RoutePlanStep> = serde_json
            ::from_value(
                serde_json::json!([
                    { "swapInfo": { "label": "Whirlpool", "feeAmount": "1200" } },
                    { "swapInfo": { "label": "Raydium CLMM", "feeAmount": "800" } },
                    { "swapInfo": { "label": "Meteora" } }
                ])
            )
            .unwrap();

        assert_eq!(JupiterAggregator::total_fee(&plan), 2000);
        assert_eq!(JupiterAggregator::total_fee(&[]), 0);
    }

    #[test]
    fn trims_trailing_slash_from_api_url() {
        let aggregator = JupiterAggregator::new("https://quote-api.jup.ag/v6/");
        assert_eq!(aggregator.api_url, "https://quote-api.jup.ag/v6");
    }
}
