use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{ debug, warn };

use crate::error::{ AppError, Result };

use super::{ DexAggregator, Quote, QuoteRequest };

/// The winning quote paired with the aggregator that produced it, so the
/// executor can ask the same aggregator to build the swap transaction.
pub struct RoutedQuote {
    pub quote: Quote,
    pub aggregator: Arc<dyn DexAggregator>,
}

/// Fans a routing query out to every configured aggregator concurrently and
/// keeps the quote with the highest output amount. Losing quotes are
/// discarded; aggregator failures only disqualify that aggregator.
pub struct RouteQuoter {
    aggregators: Vec<Arc<dyn DexAggregator>>,
}

impl RouteQuoter {
    pub fn new(aggregators: Vec<Arc<dyn DexAggregator>>) -> Self {
        Self { aggregators }
    }

    pub async fn best_quote(&self, request: &QuoteRequest) -> Result<RoutedQuote> {
        let mut queries = JoinSet::new();

        for aggregator in &self.aggregators {
            let aggregator = aggregator.clone();
            let request = request.clone();
            queries.spawn(async move {
                let result = aggregator.get_quote(&request).await;
                (aggregator, result)
            });
        }

        let mut best: Option<RoutedQuote> = None;

        while let Some(joined) = queries.join_next().await {
            let (aggregator, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Quote task panicked: {}", e);
                    continue;
                }
            };

            match result {
                Ok(quote) if quote.out_amount > 0 => {
                    let better = best
                        .as_ref()
                        .map_or(true, |current| quote.out_amount > current.quote.out_amount);
                    if better {
                        best = Some(RoutedQuote { quote, aggregator });
                    }
                }
                Ok(_) => {
                    debug!("{} returned a zero-output quote, skipping", aggregator.name());
                }
                Err(e) => {
                    debug!("{} quote failed: {}", aggregator.name(), e);
                }
            }
        }

        best.ok_or(AppError::NoRouteFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solana_sdk::transaction::VersionedTransaction;

    struct MockAggregator {
        name: &'static str,
        out_amount: Option<u64>,
    }

    #[async_trait]
    impl DexAggregator for MockAggregator {
        async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
            match self.out_amount {
                Some(out_amount) =>
                    Ok(Quote {
                        aggregator: self.name.to_string(),
                        input_mint: request.input_mint.clone(),
                        output_mint: request.output_mint.clone(),
                        in_amount: request.amount_base,
                        out_amount,
                        other_amount_threshold: out_amount,
                        price_impact_pct: 0.1,
                        fee: 0,
                        route: vec!["Pool".to_string()],
                        raw: serde_json::json!({}),
                    }),
                None => Err(AppError::Aggregator("unavailable".to_string())),
            }
        }

        async fn build_swap_transaction(
            &self,
            _quote: &Quote,
            _user_public_key: &str
        ) -> Result<VersionedTransaction> {
            Err(AppError::Internal("not used in quoting tests".to_string()))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn request() -> QuoteRequest {
        QuoteRequest {
            input_mint: "So11111111111111111111111111111111111111112".to_string(),
            output_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            amount_base: 1_000_000_000,
            slippage_bps: 100,
        }
    }

    #[tokio::test]
    async fn picks_the_quote_with_the_highest_output() {
        let quoter = RouteQuoter::new(
            vec![
                Arc::new(MockAggregator { name: "A", out_amount: Some(95) }),
                Arc::new(MockAggregator { name: "B", out_amount: Some(100) })
            ]
        );

        let best = quoter.best_quote(&request()).await.unwrap();
        assert_eq!(best.quote.aggregator, "B");
        assert_eq!(best.quote.out_amount, 100);
    }

    #[tokio::test]
    async fn one_failing_aggregator_does_not_fail_the_query() {
        let quoter = RouteQuoter::new(
            vec![
                Arc::new(MockAggregator { name: "A", out_amount: None }),
                Arc::new(MockAggregator { name: "B", out_amount: Some(100) })
            ]
        );

        let best = quoter.best_quote(&request()).await.unwrap();
        assert_eq!(best.quote.aggregator, "B");
    }

    #[tokio::test]
    async fn all_aggregators_failing_is_no_route_found() {
        let quoter = RouteQuoter::new(
            vec![
                Arc::new(MockAggregator { name: "A", out_amount: None }),
                Arc::new(MockAggregator { name: "B", out_amount: None })
            ]
        );

        assert!(matches!(quoter.best_quote(&request()).await, Err(AppError::NoRouteFound)));
    }

    #[tokio::test]
    async fn zero_output_quotes_are_discarded() {
        let quoter = RouteQuoter::new(
            vec![Arc::new(MockAggregator { name: "A", out_amount: Some(0) })]
        );

        assert!(matches!(quoter.best_quote(&request()).await, Err(AppError::NoRouteFound)));
    }
}
