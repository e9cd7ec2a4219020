//! Execution engine for research plans
//!
//! Runs every planned step exactly once, in order, against the matching
//! connector. A failing step is recorded as data and never halts its siblings.
//! LLM is NOT used here.

use crate::connectors::ConnectorSet;
use crate::models::{step_id, Action, ActionRequest, ActionResult, ResearchBundle};
use std::time::Instant;
use tracing::{debug, warn};

/// Executes a plan step-by-step
pub struct ExecutionEngine {
    connectors: ConnectorSet,
}

impl ExecutionEngine {
    pub fn new(connectors: ConnectorSet) -> Self {
        Self { connectors }
    }

    /// Execute all steps in order, collecting one bundle entry per step
    pub async fn execute(&self, steps: &[ActionRequest]) -> ResearchBundle {
        let mut bundle = ResearchBundle::with_capacity(steps.len());

        debug!(step_count = steps.len(), "Starting plan execution");

        for (i, step) in steps.iter().enumerate() {
            let id = step_id(i + 1, &step.action);
            debug!(
                step = %id,
                reason = %step.justification,
                "Processing step"
            );

            let start = Instant::now();
            let result = self.dispatch(&step.action).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            if let Some(error) = result.error_message() {
                warn!(step = %id, elapsed_ms, %error, "Step produced an error result");
            } else {
                debug!(step = %id, elapsed_ms, "Step completed");
            }

            bundle.push(id, result);
        }

        debug!(entry_count = bundle.len(), "Plan execution completed");

        bundle
    }

    async fn dispatch(&self, action: &Action) -> ActionResult {
        match action {
            Action::SearchWeb { query } => self.connectors.search.fetch(query).await,
            Action::EquityData { ticker, period } => {
                self.connectors.equity.fetch(ticker, period).await
            }
            Action::CryptoData { symbol } => self.connectors.crypto.fetch(symbol).await,
            Action::MarketIndicators => self.connectors.indicators.fetch().await,
            Action::Unrecognized { name } => ActionResult::error(format!("unknown action: {}", name)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_every_step_yields_one_entry_in_order() {
        let (connectors, calls) = fakes::connector_set(Some("CoinGecko returned status code 429"));
        let engine = ExecutionEngine::new(connectors);

        let steps = vec![
            ActionRequest::new(Action::crypto("bitcoin"), "Bitcoin query"),
            ActionRequest::new(
                Action::Unrecognized {
                    name: "get_weather".to_string(),
                },
                "Not supported",
            ),
            ActionRequest::new(Action::equity("ZZZZ"), "Stock query"),
            ActionRequest::new(Action::MarketIndicators, "Market context"),
            ActionRequest::new(Action::search_web("bitcoin halving"), "Search"),
        ];

        let bundle = engine.execute(&steps).await;

        assert_eq!(
            bundle.step_ids(),
            vec![
                "step_1_get_crypto_data",
                "step_2_get_weather",
                "step_3_get_equity_data",
                "step_4_get_market_indicators",
                "step_5_search_web",
            ]
        );

        let crypto = bundle.get("step_1_get_crypto_data").unwrap();
        assert!(crypto.error_message().unwrap().contains("status code 429"));

        let unknown = bundle.get("step_2_get_weather").unwrap();
        assert!(unknown.error_message().unwrap().contains("unknown action"));

        let equity = bundle.get("step_3_get_equity_data").unwrap();
        assert!(equity
            .error_message()
            .unwrap()
            .starts_with("Failed to fetch data for ZZZZ"));

        assert!(!bundle.get("step_4_get_market_indicators").unwrap().is_error());
        assert!(!bundle.get("step_5_search_web").unwrap().is_error());

        // Unknown actions never reach a connector
        assert_eq!(calls.total(), 4);
        assert_eq!(calls.indicators.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_plan_yields_empty_bundle() {
        let (connectors, calls) = fakes::connector_set(None);
        let engine = ExecutionEngine::new(connectors);

        let bundle = engine.execute(&[]).await;
        assert!(bundle.is_empty());
        assert_eq!(calls.total(), 0);
    }
}
