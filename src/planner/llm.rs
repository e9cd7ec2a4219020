//! LLM-prompted planner
//!
//! Asks the language model for a JSON plan. Any failure (model error, no JSON,
//! unparseable JSON) yields an empty plan; the orchestrator substitutes the
//! fallback search.

use super::Planner;
use crate::error::ResearchError;
use crate::gemini::LanguageModel;
use crate::models::{Action, ActionRequest, PARAMETER_SCHEMA};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LlmPlanner {
    llm: Arc<dyn LanguageModel>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, query: &str) -> Vec<ActionRequest> {
        let prompt = build_prompt(query);

        let response = match self.llm.generate(&prompt, None).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Planning call failed");
                return Vec::new();
            }
        };

        let steps = parse_plan_response(&response);
        debug!(step_count = steps.len(), "LLM plan parsed");
        steps
    }
}

/// Build structured planning prompt
pub(crate) fn build_prompt(query: &str) -> String {
    let schema = PARAMETER_SCHEMA
        .iter()
        .map(|(action, required, optional)| {
            let mut params: Vec<String> = required.iter().map(|p| format!("\"{}\"", p)).collect();
            params.extend(optional.iter().map(|p| format!("\"{}\" (optional)", p)));
            let params = if params.is_empty() {
                "no parameters".to_string()
            } else {
                params.join(", ")
            };
            format!("- {}: {}", action, params)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a research planner for financial questions.

Decide which data-gathering actions are needed to answer the user's question.

Available actions and their parameters:
{schema}

Action guidance:
- search_web: general questions, definitions, news, anything not covered below
- get_equity_data: a listed company; "ticker" is its exchange symbol (e.g. AAPL), "period" is a lookback such as "1y" or "6mo"
- get_crypto_data: a cryptocurrency; "symbol" is its CoinGecko id in lowercase (e.g. "bitcoin")
- get_market_indicators: broad market context (S&P 500, VIX, 10-year Treasury)

Examples:
Question: "How is Apple valued right now?"
{{"steps": [{{"action": "get_equity_data", "params": {{"ticker": "AAPL"}}, "reason": "Company valuation"}}, {{"action": "get_market_indicators", "params": {{}}, "reason": "Market context"}}]}}

Question: "What is a covered call?"
{{"steps": [{{"action": "search_web", "params": {{"query": "What is a covered call?"}}, "reason": "General question"}}]}}

Rules:
- Use only the actions listed above
- Use only the parameter names listed for each action
- Return ONLY valid JSON
- No explanation text

Question: "{query}"
"#
    )
}

/// Parse a plan from raw model text, discarding steps that fail validation
pub(crate) fn parse_plan_response(response: &str) -> Vec<ActionRequest> {
    let steps_json = match extract_steps(response) {
        Ok(steps) => steps,
        Err(e) => {
            warn!(error = %e, "Unusable planner response");
            return Vec::new();
        }
    };

    let empty = Map::new();
    let mut steps = Vec::with_capacity(steps_json.len());

    for (i, step_json) in steps_json.iter().enumerate() {
        let Some(name) = step_json.get("action").and_then(Value::as_str) else {
            warn!(step = i + 1, "Discarding planned step without action");
            continue;
        };

        let params = match step_json.get("params") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => {
                warn!(step = i + 1, action = %name, "Discarding planned step with non-object params");
                continue;
            }
        };

        match Action::from_parts(name, params) {
            Ok(action) => {
                let reason = step_json
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                steps.push(ActionRequest::new(action, reason));
            }
            Err(e) => {
                warn!(step = i + 1, error = %e, "Discarding invalid planned step");
            }
        }
    }

    steps
}

/// Locate the `steps` array between the first `{` and the last `}`
fn extract_steps(response: &str) -> crate::Result<Vec<Value>> {
    let json_text = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(ResearchError::Planning(
                "no JSON object in response".to_string(),
            ))
        }
    };

    let mut json: Value = serde_json::from_str(json_text)?;

    match json.get_mut("steps").map(Value::take) {
        Some(Value::Array(steps)) => Ok(steps),
        _ => Err(ResearchError::Planning(
            "response has no steps array".to_string(),
        )),
    }
}
