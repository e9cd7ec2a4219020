//! Grounded answer synthesis
//!
//! Embeds the query and all collected evidence into one prompt and makes a
//! single LLM call. A failed call becomes a textual error answer.

use crate::gemini::LanguageModel;
use crate::models::ResearchBundle;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

pub const SYSTEM_INSTRUCTION: &str = r#"You are a precise financial data analyst.

Your task:
1. Analyse ONLY the supplied data (from market-data APIs or web search).
2. Answer the user's question precisely.
3. Use ONLY numbers and facts from the data, and name the source of every fact (e.g. "According to CoinGecko ...", "According to web search ...").

IMPORTANT RULES:
- NEVER invent data.
- If a piece of information is not in the data, say clearly: "I have no data on [topic]." Fields marked "not available" count as missing.
- Monetary fields are denominated in the stated currency; quote them with that currency.
- This is NOT financial advice. Always point this out at the end."#;

pub struct Synthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Produce the final answer; never fails
    pub async fn synthesize(&self, query: &str, bundle: &ResearchBundle) -> String {
        let prompt = build_prompt(query, bundle);

        info!(entries = bundle.len(), "Generating analysis");

        match self.llm.generate(&prompt, Some(SYSTEM_INSTRUCTION)).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Synthesis failed");
                format!("Error generating analysis: {}", e)
            }
        }
    }
}

pub(crate) fn build_prompt(query: &str, bundle: &ResearchBundle) -> String {
    format!(
        "User question: {}\n\n\
         Available data (from APIs and web search):\n{}\n\
         Analyse the data professionally and answer the question comprehensively, \
         based ONLY on the data above.",
        query,
        render_bundle(bundle)
    )
}

/// Human-readable key/value dump of the bundle; absent values read "not available"
pub fn render_bundle(bundle: &ResearchBundle) -> String {
    if bundle.is_empty() {
        return "No research data was collected.\n".to_string();
    }

    let mut out = String::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(bundle) {
        for (key, value) in &map {
            render_entry(key, value, 0, &mut out);
        }
    }
    out
}

fn render_entry(key: &str, value: &Value, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Object(map) if !map.is_empty() => {
            out.push_str(&format!("{}{}:\n", pad, key));
            for (k, v) in map {
                render_entry(k, v, depth + 1, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            out.push_str(&format!("{}{}:\n", pad, key));
            for (i, item) in items.iter().enumerate() {
                render_entry(&format!("[{}]", i + 1), item, depth + 1, out);
            }
        }
        scalar => out.push_str(&format!("{}{}: {}\n", pad, key, scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "not available".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => "none".to_string(),
        other => other.to_string(),
    }
}
