//! Deterministic keyword-rule planner
//!
//! Rules form a fixed priority chain; the first match wins:
//! 1. general-question marker → `search_web` with the raw query
//! 2. known crypto alias      → `get_crypto_data`
//! 3. known equity alias      → `get_equity_data`
//! 4. nothing matched         → `search_web` with the raw query
//!
//! Any plan holding an equity or crypto step also gets `get_market_indicators`.

use super::Planner;
use crate::models::{Action, ActionRequest};
use async_trait::async_trait;
use tracing::debug;

/// Default keyword and alias tables
const GENERAL_MARKERS: &[&str] = &[
    // English
    "what is", "explain", "definition", "who is", "news",
    // German
    "was ist", "erkläre", "wer ist", "nachrichten",
];

const CRYPTO_ALIASES: &[(&str, &str)] = &[
    ("bitcoin", "bitcoin"),
    ("btc", "bitcoin"),
    ("ethereum", "ethereum"),
    ("eth", "ethereum"),
];

const EQUITY_ALIASES: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("aapl", "AAPL"),
    ("tesla", "TSLA"),
    ("tsla", "TSLA"),
    ("microsoft", "MSFT"),
    ("msft", "MSFT"),
];

/// Keyword and alias tables consulted by [`RuleBasedPlanner`]
#[derive(Debug, Clone)]
pub struct PlannerRules {
    /// Substrings marking a general question
    pub general_markers: Vec<String>,
    /// (alias, CoinGecko coin id), checked in order
    pub crypto_aliases: Vec<(String, String)>,
    /// (alias, ticker), checked in order
    pub equity_aliases: Vec<(String, String)>,
}

impl Default for PlannerRules {
    fn default() -> Self {
        let pairs = |table: &[(&str, &str)]| -> Vec<(String, String)> {
            table
                .iter()
                .map(|(alias, target)| (alias.to_string(), target.to_string()))
                .collect()
        };

        Self {
            general_markers: GENERAL_MARKERS.iter().map(|m| m.to_string()).collect(),
            crypto_aliases: pairs(CRYPTO_ALIASES),
            equity_aliases: pairs(EQUITY_ALIASES),
        }
    }
}

pub struct RuleBasedPlanner {
    rules: PlannerRules,
}

impl RuleBasedPlanner {
    pub fn new(rules: PlannerRules) -> Self {
        Self { rules }
    }

    /// Plan synchronously; never returns an empty plan
    pub fn plan_query(&self, query: &str) -> Vec<ActionRequest> {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut steps = Vec::with_capacity(2);

        if self
            .rules
            .general_markers
            .iter()
            .any(|m| lowered.contains(m.as_str()))
        {
            debug!("Rule 1: general question");
            steps.push(ActionRequest::new(Action::search_web(query), "General question"));
        } else if let Some(coin) = find_alias(&self.rules.crypto_aliases, &lowered, &tokens) {
            debug!(%coin, "Rule 2: crypto query");
            steps.push(ActionRequest::new(
                Action::crypto(coin),
                format!("{} query", capitalize(coin)),
            ));
        } else if let Some(ticker) = find_alias(&self.rules.equity_aliases, &lowered, &tokens) {
            debug!(%ticker, "Rule 3: equity query");
            steps.push(ActionRequest::new(Action::equity(ticker), "Stock query"));
        } else {
            debug!("Rule 4: fallback search");
            steps.push(ActionRequest::new(Action::search_web(query), "Fallback search"));
        }

        let needs_context = steps.iter().any(|s| {
            matches!(
                s.action,
                Action::EquityData { .. } | Action::CryptoData { .. }
            )
        });
        if needs_context {
            debug!("Rule 5: adding market context");
            steps.push(ActionRequest::new(Action::MarketIndicators, "Market context"));
        }

        steps
    }
}

#[async_trait]
impl Planner for RuleBasedPlanner {
    async fn plan(&self, query: &str) -> Vec<ActionRequest> {
        self.plan_query(query)
    }
}

/// Single-word aliases match whole tokens, plural "s" included ("bitcoins");
/// multi-word aliases match as substrings
fn find_alias<'a>(table: &'a [(String, String)], lowered: &str, tokens: &[&str]) -> Option<&'a str> {
    table
        .iter()
        .find(|(alias, _)| {
            if alias.contains(' ') {
                lowered.contains(alias.as_str())
            } else {
                tokens
                    .iter()
                    .any(|t| *t == alias.as_str() || t.strip_suffix('s') == Some(alias.as_str()))
            }
        })
        .map(|(_, target)| target.as_str())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
