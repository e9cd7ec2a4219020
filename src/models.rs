//! Core data models for the research agent

use crate::error::ResearchError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const SEARCH_WEB: &str = "search_web";
pub const GET_EQUITY_DATA: &str = "get_equity_data";
pub const GET_CRYPTO_DATA: &str = "get_crypto_data";
pub const GET_MARKET_INDICATORS: &str = "get_market_indicators";

/// Lookback period used when a plan does not name one
pub const DEFAULT_EQUITY_PERIOD: &str = "1y";

/// Action name, required parameters, optional parameters
pub const PARAMETER_SCHEMA: &[(&str, &[&str], &[&str])] = &[
    (SEARCH_WEB, &["query"], &[]),
    (GET_EQUITY_DATA, &["ticker"], &["period"]),
    (GET_CRYPTO_DATA, &["symbol"], &[]),
    (GET_MARKET_INDICATORS, &[], &[]),
];

//
// ================= Actions =================
//

/// A data-gathering action with its typed parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SearchWeb { query: String },
    EquityData { ticker: String, period: String },
    CryptoData { symbol: String },
    MarketIndicators,
    /// An action name this build does not know how to execute
    Unrecognized { name: String },
}

impl Action {
    pub fn search_web(query: impl Into<String>) -> Self {
        Action::SearchWeb {
            query: query.into(),
        }
    }

    pub fn equity(ticker: impl AsRef<str>) -> Self {
        Action::EquityData {
            ticker: ticker.as_ref().trim().to_uppercase(),
            period: DEFAULT_EQUITY_PERIOD.to_string(),
        }
    }

    pub fn crypto(symbol: impl AsRef<str>) -> Self {
        Action::CryptoData {
            symbol: symbol.as_ref().trim().to_lowercase(),
        }
    }

    /// Wire name of the action
    pub fn name(&self) -> &str {
        match self {
            Action::SearchWeb { .. } => SEARCH_WEB,
            Action::EquityData { .. } => GET_EQUITY_DATA,
            Action::CryptoData { .. } => GET_CRYPTO_DATA,
            Action::MarketIndicators => GET_MARKET_INDICATORS,
            Action::Unrecognized { name } => name,
        }
    }

    pub fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match self {
            Action::SearchWeb { query } => {
                params.insert("query".to_string(), query.clone());
            }
            Action::EquityData { ticker, period } => {
                params.insert("ticker".to_string(), ticker.clone());
                params.insert("period".to_string(), period.clone());
            }
            Action::CryptoData { symbol } => {
                params.insert("symbol".to_string(), symbol.clone());
            }
            Action::MarketIndicators | Action::Unrecognized { .. } => {}
        }
        params
    }

    /// Build an action from an untrusted name and parameter object.
    ///
    /// Required parameters must be present and non-empty, unknown parameter
    /// names are rejected, and values must be strings or numbers. A `null`
    /// value counts as an absent parameter. `get_market_indicators` takes no
    /// parameters and ignores whatever it is given.
    pub fn from_parts(name: &str, params: &Map<String, Value>) -> Result<Self> {
        let (required, optional) = PARAMETER_SCHEMA
            .iter()
            .find(|(action, _, _)| *action == name)
            .map(|(_, required, optional)| (*required, *optional))
            .ok_or_else(|| ResearchError::InvalidAction(name.to_string()))?;

        if name == GET_MARKET_INDICATORS {
            return Ok(Action::MarketIndicators);
        }

        if let Some(unknown) = params
            .keys()
            .find(|k| !required.contains(&k.as_str()) && !optional.contains(&k.as_str()))
        {
            return Err(ResearchError::invalid_parameters(
                name,
                format!("unexpected parameter '{}'", unknown),
            ));
        }

        let mut values = BTreeMap::new();
        for (key, value) in params {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(ResearchError::invalid_parameters(
                        name,
                        format!("parameter '{}' must be a string", key),
                    ))
                }
            };
            values.insert(key.as_str(), text);
        }

        for key in required {
            if values.get(key).map_or(true, |v| v.is_empty()) {
                return Err(ResearchError::invalid_parameters(
                    name,
                    format!("missing parameter '{}'", key),
                ));
            }
        }

        let take = |key: &str| values.get(key).cloned().unwrap_or_default();

        Ok(match name {
            SEARCH_WEB => Action::search_web(take("query")),
            GET_EQUITY_DATA => {
                let period = values
                    .get("period")
                    .filter(|p| !p.is_empty())
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_EQUITY_PERIOD.to_string());
                Action::EquityData {
                    ticker: take("ticker").to_uppercase(),
                    period,
                }
            }
            GET_CRYPTO_DATA => Action::crypto(take("symbol")),
            _ => Action::MarketIndicators,
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters()
            .into_iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name(), params)
    }
}

//
// ================= Plan =================
//

/// One planned research step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: Action,
    pub justification: String,
}

impl ActionRequest {
    pub fn new(action: Action, justification: impl Into<String>) -> Self {
        Self {
            action,
            justification: justification.into(),
        }
    }
}

impl Serialize for ActionRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ActionRequest", 3)?;
        state.serialize_field("action", self.action.name())?;
        state.serialize_field("params", &self.action.parameters())?;
        state.serialize_field("reason", &self.justification)?;
        state.end()
    }
}

/// Step identifier derived from 1-based position and action name
pub fn step_id(position: usize, action: &Action) -> String {
    format!("step_{}_{}", position, action.name())
}

//
// ================= Equity =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub current_price: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub ev_to_revenue: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub profit_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub gross_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub revenue: Option<f64>,
    pub earnings: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialHealth {
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub current: Option<f64>,
    pub one_month_ago: Option<f64>,
    pub three_months_ago: Option<f64>,
    pub six_months_ago: Option<f64>,
    pub one_year_ago: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystView {
    pub target_price: Option<f64>,
    pub recommendation: Option<String>,
    pub number_of_analysts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub source: String,
    pub ticker: String,
    pub profile: CompanyProfile,
    pub valuation: Valuation,
    pub profitability: Profitability,
    pub growth: Growth,
    pub financial_health: FinancialHealth,
    pub price_history: PriceHistory,
    pub analyst_view: AnalystView,
}

//
// ================= Crypto =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoSnapshot {
    pub source: String,
    pub symbol: String,
    pub name: Option<String>,
    /// Reporting currency of every monetary field
    pub currency: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub price_change_24h_percent: Option<f64>,
    pub price_change_7d_percent: Option<f64>,
    pub price_change_30d_percent: Option<f64>,
    pub price_change_1y_percent: Option<f64>,
    pub all_time_high: Option<f64>,
    pub all_time_high_date: Option<DateTime<Utc>>,
    pub all_time_low: Option<f64>,
    pub all_time_low_date: Option<DateTime<Utc>>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
}

//
// ================= Search =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub snippet: String,
    pub source: Option<String>,
}

pub const NO_SEARCH_RESULTS: &str = "No search results found.";

impl SearchHit {
    /// Placeholder returned when a search yields nothing
    pub fn no_results() -> Self {
        Self {
            snippet: NO_SEARCH_RESULTS.to_string(),
            source: None,
        }
    }
}

//
// ================= Market indicators =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexLevel {
    pub current: Option<f64>,
    pub change_1m_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityLevel {
    pub current: Option<f64>,
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldLevel {
    pub current: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndicators {
    pub source: String,
    pub sp500: IndexLevel,
    pub vix: VolatilityLevel,
    pub treasury_10y: YieldLevel,
}

//
// ================= Results =================
//

/// Outcome of one connector invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Equity(EquitySnapshot),
    Crypto(CryptoSnapshot),
    Search(Vec<SearchHit>),
    Indicators(MarketIndicators),
    Error { error: String },
}

impl ActionResult {
    pub fn error(message: impl Into<String>) -> Self {
        ActionResult::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ActionResult::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ActionResult::Error { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntry {
    pub step_id: String,
    pub result: ActionResult,
}

/// Ordered evidence collected for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchBundle {
    entries: Vec<BundleEntry>,
}

impl ResearchBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, step_id: String, result: ActionResult) {
        self.entries.push(BundleEntry { step_id, result });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn get(&self, step_id: &str) -> Option<&ActionResult> {
        self.entries
            .iter()
            .find(|e| e.step_id == step_id)
            .map(|e| &e.result)
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.step_id.as_str()).collect()
    }
}

impl Serialize for ResearchBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.step_id, &entry.result)?;
        }
        map.end()
    }
}
