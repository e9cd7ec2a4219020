//! Runtime configuration loaded from the environment

use crate::error::ResearchError;
use crate::planner::PlannerKind;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
/// Host that hands out the Yahoo session cookie the crumb is bound to
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Settings for the Gemini client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Settings shared by the data connectors
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub coingecko_base_url: String,
    pub tavily_base_url: String,
    pub tavily_api_key: String,
    pub report_currency: String,
    pub search_max_results: usize,
    pub request_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            yahoo_cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            tavily_base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            tavily_api_key: String::new(),
            report_currency: "eur".to_string(),
            search_max_results: 5,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub llm: LlmConfig,
    pub connectors: ConnectorConfig,
    pub planner: PlannerKind,
}

impl ResearchConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or_else(|| {
                ResearchError::Config("GOOGLE_API_KEY (or GEMINI_API_KEY) is not set".to_string())
            })?;

        let tavily_api_key = get("TAVILY_API_KEY")
            .ok_or_else(|| ResearchError::Config("TAVILY_API_KEY is not set".to_string()))?;

        let defaults = ConnectorConfig::default();

        let connectors = ConnectorConfig {
            yahoo_base_url: get("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            yahoo_cookie_url: get("YAHOO_COOKIE_URL").unwrap_or(defaults.yahoo_cookie_url),
            coingecko_base_url: get("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            tavily_base_url: get("TAVILY_BASE_URL").unwrap_or(defaults.tavily_base_url),
            tavily_api_key,
            report_currency: get("REPORT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.report_currency),
            search_max_results: parse_positive("SEARCH_MAX_RESULTS", get("SEARCH_MAX_RESULTS"), defaults.search_max_results)?,
            request_timeout: Duration::from_secs(parse_positive(
                "CONNECTOR_TIMEOUT_SECS",
                get("CONNECTOR_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
        };

        let planner = match get("RESEARCH_PLANNER") {
            Some(raw) => raw.parse::<PlannerKind>()?,
            None => PlannerKind::default(),
        };

        Ok(Self {
            llm: LlmConfig {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            connectors,
            planner,
        })
    }
}

/// Parse a count or duration that must be greater than zero
fn parse_positive<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr + Default + PartialEq,
{
    let Some(value) = raw else {
        return Ok(default);
    };

    let parsed = value.parse::<T>().map_err(|_| {
        ResearchError::Config(format!("{} must be a number, got '{}'", key, value))
    })?;

    if parsed == T::default() {
        return Err(ResearchError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(parsed)
}
