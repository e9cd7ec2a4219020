//! Yahoo Finance HTTP access shared by the equity and indicator connectors
//!
//! `quoteSummary` only answers requests carrying a session crumb. The crumb
//! is bound to a cookie from the consent host, fetched once and cached; a
//! rejected crumb is refreshed once per call.

use crate::config::DEFAULT_YAHOO_COOKIE_URL;
use crate::error::ResearchError;
use crate::Result;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SOURCE: &str = "Yahoo Finance";

const SUMMARY_MODULES: &str =
    "price,summaryDetail,financialData,defaultKeyStatistics,assetProfile";

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Arc<Mutex<Option<String>>>,
}

/// Modules of one `quoteSummary` result
#[derive(Debug, Clone, Default)]
pub struct QuoteSummary {
    modules: Map<String, Value>,
}

impl QuoteSummary {
    pub fn from_modules(modules: Map<String, Value>) -> Self {
        Self { modules }
    }

    fn field(&self, module: &str, field: &str) -> Option<&Value> {
        self.modules.get(module)?.get(field)
    }

    /// Numeric field, accepting both `{"raw": n, "fmt": ".."}` and bare numbers
    pub fn number(&self, module: &str, field: &str) -> Option<f64> {
        match self.field(module, field)? {
            Value::Number(n) => n.as_f64(),
            Value::Object(obj) => obj.get("raw").and_then(Value::as_f64),
            _ => None,
        }
    }

    pub fn text(&self, module: &str, field: &str) -> Option<String> {
        match self.field(module, field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(obj) => obj.get("fmt").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }
}

impl YahooFinanceClient {
    /// `client` must keep cookies (see `build_http_client`) for the crumb to be honored
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            crumb: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = cookie_url.to_string();
        self
    }

    async fn get_json(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        let url = super::endpoint(&self.base_url, segments)?;
        debug!(%url, "Yahoo Finance request");

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Yahoo reports unknown tickers (404) and bad crumbs (401) with a JSON description
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if let Some(description) = find_error_description(&body) {
                return Err(ResearchError::connector(SOURCE, description));
            }
            return Err(ResearchError::UpstreamStatus {
                source_name: SOURCE,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Session crumb, cached across calls unless `refresh` is set
    async fn crumb(&self, refresh: bool) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if !refresh {
            if let Some(crumb) = cached.as_ref() {
                return Ok(crumb.clone());
            }
        }

        // The consent host usually answers 404; only its Set-Cookie matters
        let consent = self.client.get(&self.cookie_url).send().await?;
        debug!(status = consent.status().as_u16(), "Yahoo session cookie requested");

        let url = super::endpoint(&self.base_url, &["v1", "test", "getcrumb"])?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::UpstreamStatus {
                source_name: SOURCE,
                status: status.as_u16(),
            });
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.starts_with('<') {
            return Err(ResearchError::connector(SOURCE, "session crumb unavailable"));
        }

        debug!("Yahoo session crumb acquired");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_summary(&self, ticker: &str, crumb: &str) -> Result<Value> {
        self.get_json(
            &["v10", "finance", "quoteSummary", ticker],
            &[("modules", SUMMARY_MODULES), ("crumb", crumb)],
        )
        .await
    }

    /// Fetch fundamentals for a ticker
    pub async fn quote_summary(&self, ticker: &str) -> Result<QuoteSummary> {
        let crumb = self.crumb(false).await?;

        let body = match self.fetch_summary(ticker, &crumb).await {
            Err(e) if is_crumb_rejection(&e) => {
                warn!(%ticker, error = %e, "Yahoo crumb rejected, refreshing session");
                let crumb = self.crumb(true).await?;
                self.fetch_summary(ticker, &crumb).await?
            }
            other => other?,
        };

        if let Some(description) = find_error_description(&body) {
            return Err(ResearchError::connector(SOURCE, description));
        }

        body.pointer("/quoteSummary/result/0")
            .and_then(Value::as_object)
            .cloned()
            .map(QuoteSummary::from_modules)
            .ok_or_else(|| ResearchError::MissingData(format!("no quote data for {}", ticker)))
    }

    /// Daily closing prices over `range`, oldest first, gaps skipped
    pub async fn daily_closes(&self, symbol: &str, range: &str) -> Result<Vec<f64>> {
        let body = self
            .get_json(
                &["v8", "finance", "chart", symbol],
                &[("range", range), ("interval", "1d")],
            )
            .await?;

        parse_closes(&body, symbol)
    }
}

/// Yahoo answers a missing or stale session with 401 "Invalid Crumb" / "Invalid Cookie"
fn is_crumb_rejection(error: &ResearchError) -> bool {
    match error {
        ResearchError::UpstreamStatus { status, .. } => *status == 401,
        ResearchError::Connector { message, .. } => {
            message.contains("Invalid Crumb") || message.contains("Invalid Cookie")
        }
        _ => false,
    }
}

pub(crate) fn parse_closes(body: &Value, symbol: &str) -> Result<Vec<f64>> {
    if let Some(description) = find_error_description(body) {
        return Err(ResearchError::connector(SOURCE, description));
    }

    let result = body
        .pointer("/chart/result/0")
        .ok_or_else(|| ResearchError::MissingData(format!("no chart data for {}", symbol)))?;

    Ok(result
        .pointer("/indicators/quote/0/close")
        .and_then(Value::as_array)
        .map(|closes| closes.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default())
}

/// Pull `{"<root>": {"error": {"description": ..}}}` out of a Yahoo body
fn find_error_description(body: &Value) -> Option<String> {
    let root = body.as_object()?.values().next()?;
    let error = root.get("error")?;
    if error.is_null() {
        return None;
    }
    error
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| Some(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_field_shapes() {
        let summary = QuoteSummary::from_modules(
            json!({
                "financialData": {"currentPrice": {"raw": 189.5, "fmt": "189.50"}, "recommendationKey": "buy"},
                "summaryDetail": {"trailingPE": 29.1, "forwardPE": {}},
                "assetProfile": {"sector": "Technology"}
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        assert_eq!(summary.number("financialData", "currentPrice"), Some(189.5));
        assert_eq!(summary.number("summaryDetail", "trailingPE"), Some(29.1));
        assert_eq!(summary.number("summaryDetail", "forwardPE"), None);
        assert_eq!(summary.number("price", "marketCap"), None);
        assert_eq!(summary.text("assetProfile", "sector").as_deref(), Some("Technology"));
        assert_eq!(summary.text("financialData", "recommendationKey").as_deref(), Some("buy"));
    }

    #[test]
    fn test_crumb_rejection_shapes() {
        assert!(is_crumb_rejection(&ResearchError::connector(SOURCE, "Invalid Crumb")));
        assert!(is_crumb_rejection(&ResearchError::UpstreamStatus {
            source_name: SOURCE,
            status: 401,
        }));
        assert!(!is_crumb_rejection(&ResearchError::connector(
            SOURCE,
            "Quote not found for symbol: ZZZZ"
        )));
        assert!(!is_crumb_rejection(&ResearchError::UpstreamStatus {
            source_name: SOURCE,
            status: 404,
        }));
    }

    #[test]
    fn test_parse_closes_skips_gaps() {
        let body = json!({
            "chart": {
                "result": [{"indicators": {"quote": [{"close": [1.0, null, 3.0]}]}}],
                "error": null
            }
        });
        assert_eq!(parse_closes(&body, "^VIX").unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_parse_closes_reports_upstream_error() {
        let body = json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}
        });
        let err = parse_closes(&body, "ZZZZ").unwrap_err();
        assert!(err.to_string().contains("symbol may be delisted"));
    }
}
