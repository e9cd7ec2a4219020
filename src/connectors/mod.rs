//! Data connectors
//!
//! Each connector wraps one external data source and normalizes its response
//! into an [`ActionResult`]. A connector never returns an error: upstream
//! failures are converted into `ActionResult::Error` at this boundary.

use crate::config::ConnectorConfig;
use crate::error::ResearchError;
use crate::models::ActionResult;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

pub mod crypto;
pub mod equity;
pub mod indicators;
pub mod search;
pub mod yahoo;

pub use crypto::CoinGeckoConnector;
pub use equity::YahooEquityConnector;
pub use indicators::YahooIndicatorsConnector;
pub use search::{clean_search_query, TavilySearchConnector};
pub use yahoo::YahooFinanceClient;

/// Equity fundamentals, valuation and price history
#[async_trait]
pub trait EquityConnector: Send + Sync {
    async fn fetch(&self, ticker: &str, period: &str) -> ActionResult;
}

/// Cryptocurrency market snapshot
#[async_trait]
pub trait CryptoConnector: Send + Sync {
    async fn fetch(&self, symbol: &str) -> ActionResult;
}

/// Free-text web search
#[async_trait]
pub trait SearchConnector: Send + Sync {
    async fn fetch(&self, query: &str) -> ActionResult;
}

/// Fixed basket of broad market indicators
#[async_trait]
pub trait IndicatorsConnector: Send + Sync {
    async fn fetch(&self) -> ActionResult;
}

/// The connectors an execution engine dispatches to
#[derive(Clone)]
pub struct ConnectorSet {
    pub equity: Arc<dyn EquityConnector>,
    pub crypto: Arc<dyn CryptoConnector>,
    pub search: Arc<dyn SearchConnector>,
    pub indicators: Arc<dyn IndicatorsConnector>,
}

/// HTTP client shared by the connectors of one set.
/// Keeps cookies so the Yahoo Finance session survives between calls.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .cookie_store(true)
        .timeout(timeout)
        .user_agent(concat!("financial-research-agent/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Create the production connectors (Yahoo Finance, CoinGecko, Tavily)
pub fn create_default_connectors(config: &ConnectorConfig) -> Result<ConnectorSet> {
    let client = build_http_client(config.request_timeout)?;
    let yahoo = YahooFinanceClient::new(client.clone(), &config.yahoo_base_url)
        .with_cookie_url(&config.yahoo_cookie_url);

    Ok(ConnectorSet {
        equity: Arc::new(YahooEquityConnector::new(yahoo.clone())),
        crypto: Arc::new(CoinGeckoConnector::new(
            client.clone(),
            &config.coingecko_base_url,
            &config.report_currency,
        )),
        search: Arc::new(TavilySearchConnector::new(
            client,
            &config.tavily_base_url,
            &config.tavily_api_key,
            config.search_max_results,
        )),
        indicators: Arc::new(YahooIndicatorsConnector::new(yahoo)),
    })
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ResearchError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| ResearchError::Config(format!("base URL '{}' cannot take a path", base_url)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
