//! Crypto connector backed by the CoinGecko API

use super::CryptoConnector;
use crate::error::ResearchError;
use crate::models::{ActionResult, CryptoSnapshot};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

const SOURCE: &str = "CoinGecko";

pub struct CoinGeckoConnector {
    client: Client,
    base_url: String,
    currency: String,
}

impl CoinGeckoConnector {
    pub fn new(client: Client, base_url: &str, currency: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_lowercase(),
        }
    }

    async fn fetch_coin(&self, id: &str) -> Result<CryptoSnapshot> {
        let url = super::endpoint(&self.base_url, &["coins", id])?;

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::UpstreamStatus {
                source_name: SOURCE,
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        parse_coin(&body, id, &self.currency)
    }
}

#[async_trait]
impl CryptoConnector for CoinGeckoConnector {
    async fn fetch(&self, symbol: &str) -> ActionResult {
        let id = symbol.trim().to_lowercase();

        match self.fetch_coin(&id).await {
            Ok(snapshot) => {
                debug!(coin = %id, "Crypto data fetched");
                ActionResult::Crypto(snapshot)
            }
            Err(e) => {
                warn!(coin = %id, error = %e, "Crypto fetch failed");
                ActionResult::error(format!("Failed to fetch crypto data for {}: {}", id, e))
            }
        }
    }
}

/// Normalize a `/coins/{id}` body into a snapshot in `currency`
pub(crate) fn parse_coin(body: &Value, id: &str, currency: &str) -> Result<CryptoSnapshot> {
    // CoinGecko answers throttled requests with a body lacking market data
    let market = body
        .get("market_data")
        .filter(|m| m.is_object())
        .ok_or_else(|| {
            ResearchError::MissingData(
                "response missing market data (likely rate limited)".to_string(),
            )
        })?;

    let in_currency = |field: &str| market.get(field).and_then(|v| v.get(currency));
    let amount = |field: &str| in_currency(field).and_then(Value::as_f64);
    let date = |field: &str| {
        in_currency(field)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    };
    let number = |field: &str| market.get(field).and_then(Value::as_f64);

    Ok(CryptoSnapshot {
        source: "CoinGecko API".to_string(),
        symbol: id.to_string(),
        name: body.get("name").and_then(Value::as_str).map(str::to_string),
        currency: currency.to_string(),
        current_price: amount("current_price"),
        market_cap: amount("market_cap"),
        market_cap_rank: body
            .get("market_cap_rank")
            .and_then(Value::as_u64)
            .map(|r| r as u32),
        total_volume: amount("total_volume"),
        price_change_24h_percent: number("price_change_percentage_24h"),
        price_change_7d_percent: number("price_change_percentage_7d"),
        price_change_30d_percent: number("price_change_percentage_30d"),
        price_change_1y_percent: number("price_change_percentage_1y"),
        all_time_high: amount("ath"),
        all_time_high_date: date("ath_date"),
        all_time_low: amount("atl"),
        all_time_low_date: date("atl_date"),
        circulating_supply: number("circulating_supply"),
        total_supply: number("total_supply"),
    })
}
