//! Broad market indicators (S&P 500, VIX, 10-year Treasury yield)

use super::yahoo::YahooFinanceClient;
use super::IndicatorsConnector;
use crate::models::{ActionResult, IndexLevel, MarketIndicators, VolatilityLevel, YieldLevel};
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

const SP500: &str = "^GSPC";
const VIX: &str = "^VIX";
const TREASURY_10Y: &str = "^TNX";
const LOOKBACK: &str = "1mo";

/// VIX levels below this are read as a calm market
pub const LOW_VOLATILITY_THRESHOLD: f64 = 20.0;

pub struct YahooIndicatorsConnector {
    yahoo: YahooFinanceClient,
}

impl YahooIndicatorsConnector {
    pub fn new(yahoo: YahooFinanceClient) -> Self {
        Self { yahoo }
    }

    async fn collect(&self) -> Result<MarketIndicators> {
        let sp500 = self.yahoo.daily_closes(SP500, LOOKBACK).await?;
        let vix = self.yahoo.daily_closes(VIX, LOOKBACK).await?;
        let treasury = self.yahoo.daily_closes(TREASURY_10Y, LOOKBACK).await?;

        Ok(build_indicators(&sp500, &vix, &treasury))
    }
}

#[async_trait]
impl IndicatorsConnector for YahooIndicatorsConnector {
    async fn fetch(&self) -> ActionResult {
        match self.collect().await {
            Ok(indicators) => {
                debug!(vix = ?indicators.vix.current, "Market indicators fetched");
                ActionResult::Indicators(indicators)
            }
            Err(e) => {
                warn!(error = %e, "Market indicators fetch failed");
                ActionResult::error(format!("Failed to fetch market indicators: {}", e))
            }
        }
    }
}

pub(crate) fn build_indicators(sp500: &[f64], vix: &[f64], treasury: &[f64]) -> MarketIndicators {
    let vix_current = vix.last().copied();

    MarketIndicators {
        source: "Yahoo Finance".to_string(),
        sp500: IndexLevel {
            current: sp500.last().copied(),
            change_1m_percent: percent_change(sp500),
        },
        vix: VolatilityLevel {
            current: vix_current,
            interpretation: vix_current.map(|v| interpret_vix(v).to_string()),
        },
        treasury_10y: YieldLevel {
            current: treasury.last().copied(),
        },
    }
}

pub fn interpret_vix(level: f64) -> &'static str {
    if level < LOW_VOLATILITY_THRESHOLD {
        "low volatility"
    } else {
        "high volatility"
    }
}

fn percent_change(closes: &[f64]) -> Option<f64> {
    let first = *closes.first()?;
    let last = *closes.last()?;
    if first == 0.0 {
        return None;
    }
    Some((last / first - 1.0) * 100.0)
}
