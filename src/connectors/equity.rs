//! Equity connector backed by Yahoo Finance

use super::yahoo::{QuoteSummary, YahooFinanceClient};
use super::EquityConnector;
use crate::models::{
    ActionResult, AnalystView, CompanyProfile, EquitySnapshot, FinancialHealth, Growth,
    PriceHistory, Profitability, Valuation,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Trading-day offsets from the latest close
const ONE_MONTH_OFFSET: usize = 22;
const THREE_MONTH_OFFSET: usize = 66;
const SIX_MONTH_OFFSET: usize = 132;

pub struct YahooEquityConnector {
    yahoo: YahooFinanceClient,
}

impl YahooEquityConnector {
    pub fn new(yahoo: YahooFinanceClient) -> Self {
        Self { yahoo }
    }
}

#[async_trait]
impl EquityConnector for YahooEquityConnector {
    async fn fetch(&self, ticker: &str, period: &str) -> ActionResult {
        let ticker = ticker.trim().to_uppercase();

        let summary = match self.yahoo.quote_summary(&ticker).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(%ticker, error = %e, "Equity summary fetch failed");
                return ActionResult::error(format!("Failed to fetch data for {}: {}", ticker, e));
            }
        };

        let closes = match self.yahoo.daily_closes(&ticker, period).await {
            Ok(closes) => closes,
            Err(e) => {
                warn!(%ticker, %period, error = %e, "Price history unavailable");
                Vec::new()
            }
        };

        debug!(%ticker, closes = closes.len(), "Equity data fetched");

        ActionResult::Equity(build_snapshot(&ticker, &summary, &closes))
    }
}

pub(crate) fn build_snapshot(ticker: &str, s: &QuoteSummary, closes: &[f64]) -> EquitySnapshot {
    let mut price_history = price_history(closes);
    price_history.fifty_two_week_high = s.number("summaryDetail", "fiftyTwoWeekHigh");
    price_history.fifty_two_week_low = s.number("summaryDetail", "fiftyTwoWeekLow");

    EquitySnapshot {
        source: "Yahoo Finance".to_string(),
        ticker: ticker.to_string(),
        profile: CompanyProfile {
            name: s.text("price", "longName").or_else(|| s.text("price", "shortName")),
            sector: s.text("assetProfile", "sector"),
            industry: s.text("assetProfile", "industry"),
            market_cap: s.number("price", "marketCap"),
            enterprise_value: s.number("defaultKeyStatistics", "enterpriseValue"),
        },
        valuation: Valuation {
            current_price: s
                .number("financialData", "currentPrice")
                .or_else(|| s.number("price", "regularMarketPrice")),
            pe_ratio: s.number("summaryDetail", "trailingPE"),
            forward_pe: s
                .number("summaryDetail", "forwardPE")
                .or_else(|| s.number("defaultKeyStatistics", "forwardPE")),
            peg_ratio: s.number("defaultKeyStatistics", "pegRatio"),
            price_to_book: s.number("defaultKeyStatistics", "priceToBook"),
            price_to_sales: s.number("summaryDetail", "priceToSalesTrailing12Months"),
            ev_to_revenue: s.number("defaultKeyStatistics", "enterpriseToRevenue"),
            ev_to_ebitda: s.number("defaultKeyStatistics", "enterpriseToEbitda"),
        },
        profitability: Profitability {
            profit_margin: s.number("financialData", "profitMargins"),
            operating_margin: s.number("financialData", "operatingMargins"),
            gross_margin: s.number("financialData", "grossMargins"),
            return_on_equity: s.number("financialData", "returnOnEquity"),
            return_on_assets: s.number("financialData", "returnOnAssets"),
        },
        growth: Growth {
            revenue_growth: s.number("financialData", "revenueGrowth"),
            earnings_growth: s.number("financialData", "earningsGrowth"),
            revenue: s.number("financialData", "totalRevenue"),
            earnings: s.number("defaultKeyStatistics", "netIncomeToCommon"),
        },
        financial_health: FinancialHealth {
            total_cash: s.number("financialData", "totalCash"),
            total_debt: s.number("financialData", "totalDebt"),
            debt_to_equity: s.number("financialData", "debtToEquity"),
            current_ratio: s.number("financialData", "currentRatio"),
            quick_ratio: s.number("financialData", "quickRatio"),
            free_cash_flow: s.number("financialData", "freeCashflow"),
        },
        price_history,
        analyst_view: AnalystView {
            target_price: s.number("financialData", "targetMeanPrice"),
            recommendation: s.text("financialData", "recommendationKey"),
            number_of_analysts: s
                .number("financialData", "numberOfAnalystOpinions")
                .map(|n| n as u32),
        },
    }
}

/// Closing prices at fixed lookback offsets; the oldest close stands in for one year ago
pub fn price_history(closes: &[f64]) -> PriceHistory {
    let len = closes.len();
    let back = |offset: usize| (len > offset).then(|| closes[len - offset]);

    PriceHistory {
        current: closes.last().copied(),
        one_month_ago: back(ONE_MONTH_OFFSET),
        three_months_ago: back(THREE_MONTH_OFFSET),
        six_months_ago: back(SIX_MONTH_OFFSET),
        one_year_ago: closes.first().copied(),
        ..PriceHistory::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_history_offsets() {
        let closes: Vec<f64> = (0..250).map(|i| i as f64).collect();
        let history = price_history(&closes);

        assert_eq!(history.current, Some(249.0));
        assert_eq!(history.one_month_ago, Some(228.0));
        assert_eq!(history.three_months_ago, Some(184.0));
        assert_eq!(history.six_months_ago, Some(118.0));
        assert_eq!(history.one_year_ago, Some(0.0));
    }

    #[test]
    fn test_price_history_short_series() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let history = price_history(&closes);

        assert_eq!(history.one_month_ago, Some(8.0));
        assert_eq!(history.three_months_ago, None);
        assert_eq!(history.six_months_ago, None);

        assert_eq!(price_history(&[]), PriceHistory::default());
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let summary = QuoteSummary::from_modules(
            json!({"price": {"longName": "Apple Inc.", "marketCap": {"raw": 3.0e12}}})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let snapshot = build_snapshot("AAPL", &summary, &[]);
        assert_eq!(snapshot.profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(snapshot.profile.market_cap, Some(3.0e12));
        assert_eq!(snapshot.valuation.pe_ratio, None);
        assert_eq!(snapshot.analyst_view.recommendation, None);
        assert_eq!(snapshot.price_history.current, None);
    }
}
