use axum::{http::StatusCode, Json, Router};
use financial_research_agent::config::ConnectorConfig;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub fn fixture_path(relative: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn read_fixture(relative: impl AsRef<Path>) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture file should be readable")
}

pub fn fixture_json(relative: impl AsRef<Path>) -> Value {
    serde_json::from_str(&read_fixture(relative)).expect("fixture should be valid JSON")
}

/// JSON reply with a status code, as served by the stub routes
pub fn reply(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub server should bind");
    let addr = listener.local_addr().expect("stub server address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server should run");
    });

    format!("http://{}", addr)
}

/// Connector settings pointing every provider at one base URL
#[allow(dead_code)]
pub fn stub_config(base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        yahoo_base_url: base_url.to_string(),
        yahoo_cookie_url: format!("{}/consent", base_url),
        coingecko_base_url: base_url.to_string(),
        tavily_base_url: base_url.to_string(),
        tavily_api_key: "test-key".to_string(),
        report_currency: "eur".to_string(),
        search_max_results: 5,
        request_timeout: Duration::from_secs(5),
    }
}

/// Daily chart body with the given closes
#[allow(dead_code)]
pub fn chart_body(symbol: &str, closes: &[f64]) -> Value {
    serde_json::json!({
        "chart": {
            "result": [{
                "meta": {"symbol": symbol},
                "indicators": {"quote": [{"close": closes}]}
            }],
            "error": null
        }
    })
}
