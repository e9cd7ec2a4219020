mod common;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{chart_body, fixture_json, reply, spawn_stub, stub_config};
use financial_research_agent::{
    audit::verify_bundle_hash,
    config::LlmConfig,
    connectors::create_default_connectors,
    execution::ExecutionEngine,
    gemini::{GeminiClient, LanguageModel},
    planner::{LlmPlanner, PlannerRules, RuleBasedPlanner},
    synthesizer::Synthesizer,
    Action, ResearchAgent,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const PLAN_REPLY: &str = r#"Plan:
{"steps": [
  {"action": "get_equity_data", "params": {"ticker": "aapl"}, "reason": "Valuation"},
  {"action": "get_weather", "params": {"city": "Cupertino"}, "reason": "Irrelevant"}
]}"#;

/// Requests seen by the Gemini stub
#[derive(Clone, Default)]
struct GeminiLog(Arc<Mutex<Vec<Value>>>);

async fn generate(State(log): State<GeminiLog>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let is_synthesis = body.get("systemInstruction").is_some();
    log.0.lock().unwrap().push(body);

    let text = if is_synthesis {
        "According to the collected data, the answer is grounded. This is not financial advice."
    } else {
        PLAN_REPLY
    };

    reply(
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}]}),
    )
}

async fn chart(Path(symbol): Path<String>) -> (StatusCode, Json<Value>) {
    match symbol.as_str() {
        "AAPL" => reply(StatusCode::OK, fixture_json("yahoo_chart_aapl.json")),
        _ => reply(StatusCode::OK, chart_body(&symbol, &[100.0, 110.0])),
    }
}

async fn coin(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "bitcoin" {
        reply(
            StatusCode::TOO_MANY_REQUESTS,
            fixture_json("coingecko_rate_limited.json"),
        )
    } else {
        reply(StatusCode::OK, fixture_json("coingecko_bitcoin.json"))
    }
}

/// One local server standing in for every provider
async fn provider_stub() -> (String, GeminiLog) {
    let log = GeminiLog::default();
    let app = Router::new()
        .route(
            "/v10/finance/quoteSummary/:ticker",
            get(|| async { reply(StatusCode::OK, fixture_json("yahoo_quote_summary_aapl.json")) }),
        )
        .route("/v8/finance/chart/:symbol", get(chart))
        .route("/v1/test/getcrumb", get(|| async { "test-crumb" }))
        .route("/consent", get(|| async { StatusCode::NOT_FOUND }))
        .route("/coins/:id", get(coin))
        .route(
            "/search",
            post(|| async { reply(StatusCode::OK, fixture_json("tavily_search.json")) }),
        )
        .route("/models/:call", post(generate))
        .with_state(log.clone());

    (spawn_stub(app).await, log)
}

fn gemini(base: &str) -> Arc<dyn LanguageModel> {
    let config = LlmConfig {
        api_key: "test-key".to_string(),
        model: "gemini-2.5-flash".to_string(),
        base_url: base.to_string(),
    };
    Arc::new(GeminiClient::new(&config).unwrap())
}

#[tokio::test]
async fn rule_planned_crypto_query_survives_rate_limit() {
    let (base, log) = provider_stub().await;
    let llm = gemini(&base);

    let agent = ResearchAgent::new(
        Box::new(RuleBasedPlanner::new(PlannerRules::default())),
        ExecutionEngine::new(create_default_connectors(&stub_config(&base)).unwrap()),
        Synthesizer::new(llm),
    );

    let outcome = agent.research("bitcoin price").await;

    assert_eq!(
        outcome.bundle.step_ids(),
        vec!["step_1_get_crypto_data", "step_2_get_market_indicators"]
    );
    let crypto = outcome.bundle.get("step_1_get_crypto_data").unwrap();
    assert!(crypto.error_message().unwrap().contains("status code 429"));
    assert!(!outcome
        .bundle
        .get("step_2_get_market_indicators")
        .unwrap()
        .is_error());

    assert!(outcome.answer.contains("not financial advice"));
    assert!(verify_bundle_hash(&outcome.bundle, &outcome.fingerprint));

    // Only the synthesis call reaches the model
    let requests = log.0.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let prompt = requests[0]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("User question: bitcoin price"));
    assert!(prompt.contains("status code 429"));
}

#[tokio::test]
async fn llm_planned_query_drops_invalid_steps() {
    let (base, log) = provider_stub().await;
    let llm = gemini(&base);

    let agent = ResearchAgent::new(
        Box::new(LlmPlanner::new(llm.clone())),
        ExecutionEngine::new(create_default_connectors(&stub_config(&base)).unwrap()),
        Synthesizer::new(llm),
    );

    let outcome = agent.research("How is Apple valued?").await;

    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].action, Action::equity("AAPL"));
    assert_eq!(outcome.bundle.step_ids(), vec!["step_1_get_equity_data"]);
    assert!(!outcome.bundle.get("step_1_get_equity_data").unwrap().is_error());

    let requests = log.0.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("systemInstruction").is_none());
    let synthesis_prompt = requests[1]["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(synthesis_prompt.contains("Apple Inc."));
    assert!(synthesis_prompt.contains("current_price: 189.84"));
}

#[tokio::test]
async fn run_returns_answer_text_only() {
    let (base, _) = provider_stub().await;
    let llm = gemini(&base);

    let agent = ResearchAgent::new(
        Box::new(RuleBasedPlanner::new(PlannerRules::default())),
        ExecutionEngine::new(create_default_connectors(&stub_config(&base)).unwrap()),
        Synthesizer::new(llm),
    );

    let answer = agent.run("What is a covered call?").await;
    assert_eq!(
        answer,
        "According to the collected data, the answer is grounded. This is not financial advice."
    );
}
