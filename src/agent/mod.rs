//! Research orchestrator
//!
//! QUERY → PLAN → (FALLBACK?) → EXECUTE → SYNTHESIZE → ANSWER

use crate::audit::compute_bundle_hash;
use crate::config::ResearchConfig;
use crate::connectors::create_default_connectors;
use crate::execution::ExecutionEngine;
use crate::gemini::{GeminiClient, LanguageModel};
use crate::models::{ActionRequest, ResearchBundle};
use crate::planner::{build_planner, fallback_plan, Planner, PlannerRules};
use crate::synthesizer::Synthesizer;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything one research run produced
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub steps: Vec<ActionRequest>,
    pub bundle: ResearchBundle,
    pub fingerprint: String,
    pub answer: String,
}

/// Coordinates planner, execution engine and synthesizer for one query at a time
pub struct ResearchAgent {
    planner: Box<dyn Planner>,
    execution_engine: ExecutionEngine,
    synthesizer: Synthesizer,
}

impl ResearchAgent {
    pub fn new(
        planner: Box<dyn Planner>,
        execution_engine: ExecutionEngine,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            planner,
            execution_engine,
            synthesizer,
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(&config.llm)?);
        let connectors = create_default_connectors(&config.connectors)?;

        info!(
            planner = %config.planner,
            model = %config.llm.model,
            currency = %config.connectors.report_currency,
            "Research agent configured"
        );

        Ok(Self::new(
            build_planner(config.planner, PlannerRules::default(), llm.clone()),
            ExecutionEngine::new(connectors),
            Synthesizer::new(llm),
        ))
    }

    /// Answer a query; never fails
    pub async fn run(&self, query: &str) -> String {
        self.research(query).await.answer
    }

    /// Run the full pipeline and keep every intermediate artifact
    pub async fn research(&self, query: &str) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("research", %run_id);

        async move {
            let start = Instant::now();
            info!(query = %query, "Research started");

            let mut steps = self.planner.plan(query).await;
            if steps.is_empty() {
                warn!("Planner returned no steps - using fallback search");
                steps = fallback_plan(query);
            }

            debug!(
                steps = ?steps.iter().map(|s| s.action.name()).collect::<Vec<_>>(),
                "Plan ready"
            );

            let bundle = self.execution_engine.execute(&steps).await;
            let fingerprint = compute_bundle_hash(&bundle);

            let failed = bundle
                .entries()
                .iter()
                .filter(|e| e.result.is_error())
                .count();

            info!(
                entries = bundle.len(),
                failed,
                fingerprint = %fingerprint,
                "Evidence collected"
            );

            let answer = self.synthesizer.synthesize(query, &bundle).await;

            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Research complete"
            );

            ResearchOutcome {
                run_id,
                steps,
                bundle,
                fingerprint,
                answer,
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResearchError;
    use crate::execution::fakes;
    use crate::models::{Action, GET_CRYPTO_DATA, GET_MARKET_INDICATORS, SEARCH_WEB};
    use crate::planner::{LlmPlanner, RuleBasedPlanner};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    /// Replies with `plan` to planning prompts and `answer` to everything else
    struct FakeModel {
        plan: String,
        answer: crate::Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn new(plan: &str, answer: &str) -> Self {
            Self {
                plan: plan.to_string(),
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing_synthesis() -> Self {
            Self {
                plan: String::new(),
                answer: Err(ResearchError::Llm("model overloaded".to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn generate(&self, prompt: &str, system: Option<&str>) -> crate::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if system.is_none() {
                return Ok(self.plan.clone());
            }
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(ResearchError::Llm(e.to_string())),
            }
        }
    }

    fn rules_agent(crypto_error: Option<&str>, model: Arc<FakeModel>) -> (ResearchAgent, Arc<fakes::CallLog>) {
        let (connectors, calls) = fakes::connector_set(crypto_error);
        let agent = ResearchAgent::new(
            Box::new(RuleBasedPlanner::new(PlannerRules::default())),
            ExecutionEngine::new(connectors),
            Synthesizer::new(model),
        );
        (agent, calls)
    }

    #[tokio::test]
    async fn test_crypto_query_with_rate_limited_source() {
        let model = Arc::new(FakeModel::new("", "Bitcoin data unavailable. Not financial advice."));
        let (agent, calls) = rules_agent(Some("CoinGecko returned status code 429"), model.clone());

        let outcome = agent.research("bitcoin price").await;

        assert_eq!(
            outcome.steps.iter().map(|s| s.action.name()).collect::<Vec<_>>(),
            vec![GET_CRYPTO_DATA, GET_MARKET_INDICATORS]
        );
        assert_eq!(outcome.bundle.len(), 2);

        let crypto = outcome.bundle.get("step_1_get_crypto_data").unwrap();
        assert!(crypto.error_message().unwrap().contains("status code 429"));
        assert!(!outcome
            .bundle
            .get("step_2_get_market_indicators")
            .unwrap()
            .is_error());

        assert_eq!(outcome.answer, "Bitcoin data unavailable. Not financial advice.");
        assert_eq!(calls.total(), 2);

        // One synthesis call, no planning call for the rule planner
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("status code 429"));
    }

    #[tokio::test]
    async fn test_general_question_searches_once() {
        let model = Arc::new(FakeModel::new("", "Ethereum is a blockchain."));
        let (agent, calls) = rules_agent(None, model);

        let outcome = agent.research("What is Ethereum?").await;
        assert_eq!(
            outcome.steps,
            vec![ActionRequest::new(Action::search_web("What is Ethereum?"), "General question")]
        );
        assert_eq!(outcome.bundle.step_ids(), vec!["step_1_search_web"]);
        assert_eq!(calls.search.load(Ordering::SeqCst), 1);
        assert_eq!(calls.total(), 1);
    }

    #[tokio::test]
    async fn test_empty_llm_plan_falls_back_to_search() {
        let model = Arc::new(FakeModel::new("I am not sure what to do.", "Here is what I found."));
        let (connectors, calls) = fakes::connector_set(None);
        let agent = ResearchAgent::new(
            Box::new(LlmPlanner::new(model.clone())),
            ExecutionEngine::new(connectors),
            Synthesizer::new(model.clone()),
        );

        let outcome = agent.research("gold outlook").await;

        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].action, Action::search_web("gold outlook"));
        assert_eq!(outcome.steps[0].action.name(), SEARCH_WEB);
        assert_eq!(outcome.bundle.step_ids(), vec!["step_1_search_web"]);
        assert_eq!(calls.total(), 1);
        assert_eq!(model.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_runs_share_fingerprint() {
        let model = Arc::new(FakeModel::new("", "Same answer."));
        let (agent, _) = rules_agent(None, model);

        let first = agent.research("ethereum price").await;
        let second = agent.research("ethereum price").await;

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.bundle, second.bundle);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_reported_as_answer() {
        let (agent, _) = rules_agent(None, Arc::new(FakeModel::failing_synthesis()));

        let answer = agent.run("tesla earnings").await;
        assert!(answer.starts_with("Error generating analysis:"));
        assert!(answer.contains("model overloaded"));
    }
}
