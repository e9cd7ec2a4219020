//! Planner trait and implementations
//!
//! A planner turns a raw query into an ordered list of research actions.
//! Two interchangeable strategies exist: deterministic keyword rules and an
//! LLM-prompted planner.

use crate::error::ResearchError;
use crate::gemini::LanguageModel;
use crate::models::{Action, ActionRequest};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod llm;
pub mod rules;

pub use llm::LlmPlanner;
pub use rules::{PlannerRules, RuleBasedPlanner};

/// Trait for plan generation
#[async_trait]
pub trait Planner: Send + Sync {
    /// Plan the research steps for a query. An empty plan means "no opinion".
    async fn plan(&self, query: &str) -> Vec<ActionRequest>;
}

/// Planning strategy selected at configuration time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlannerKind {
    #[default]
    Rules,
    Llm,
}

impl FromStr for PlannerKind {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "rule" | "rule-based" => Ok(PlannerKind::Rules),
            "llm" | "gemini" => Ok(PlannerKind::Llm),
            other => Err(ResearchError::Config(format!(
                "unknown planner '{}', expected 'rules' or 'llm'",
                other
            ))),
        }
    }
}

impl fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlannerKind::Rules => "rules",
            PlannerKind::Llm => "llm",
        };
        write!(f, "{}", s)
    }
}

/// Build the planner for a configured strategy
pub fn build_planner(
    kind: PlannerKind,
    rules: PlannerRules,
    llm: Arc<dyn LanguageModel>,
) -> Box<dyn Planner> {
    match kind {
        PlannerKind::Rules => Box::new(RuleBasedPlanner::new(rules)),
        PlannerKind::Llm => Box::new(LlmPlanner::new(llm)),
    }
}

/// Universal safety net: search the web for the raw query
pub fn fallback_plan(query: &str) -> Vec<ActionRequest> {
    vec![ActionRequest::new(
        Action::search_web(query),
        "Fallback search",
    )]
}
