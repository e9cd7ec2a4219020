//! Financial Research Agent
//!
//! Answers natural-language financial questions by:
//! - Planning which data sources to consult (keyword rules or an LLM)
//! - Fetching equity, crypto, market-indicator and web-search data
//! - Collecting every result, failures included, into one evidence bundle
//! - Synthesizing a grounded answer from that bundle alone
//!
//! PIPELINE:
//! QUERY → PLAN → EXECUTE → SYNTHESIZE → ANSWER

pub mod agent;
pub mod audit;
pub mod config;
pub mod connectors;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod models;
pub mod planner;
pub mod synthesizer;

pub use error::{ResearchError, Result};

// Re-export common types
pub use agent::{ResearchAgent, ResearchOutcome};
pub use config::ResearchConfig;
pub use models::*;
