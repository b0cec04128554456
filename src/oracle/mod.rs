pub mod llm;
pub mod parse;
pub mod prompts;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::collab;
use crate::model::{Candidate, Judgment};

pub const FALLBACK_SUMMARY: &str = "AI analysis unavailable";

/// The external judgment call. Implementations may fail; [`OracleClient`]
/// absorbs the failure.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn judge(&self, candidate: &Candidate) -> Result<Judgment>;
}

/// One attempt per candidate, never an error: any fault yields the fixed
/// fallback judgment.
pub struct OracleClient {
    scorer: Arc<dyn Scorer>,
    fallback: Judgment,
}

impl OracleClient {
    pub fn new(scorer: Arc<dyn Scorer>, fallback_score: f64) -> Self {
        Self {
            scorer,
            fallback: Judgment {
                score: fallback_score,
                summary: FALLBACK_SUMMARY.to_string(),
            },
        }
    }

    pub async fn score(&self, candidate: &Candidate) -> Judgment {
        collab::call_or("oracle", self.scorer.judge(candidate), || self.fallback.clone()).await
    }
}
