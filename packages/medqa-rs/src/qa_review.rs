//! Second-opinion pass over an existing set of question-answer pairs.
//!
//! Each pair is sent to the model on its own. Whatever the model sends back
//! goes through the extractor; a pair survives only if the model returns it.
use crate::config::PromptSet;
use crate::llm_client::TextGenerator;
use crate::qa_extractor::{extract_qa_pairs, QaPair};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Responses that mean "nothing passed".
const REJECTION_SENTINELS: &[&str] = &["", "{}", "[]", "空"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReviewStats {
    pub reviewed: usize,
    pub kept: usize,
    pub dropped: usize,
    /// Pairs kept unchanged because the model could not be reached.
    pub unreviewed: usize,
}

#[derive(Debug)]
pub enum Verdict {
    Keep(Vec<QaPair>),
    Drop,
    Unreviewed(QaPair),
}

pub struct QaReviewer {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptSet,
}

impl QaReviewer {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: PromptSet) -> Self {
        Self { generator, prompts }
    }

    pub async fn review_pair(&self, pair: &QaPair) -> Verdict {
        let serialized = match serde_json::to_string(pair) {
            Ok(s) => s,
            Err(e) => {
                warn!("could not serialize pair for review: {}", e);
                return Verdict::Unreviewed(pair.clone());
            }
        };
        let prompt = PromptSet::render(&self.prompts.review_template, &serialized);
        let num_predict = self.generator.options().num_predict_for(&serialized);

        let response = match self
            .generator
            .generate(&prompt, &self.prompts.review_system, num_predict)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("review request failed, keeping pair: {}", e);
                return Verdict::Unreviewed(pair.clone());
            }
        };

        let trimmed = response.trim();
        if REJECTION_SENTINELS.contains(&trimmed) {
            debug!(question = %pair.question, "pair rejected");
            return Verdict::Drop;
        }

        let survivors = extract_qa_pairs(trimmed);
        if survivors.is_empty() {
            Verdict::Drop
        } else {
            Verdict::Keep(survivors)
        }
    }

    /// Reviews every pair in order, one request at a time.
    pub async fn review(&self, pairs: &[QaPair]) -> (Vec<QaPair>, ReviewStats) {
        let mut kept = Vec::with_capacity(pairs.len());
        let mut stats = ReviewStats::default();

        for pair in pairs {
            stats.reviewed += 1;
            match self.review_pair(pair).await {
                Verdict::Keep(survivors) => {
                    stats.kept += 1;
                    kept.extend(survivors);
                }
                Verdict::Drop => stats.dropped += 1,
                Verdict::Unreviewed(original) => {
                    stats.unreviewed += 1;
                    kept.push(original);
                }
            }
        }

        info!(
            "reviewed {} pairs: {} kept, {} dropped, {} unreviewed",
            stats.reviewed, stats.kept, stats.dropped, stats.unreviewed
        );
        (kept, stats)
    }
}
