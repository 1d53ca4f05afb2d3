//! Prompts the model for question-answer pairs about one page of text.
use crate::config::PromptSet;
use crate::llm_client::{LlmError, TextGenerator};
use std::sync::Arc;
use tracing::debug;

pub struct QaGenerator {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptSet,
    pairs_per_page: usize,
}

impl QaGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: PromptSet, pairs_per_page: usize) -> Self {
        Self {
            generator,
            prompts,
            pairs_per_page,
        }
    }

    pub fn pairs_per_page(&self) -> usize {
        self.pairs_per_page
    }

    /// Returns the raw model response; pulling records out of it is the
    /// extractor's job.
    pub async fn generate(&self, text: &str) -> Result<String, LlmError> {
        let system = self.prompts.qa_system_prompt(self.pairs_per_page);
        let prompt = PromptSet::render(&self.prompts.qa_template, text);
        let num_predict = self.generator.options().num_predict_for(text);

        debug!(
            pairs = self.pairs_per_page,
            num_predict, "requesting question-answer pairs"
        );
        self.generator.generate(&prompt, &system, num_predict).await
    }
}
