//! Two-pass LLM repair of raw OCR text: sentence repair, then paragraph
//! reconstruction.
use crate::config::PromptSet;
use crate::llm_client::TextGenerator;
use std::sync::Arc;
use tracing::warn;

pub struct TextCleaner {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptSet,
}

impl TextCleaner {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: PromptSet) -> Self {
        Self { generator, prompts }
    }

    /// Cleans one page of OCR text.
    ///
    /// Blank input comes back unchanged. When a pass fails, its input is
    /// carried forward, so a dead endpoint yields the original text.
    pub async fn clean(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let repaired = self
            .pass(
                "sentence repair",
                &self.prompts.cleaning_template,
                &self.prompts.sentence_repair_system,
                text,
            )
            .await;

        self.pass(
            "paragraph reconstruction",
            &self.prompts.reconstruction_template,
            &self.prompts.paragraph_reconstruction_system,
            &repaired,
        )
        .await
    }

    async fn pass(&self, name: &str, template: &str, system: &str, input: &str) -> String {
        let prompt = PromptSet::render(template, input);
        let num_predict = self.generator.options().num_predict_for(input);

        match self.generator.generate(&prompt, system, num_predict).await {
            Ok(output) if !output.trim().is_empty() => output,
            Ok(_) => {
                warn!("{} returned an empty response, keeping its input", name);
                input.to_string()
            }
            Err(e) => {
                warn!("{} failed, keeping its input: {}", name, e);
                input.to_string()
            }
        }
    }
}
