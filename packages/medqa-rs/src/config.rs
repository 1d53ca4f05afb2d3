//! Run configuration: collaborator endpoints, generation options and prompts.
//!
//! Everything has a default, so an empty TOML file (or none at all) is a
//! valid configuration. Sections mirror the stages of the pipeline.
use anyhow::{Context, Result};
use medqa_ocr::{ReadingOrderConfig, TesseractConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sampling options forwarded to the text-generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Upper bound for `num_predict`; the effective value is twice the input
    /// length in characters, capped here.
    pub max_predict: usize,
    pub repeat_penalty: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.8,
            max_predict: 4000,
            repeat_penalty: 1.2,
        }
    }
}

impl GenerationOptions {
    /// Token budget for a request whose input is `input` text.
    pub fn num_predict_for(&self, input: &str) -> usize {
        input.chars().count().saturating_mul(2).min(self.max_predict)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub options: GenerationOptions,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout_secs: 60,
            options: GenerationOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Base URL of the layout detection sidecar.
    pub endpoint: String,
    /// Detector class kept as text.
    pub text_label: String,
    pub timeout_secs: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090".to_string(),
            text_label: "Text".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub binary: PathBuf,
    pub dpi: u32,
    /// Limit for rasterizing a whole document.
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            dpi: 300,
            timeout_secs: 600,
        }
    }
}

const SENTENCE_REPAIR_SYSTEM: &str = "You are a professional text repair specialist. \
Process the input text as follows:
1. Delete incoherent sentence fragments, meaningless breaks and incomplete expressions.
2. Fix grammatical errors.
3. Improve sentence flow so the logic reads coherently.
4. Preserve the meaning of the original text.
5. Keep necessary punctuation and remove stray symbols left over from OCR.

Output requirements:
- Return only the cleaned body text as one continuous passage.
- Do not add explanations or markup.
- Keep paragraph structure and important formatting.";

const PARAGRAPH_RECONSTRUCTION_SYSTEM: &str = "You are a text reconstruction specialist. \
Repair the following text in depth:
- Identify and delete disconnected fragments and stray sub-headings.
- Merge semantically related short sentences and rebuild logical connections.
- Keep technical terms and key information intact.
- Delete author information, keyword lists and publication background such as \
guideline titles, editions and issuing societies.

Principles: semantic coherence first, keep the original style, repair rather than \
rewrite, stay technically accurate. Do not add explanations or markup.";

const QA_SYSTEM: &str = "Role: you are a medical expert.

Task: summarize the given text and produce {count} question-answer pairs. Every pair \
must be either a clinical consultation question about a specific disease or the \
explanation of a medical term.

Rules:
- Questions and answers are written in professional {language}.
- Answers may quote complete sentences from the text.
- Never produce pairs about the document itself (\"this guideline\", \"this article\").
- Skip any question without a clear answer in the text; every question must be answered.

Output format:
```json
[
    {\"human\": \"question 1\", \"assistant\": \"complete answer sentence\"},
    {\"human\": \"question 2\", \"assistant\": \"complete answer sentence\"}
]
```
If nothing can be generated, output an empty array [].";

const REVIEW_SYSTEM: &str = "You are a medical content quality reviewer who filters \
low-quality question-answer pairs.

Remove a pair if any of the following holds:
- the answer is empty;
- the answer merely repeats or rephrases the question;
- the answer does not address the question;
- the content contains factual errors or dangerous medical advice;
- the answer is too vague to be useful.

Keep pairs whose question is clear and valuable and whose answer is accurate, \
professional and clinically useful.

Output only the pairs that pass, in their original JSON format, without any \
description of the review. Output [] if none pass.";

/// System prompts and user-prompt templates for every LLM call.
///
/// Templates substitute `{text}`, system prompts `{count}` and `{language}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub language: String,
    pub sentence_repair_system: String,
    pub paragraph_reconstruction_system: String,
    pub qa_system: String,
    pub review_system: String,
    pub cleaning_template: String,
    pub reconstruction_template: String,
    pub qa_template: String,
    pub review_template: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            language: "Simplified Chinese".to_string(),
            sentence_repair_system: SENTENCE_REPAIR_SYSTEM.to_string(),
            paragraph_reconstruction_system: PARAGRAPH_RECONSTRUCTION_SYSTEM.to_string(),
            qa_system: QA_SYSTEM.to_string(),
            review_system: REVIEW_SYSTEM.to_string(),
            cleaning_template: "Text to process:\n{text}\n\nReturn the cleaned text:".to_string(),
            reconstruction_template: "Text to process:\n{text}\n\nReturn the reconstructed text:"
                .to_string(),
            qa_template: "Text:\n{text}\n\nGenerate questions and answers from the text above; \
make sure every question has a clear answer in the text:"
                .to_string(),
            review_template: "Pairs to review:\n{text}\n\nReturn the pairs that pass:".to_string(),
        }
    }
}

impl PromptSet {
    /// Fills `{text}` in a user-prompt template.
    pub fn render(template: &str, text: &str) -> String {
        template.replace("{text}", text)
    }

    /// QA system prompt with the pair count and output language filled in.
    pub fn qa_system_prompt(&self, count: usize) -> String {
        self.qa_system
            .replace("{count}", &count.to_string())
            .replace("{language}", &self.language)
    }
}

/// Top-level configuration of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub prompts: PromptSet,
    pub layout: LayoutConfig,
    pub ocr: TesseractConfig,
    pub render: RenderConfig,
    pub reading_order: ReadingOrderConfig,
    pub qa: QaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub pairs_per_page: usize,
    /// Drop pairs whose answer does not occur in the page text.
    pub require_grounded_answers: bool,
    pub output_file: String,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            pairs_per_page: 20,
            require_grounded_answers: false,
            output_file: "qa.jsonl".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads a TOML configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
