//! # medqa-rs
//!
//! A library for turning scanned medical guideline PDFs into question-answer
//! pairs with OCR and a locally hosted LLM.
//!
//! ## Features
//!
//! - **Layout-aware OCR**: Text regions are detected per page, put into two-column reading order and recognized one by one
//! - **LLM Text Cleaning**: Sentence repair and paragraph reconstruction passes over the raw OCR text
//! - **QA Generation**: Question-answer synthesis from each cleaned page
//! - **Tolerant Extraction**: Records are recovered from fenced, malformed or partially broken JSON in model output
//! - **Validation & Review**: Answers are checked against the source text; an optional LLM review pass filters weak pairs
//!
//! ## Quick Start
//!
//! ```ignore
//! use medqa_rs::prelude::*;
//!
//! // Pull records out of a chatty model response
//! let pairs = extract_qa_pairs("Sure!\n```json\n[{\"question\": \"a\", \"answer\": \"b\",}]\n```");
//! assert_eq!(pairs.len(), 1);
//!
//! // Order detected regions on a two-column page
//! let resolver = ReadingOrderResolver::new(ReadingOrderConfig::default());
//! let ordered = resolver.resolve(&boxes, page_width);
//!
//! // Run the whole pipeline
//! let config = PipelineConfig::load(Some(Path::new("medqa.toml")))?;
//! let processor = PdfQaProcessor::from_config(&config)?;
//! let summary = processor.process_pdf(Path::new("guideline.pdf"), Path::new("output")).await?;
//! println!("{} QA pairs", summary.qa_pairs);
//! ```

pub mod config;
pub mod error;
pub mod layout_client;
pub mod llm_client;
pub mod output;
pub mod pdf_renderer;
pub mod pipeline;
pub mod qa_extractor;
pub mod qa_generator;
pub mod qa_inspect;
pub mod qa_review;
pub mod qa_validation;
pub mod text_cleaner;

// Re-export commonly used types at the root level
pub use config::{GenerationOptions, LayoutConfig, LlmConfig, PipelineConfig, PromptSet, QaConfig, RenderConfig};
pub use error::{PageError, PipelineError};
pub use layout_client::HttpLayoutDetector;
pub use llm_client::{LlmError, OllamaClient, TextGenerator};
pub use output::{read_qa_file, write_qa_file, OutputWriter};
pub use pdf_renderer::{PageRenderer, PdftoppmRenderer, RenderError, RenderedDocument};
pub use pipeline::{Components, PageSummary, PageText, PdfQaProcessor, ProcessingSummary};
pub use qa_extractor::{extract_qa_pairs, repair_json, try_extract_qa_pairs, ExtractionError, QaPair};
pub use qa_generator::QaGenerator;
pub use qa_inspect::{inspect_file, inspect_str, InspectionReport, LineIssue};
pub use qa_review::{QaReviewer, ReviewStats, Verdict};
pub use qa_validation::{is_grounded, retain_grounded, validate_pairs, ValidationReport};
pub use text_cleaner::TextCleaner;

pub use medqa_ocr;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use medqa_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        extract_qa_pairs, inspect_str, read_qa_file, retain_grounded, try_extract_qa_pairs, validate_pairs,
        write_qa_file, Components, LlmError, OllamaClient, PageRenderer, PdfQaProcessor, PipelineConfig,
        PipelineError, ProcessingSummary, PromptSet, QaGenerator, QaPair, QaReviewer, RenderedDocument,
        TextCleaner, TextGenerator, ValidationReport,
    };
    pub use medqa_ocr::{
        crop_region, BoundingBox, Column, ColumnSplit, LayoutDetector, OcrEngine, OcrError, OcrInput, OcrOutput,
        OrderedBox, ReadingOrderConfig, ReadingOrderResolver,
    };
}
