//! End-to-end processing of one PDF document.
//!
//! Pages are handled strictly in order, and so are the regions of a page:
//!
//! render -> detect -> order -> crop -> OCR -> clean -> generate -> extract -> validate
//!
//! A failure inside a page costs that page (or one region) and nothing more.
//! Only a document that cannot be rendered aborts the run.
use crate::config::PipelineConfig;
use crate::error::{PageError, PipelineError};
use crate::layout_client::HttpLayoutDetector;
use crate::llm_client::{OllamaClient, TextGenerator};
use crate::output::OutputWriter;
use crate::pdf_renderer::{PageRenderer, PdftoppmRenderer};
use crate::qa_extractor::{extract_qa_pairs, QaPair};
use crate::qa_generator::QaGenerator;
use crate::qa_validation::{retain_grounded, ValidationReport};
use crate::text_cleaner::TextCleaner;
use anyhow::Result;
use chrono::Utc;
use image::DynamicImage;
use medqa_ocr::{
    crop_region, LayoutDetector, OcrEngine, OcrInput, ReadingOrderResolver, TesseractEngine,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The external collaborators a processor drives.
pub struct Components {
    pub renderer: Box<dyn PageRenderer>,
    pub detector: Box<dyn LayoutDetector>,
    pub ocr: Box<dyn OcrEngine>,
    pub generator: Arc<dyn TextGenerator>,
}

impl Components {
    /// The shipped adapters: `pdftoppm`, the layout sidecar, `tesseract` and Ollama.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            renderer: Box::new(PdftoppmRenderer::new(config.render.clone())),
            detector: Box::new(HttpLayoutDetector::new(&config.layout)?),
            ocr: Box::new(TesseractEngine::new(config.ocr.clone())),
            generator: Arc::new(OllamaClient::new(&config.llm)?),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageSummary {
    /// 1-based page number.
    pub page: usize,
    pub regions: usize,
    /// Regions dropped because cropping or OCR failed.
    pub skipped_regions: usize,
    pub qa_pairs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSummary {
    pub source: PathBuf,
    pub qa_file: PathBuf,
    pub started_at: String,
    pub finished_at: String,
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub qa_pairs: usize,
    pub pages: Vec<PageSummary>,
}

/// OCR text of one page in reading order.
#[derive(Debug, Clone, Default)]
pub struct PageText {
    pub text: String,
    pub regions: usize,
    pub skipped_regions: usize,
}

pub struct PdfQaProcessor {
    renderer: Box<dyn PageRenderer>,
    detector: Box<dyn LayoutDetector>,
    ocr: Box<dyn OcrEngine>,
    resolver: ReadingOrderResolver,
    cleaner: TextCleaner,
    generator: QaGenerator,
    require_grounded: bool,
    qa_file: String,
}

impl PdfQaProcessor {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::with_components(config, Components::from_config(config)?))
    }

    pub fn with_components(config: &PipelineConfig, components: Components) -> Self {
        Self {
            renderer: components.renderer,
            detector: components.detector,
            ocr: components.ocr,
            resolver: ReadingOrderResolver::new(config.reading_order.clone()),
            cleaner: TextCleaner::new(components.generator.clone(), config.prompts.clone()),
            generator: QaGenerator::new(
                components.generator,
                config.prompts.clone(),
                config.qa.pairs_per_page,
            ),
            require_grounded: config.qa.require_grounded_answers,
            qa_file: config.qa.output_file.clone(),
        }
    }

    pub async fn process_pdf(
        &self,
        pdf: &Path,
        output_dir: &Path,
    ) -> Result<ProcessingSummary, PipelineError> {
        let started_at = Utc::now().to_rfc3339();

        let document = self
            .renderer
            .render(pdf)
            .await
            .map_err(|source| PipelineError::Document {
                path: pdf.to_path_buf(),
                source,
            })?;
        info!("Rendered {} pages from {}", document.page_count(), pdf.display());

        let writer = OutputWriter::create(output_dir, &self.qa_file)
            .await
            .map_err(PipelineError::Output)?;

        let mut pages = Vec::with_capacity(document.page_count());
        for (index, image_path) in document.pages.iter().enumerate() {
            let page = index + 1;
            info!("Processing page {}/{}", page, document.page_count());

            match self.process_page(page, image_path, &writer).await {
                Ok(summary) => pages.push(summary),
                Err(source) => {
                    let error = PipelineError::Page { page, source };
                    warn!("{}", error);
                    pages.push(PageSummary {
                        page,
                        error: Some(error.to_string()),
                        ..Default::default()
                    });
                }
            }
        }

        let pages_failed = pages.iter().filter(|p| p.error.is_some()).count();
        let summary = ProcessingSummary {
            source: pdf.to_path_buf(),
            qa_file: writer.qa_path().to_path_buf(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            pages_processed: pages.len() - pages_failed,
            pages_failed,
            qa_pairs: pages.iter().map(|p| p.qa_pairs).sum(),
            pages,
        };

        writer
            .write_manifest(&summary)
            .await
            .map_err(PipelineError::Output)?;
        info!(
            "Done: {} pages processed, {} failed, {} QA pairs written to {}",
            summary.pages_processed,
            summary.pages_failed,
            summary.qa_pairs,
            summary.qa_file.display()
        );

        Ok(summary)
    }

    /// Runs one page through every stage and appends its pairs to the QA file.
    pub async fn process_page(
        &self,
        page: usize,
        image_path: &Path,
        writer: &OutputWriter,
    ) -> Result<PageSummary, PageError> {
        let image = image::open(image_path)?;
        let page_text = self.page_text(&image).await?;
        writer.write_raw_page(page, &page_text.text).await?;

        let cleaned = self.cleaner.clean(&page_text.text).await;
        writer.write_clean_page(page, &cleaned).await?;

        let (pairs, validation) = self.generate_pairs(&cleaned).await;
        writer.append_qa_pairs(&pairs).await?;
        info!("Page {}: {} QA pairs", page, pairs.len());

        Ok(PageSummary {
            page,
            regions: page_text.regions,
            skipped_regions: page_text.skipped_regions,
            qa_pairs: pairs.len(),
            validation,
            error: None,
        })
    }

    /// Detects text regions, orders them and concatenates their OCR text.
    ///
    /// A region that cannot be cropped or recognized is skipped.
    pub async fn page_text(&self, image: &DynamicImage) -> Result<PageText, PageError> {
        let boxes = self
            .detector
            .detect(image)
            .await
            .map_err(PageError::Detection)?;
        let ordered = self.resolver.resolve(&boxes, image.width());
        debug!("{} text regions detected", ordered.len());

        let mut texts = Vec::with_capacity(ordered.len());
        let mut skipped = 0;
        for region in &ordered {
            let crop = match crop_region(image, &region.bbox) {
                Ok(crop) => crop,
                Err(e) => {
                    warn!("Skipping region {}: {}", region.position, e);
                    skipped += 1;
                    continue;
                }
            };
            match self.ocr.recognize(&OcrInput::Image(crop)).await {
                Ok(output) => {
                    let text = output.text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
                Err(e) => {
                    warn!("OCR failed for region {} {}: {}", region.position, region.bbox, e);
                    skipped += 1;
                }
            }
        }

        Ok(PageText {
            text: texts.join("\n"),
            regions: ordered.len(),
            skipped_regions: skipped,
        })
    }

    async fn generate_pairs(&self, cleaned: &str) -> (Vec<QaPair>, Option<ValidationReport>) {
        if cleaned.trim().is_empty() {
            warn!("No text on page, skipping QA generation");
            return (Vec::new(), None);
        }

        let response = match self.generator.generate(cleaned).await {
            Ok(response) => response,
            Err(e) => {
                warn!("QA generation failed: {}", e);
                String::new()
            }
        };

        let pairs = extract_qa_pairs(&response);
        let (kept, report) = retain_grounded(pairs, cleaned, self.require_grounded);
        (kept, Some(report))
    }
}
