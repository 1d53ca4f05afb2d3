//! End-to-end pipeline runs against in-process collaborators

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma};
use medqa_rs::medqa_ocr::{BoundingBox, LayoutDetector, OcrEngine, OcrError, OcrInput, OcrOutput};
use medqa_rs::{
    Components, GenerationOptions, LlmError, PageRenderer, PdfQaProcessor, PipelineConfig, PipelineError,
    PromptSet, QaPair, RenderError, RenderedDocument, TextGenerator,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const LEFT_TOP: u8 = 10;
const RIGHT_TOP: u8 = 20;
const LEFT_BOTTOM: u8 = 30;

/// Two-column page: each region is filled with its own gray level.
fn write_page(dir: &Path, name: &str) -> PathBuf {
    let mut page = GrayImage::from_pixel(300, 100, Luma([255]));
    for (left, top, value) in [(0, 0, LEFT_TOP), (150, 0, RIGHT_TOP), (0, 25, LEFT_BOTTOM)] {
        for x in left..left + 100 {
            for y in top..top + 20 {
                page.put_pixel(x, y, Luma([value]));
            }
        }
    }
    let path = dir.join(name);
    DynamicImage::ImageLuma8(page).save(&path).unwrap();
    path
}

fn two_column_boxes() -> Vec<BoundingBox> {
    vec![
        BoundingBox::new(0, 0, 100, 20),
        BoundingBox::new(150, 0, 250, 20),
        BoundingBox::new(0, 25, 100, 45),
    ]
}

struct FixedPages(Vec<PathBuf>);

#[async_trait]
impl PageRenderer for FixedPages {
    async fn render(&self, _: &Path) -> Result<RenderedDocument, RenderError> {
        Ok(RenderedDocument::from_paths(self.0.clone()))
    }
}

struct BrokenRenderer;

#[async_trait]
impl PageRenderer for BrokenRenderer {
    async fn render(&self, pdf: &Path) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::NoPages(pdf.to_path_buf()))
    }
}

/// Hands out one scripted detection result per page.
struct ScriptedDetector(Mutex<VecDeque<Result<Vec<BoundingBox>, OcrError>>>);

#[async_trait]
impl LayoutDetector for ScriptedDetector {
    async fn detect(&self, _: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
        self.0.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }
}

/// Reads the gray level of a crop back as text.
struct GrayLevelOcr;

#[async_trait]
impl OcrEngine for GrayLevelOcr {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let OcrInput::Image(image) = input else {
            return Err(OcrError::Unsupported);
        };
        let text = match image.to_luma8().get_pixel(0, 0)[0] {
            LEFT_TOP => "左上",
            RIGHT_TOP => "右上",
            LEFT_BOTTOM => "左下",
            _ => "",
        };
        Ok(OcrOutput {
            text: text.to_string(),
            regions: Vec::new(),
        })
    }
}

/// Echoes cleaning prompts and answers QA prompts with a fenced array.
struct EchoGenerator {
    options: GenerationOptions,
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str, system: &str, _: usize) -> Result<String, LlmError> {
        if system.starts_with("QA") {
            Ok(r#"Here you go:
```json
[
  {"human": "左上是什么？", "assistant": "左上"},
  {"human": "右上是什么？", "assistant": "右上"},
  {"human": "无关问题", "assistant": "不存在的答案"}
]
```"#
                .to_string())
        } else {
            Ok(prompt.to_string())
        }
    }

    fn options(&self) -> &GenerationOptions {
        &self.options
    }
}

fn test_config(require_grounded: bool) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.prompts = PromptSet {
        sentence_repair_system: "repair".to_string(),
        paragraph_reconstruction_system: "rebuild".to_string(),
        qa_system: "QA {count}".to_string(),
        cleaning_template: "{text}".to_string(),
        reconstruction_template: "{text}".to_string(),
        qa_template: "{text}".to_string(),
        ..PromptSet::default()
    };
    config.qa.require_grounded_answers = require_grounded;
    config
}

fn processor(
    config: &PipelineConfig,
    renderer: Box<dyn PageRenderer>,
    detections: Vec<Result<Vec<BoundingBox>, OcrError>>,
) -> PdfQaProcessor {
    PdfQaProcessor::with_components(
        config,
        Components {
            renderer,
            detector: Box::new(ScriptedDetector(Mutex::new(detections.into()))),
            ocr: Box::new(GrayLevelOcr),
            generator: Arc::new(EchoGenerator {
                options: GenerationOptions::default(),
            }),
        },
    )
}

fn read_pairs(path: &Path) -> Vec<QaPair> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_pages_are_processed_in_reading_order() {
    let pages_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let page = write_page(pages_dir.path(), "page-1.png");

    let config = test_config(false);
    let processor = processor(
        &config,
        Box::new(FixedPages(vec![page])),
        vec![Ok(two_column_boxes())],
    );

    let summary = processor
        .process_pdf(Path::new("guide.pdf"), out.path())
        .await
        .unwrap();

    let raw = std::fs::read_to_string(out.path().join("page_1.raw.txt")).unwrap();
    assert_eq!(raw, "左上\n左下\n右上");
    let clean = std::fs::read_to_string(out.path().join("page_1.clean.txt")).unwrap();
    assert_eq!(clean, raw);

    assert_eq!(summary.pages_processed, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.qa_pairs, 3);
    assert_eq!(read_pairs(&out.path().join("qa.jsonl")).len(), 3);

    let validation = summary.pages[0].validation.clone().unwrap();
    assert_eq!(validation.grounded, 2);
    assert_eq!(validation.ungrounded, 1);
    assert!(out.path().join("manifest.json").exists());
}

#[tokio::test]
async fn test_failed_page_does_not_stop_the_run() {
    let pages_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let pages = vec![
        write_page(pages_dir.path(), "page-1.png"),
        write_page(pages_dir.path(), "page-2.png"),
        write_page(pages_dir.path(), "page-3.png"),
    ];

    let config = test_config(false);
    let processor = processor(
        &config,
        Box::new(FixedPages(pages)),
        vec![
            Ok(two_column_boxes()),
            Err(OcrError::EngineError("detector offline".to_string())),
            Ok(vec![
                BoundingBox::new(0, 0, 100, 20),
                BoundingBox::new(500, 500, 600, 600),
            ]),
        ],
    );

    let summary = processor
        .process_pdf(Path::new("guide.pdf"), out.path())
        .await
        .unwrap();

    assert_eq!(summary.pages_processed, 2);
    assert_eq!(summary.pages_failed, 1);
    assert!(summary.pages[1]
        .error
        .as_deref()
        .unwrap()
        .contains("detector offline"));
    assert!(!out.path().join("page_2.raw.txt").exists());

    // The box outside the page is skipped, the rest of page 3 survives.
    assert_eq!(summary.pages[2].skipped_regions, 1);
    let raw = std::fs::read_to_string(out.path().join("page_3.raw.txt")).unwrap();
    assert_eq!(raw, "左上");

    assert_eq!(read_pairs(&out.path().join("qa.jsonl")).len(), 6);

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["pages_failed"], 1);
}

#[tokio::test]
async fn test_grounding_requirement_drops_pairs() {
    let pages_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let page = write_page(pages_dir.path(), "page-1.png");

    let config = test_config(true);
    let processor = processor(
        &config,
        Box::new(FixedPages(vec![page])),
        vec![Ok(two_column_boxes())],
    );

    let summary = processor
        .process_pdf(Path::new("guide.pdf"), out.path())
        .await
        .unwrap();

    assert_eq!(summary.qa_pairs, 2);
    assert_eq!(
        read_pairs(&out.path().join("qa.jsonl")),
        vec![
            QaPair::new("左上是什么？", "左上"),
            QaPair::new("右上是什么？", "右上"),
        ]
    );
}

#[tokio::test]
async fn test_render_failure_aborts() {
    let out = TempDir::new().unwrap();
    let config = test_config(false);
    let processor = processor(&config, Box::new(BrokenRenderer), Vec::new());

    let err = processor
        .process_pdf(Path::new("broken.pdf"), &out.path().join("run"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Document { .. }));
    assert!(!out.path().join("run").exists());
}

#[tokio::test]
async fn test_blank_page_yields_no_pairs() {
    let pages_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let page = write_page(pages_dir.path(), "page-1.png");

    let config = test_config(false);
    let processor = processor(&config, Box::new(FixedPages(vec![page])), vec![Ok(Vec::new())]);

    let summary = processor
        .process_pdf(Path::new("guide.pdf"), out.path())
        .await
        .unwrap();

    assert_eq!(summary.pages_processed, 1);
    assert_eq!(summary.qa_pairs, 0);
    assert_eq!(std::fs::read_to_string(out.path().join("page_1.raw.txt")).unwrap(), "");
}
