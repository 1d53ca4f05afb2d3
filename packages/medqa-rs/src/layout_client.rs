//! HTTP adapter for a layout detection sidecar.
//!
//! The sidecar receives one page as PNG and answers with
//! `{"detections": [{"label": "Text", "box": [l, t, r, b], "confidence": 0.9}]}`.
use crate::config::LayoutConfig;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use medqa_ocr::{BoundingBox, LayoutDetector, OcrError};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
struct Detection {
    label: String,
    #[serde(rename = "box")]
    bbox: [f64; 4],
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<Detection>,
}

pub struct HttpLayoutDetector {
    http_client: reqwest::Client,
    url: String,
    text_label: String,
}

impl HttpLayoutDetector {
    pub fn new(config: &LayoutConfig) -> Result<Self, OcrError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::EngineError(format!("layout client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!("{}/detect", config.endpoint.trim_end_matches('/')),
            text_label: config.text_label.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn encode_png(page: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut bytes = Cursor::new(Vec::new());
    page.write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| OcrError::InvalidInput(format!("failed to encode page: {}", e)))?;
    Ok(bytes.into_inner())
}

/// Keeps detections labelled `text_label`, rounding coordinates to pixels.
fn text_boxes(response: DetectResponse, text_label: &str) -> Vec<BoundingBox> {
    response
        .detections
        .into_iter()
        .filter(|d| d.label == text_label)
        .map(|d| {
            let [l, t, r, b] = d.bbox;
            debug!(confidence = ?d.confidence, "text region [{:.0}, {:.0}, {:.0}, {:.0}]", l, t, r, b);
            BoundingBox::new(l.round() as i32, t.round() as i32, r.round() as i32, b.round() as i32)
        })
        .collect()
}

#[async_trait]
impl LayoutDetector for HttpLayoutDetector {
    async fn detect(&self, page: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
        let body = encode_png(page)?;

        let response = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .await
            .map_err(|e| OcrError::EngineError(format!("layout request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::EngineError(format!(
                "layout detector returned {}: {}",
                status, body
            )));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| OcrError::EngineError(format!("bad layout response: {}", e)))?;

        Ok(text_boxes(parsed, &self.text_label))
    }
}
