use std::path::PathBuf;

use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;

use crate::region::{BoundingBox, TextRegion};

#[derive(Debug, Clone)]
pub enum OcrInput {
    FilePath(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    Image(DynamicImage),
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub regions: Vec<TextRegion>,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("unsupported operation")]
    Unsupported,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid bounding box {0}")]
    InvalidBoundingBox(BoundingBox),
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("engine timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError>;
}
