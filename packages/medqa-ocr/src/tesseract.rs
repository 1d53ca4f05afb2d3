use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
use crate::region::TextRegion;

/// Settings for the `tesseract` command line engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    pub binary: PathBuf,
    /// Tesseract language list, e.g. `chi_sim+eng`.
    pub languages: String,
    /// Page segmentation mode; `6` treats a crop as one uniform block of text.
    pub psm: u8,
    /// Inserted between recognized lines of one region. Empty for CJK text,
    /// where line breaks inside a region do not separate words.
    pub line_separator: String,
    pub timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "chi_sim+eng".to_string(),
            psm: 6,
            line_separator: String::new(),
            timeout_secs: 60,
        }
    }
}

/// OCR engine backed by the `tesseract` executable.
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    async fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut command = Command::new(&self.config.binary);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .kill_on_drop(true);

        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            command.output(),
        )
        .await
        .map_err(|_| OcrError::Timeout(self.config.timeout_secs))?
        .map_err(|e| {
            OcrError::EngineError(format!(
                "failed to run {}: {}",
                self.config.binary.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineError(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn build_output(&self, raw: &str) -> OcrOutput {
        let regions: Vec<TextRegion> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextRegion {
                text: line.to_string(),
                bounding_box: None,
                confidence: None,
            })
            .collect();
        let text = regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.config.line_separator);
        OcrOutput { text, regions }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(TesseractConfig::default())
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let raw = match input {
            OcrInput::FilePath(path) => self.run(path).await?,
            OcrInput::Bytes(data) => {
                let format = image::guess_format(data)
                    .map_err(|e| OcrError::InvalidInput(e.to_string()))?;
                let file = temp_image_file(format.extensions_str().first().copied())?;
                std::fs::write(file.path(), data)
                    .map_err(|e| OcrError::EngineError(e.to_string()))?;
                self.run(file.path()).await?
            }
            OcrInput::Image(image) => {
                let file = temp_image_file(Some("png"))?;
                image
                    .save_with_format(file.path(), ImageFormat::Png)
                    .map_err(|e| OcrError::InvalidInput(e.to_string()))?;
                self.run(file.path()).await?
            }
        };
        Ok(self.build_output(&raw))
    }
}

fn temp_image_file(extension: Option<&str>) -> Result<tempfile::NamedTempFile, OcrError> {
    let suffix = format!(".{}", extension.unwrap_or("png"));
    tempfile::Builder::new()
        .prefix("medqa-ocr-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| OcrError::EngineError(e.to_string()))
}
