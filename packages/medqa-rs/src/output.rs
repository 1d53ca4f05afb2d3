//! Files written by an extraction run.
//!
//! ```text
//! <output_dir>/
//!   page_1.raw.txt     OCR text in reading order
//!   page_1.clean.txt   text after the cleaning passes
//!   ...
//!   qa.jsonl           one question-answer record per line
//!   manifest.json      run summary
//! ```
use crate::qa_extractor::QaPair;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub const MANIFEST_FILE: &str = "manifest.json";

pub struct OutputWriter {
    dir: PathBuf,
    qa_path: PathBuf,
}

impl OutputWriter {
    /// Creates `dir` if needed and truncates the aggregate QA file.
    pub async fn create(dir: &Path, qa_file: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let qa_path = dir.join(qa_file);
        fs::write(&qa_path, "")
            .await
            .with_context(|| format!("Failed to create {}", qa_path.display()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            qa_path,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn qa_path(&self) -> &Path {
        &self.qa_path
    }

    pub fn raw_page_path(&self, page: usize) -> PathBuf {
        self.dir.join(format!("page_{}.raw.txt", page))
    }

    pub fn clean_page_path(&self, page: usize) -> PathBuf {
        self.dir.join(format!("page_{}.clean.txt", page))
    }

    pub async fn write_raw_page(&self, page: usize, text: &str) -> Result<PathBuf> {
        let path = self.raw_page_path(page);
        write_text(&path, text).await?;
        Ok(path)
    }

    pub async fn write_clean_page(&self, page: usize, text: &str) -> Result<PathBuf> {
        let path = self.clean_page_path(page);
        write_text(&path, text).await?;
        Ok(path)
    }

    /// Appends one page's pairs to the aggregate QA file.
    pub async fn append_qa_pairs(&self, pairs: &[QaPair]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&self.qa_path)
            .await
            .with_context(|| format!("Failed to open {}", self.qa_path.display()))?;
        file.write_all(to_json_lines(pairs)?.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.qa_path.display()))?;
        file.flush().await?;
        Ok(())
    }

    pub async fn write_manifest<T: Serialize>(&self, manifest: &T) -> Result<PathBuf> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(manifest)?;
        write_text(&path, &json).await?;
        Ok(path)
    }
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn to_json_lines(pairs: &[QaPair]) -> Result<String> {
    let mut out = String::new();
    for pair in pairs {
        out.push_str(&serde_json::to_string(pair)?);
        out.push('\n');
    }
    Ok(out)
}

/// Writes `pairs` as a JSON-lines file, replacing any existing content.
pub async fn write_qa_file(path: &Path, pairs: &[QaPair]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    write_text(path, &to_json_lines(pairs)?).await
}

/// Reads a JSON-lines QA file. Malformed lines are skipped with a warning.
pub async fn read_qa_file(path: &Path) -> Result<Vec<QaPair>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut pairs = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<QaPair>(line) {
            Ok(pair) => pairs.push(pair),
            Err(e) => warn!(
                "{}:{}: skipping malformed record ({}); run `medqa inspect` for details",
                path.display(),
                index + 1,
                e
            ),
        }
    }
    Ok(pairs)
}
