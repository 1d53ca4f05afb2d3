//! Rasterizes PDF documents into one PNG per page.
use crate::config::RenderConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("renderer timed out after {0}s")]
    Timeout(u64),
    #[error("renderer produced no pages for {0}")]
    NoPages(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page images of one document, in page order.
///
/// Images written to a scratch directory live as long as this value.
#[derive(Debug)]
pub struct RenderedDocument {
    pub pages: Vec<PathBuf>,
    _workdir: Option<TempDir>,
}

impl RenderedDocument {
    /// Wraps page images that already exist on disk.
    pub fn from_paths(pages: Vec<PathBuf>) -> Self {
        Self {
            pages,
            _workdir: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, pdf: &Path) -> Result<RenderedDocument, RenderError>;
}

/// Renders with poppler's `pdftoppm`.
pub struct PdftoppmRenderer {
    config: RenderConfig,
}

impl PdftoppmRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

const PAGE_PREFIX: &str = "page";

/// Page number encoded in a `pdftoppm` output name such as `page-007.png`.
fn page_number(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(PAGE_PREFIX)?
        .trim_start_matches('-')
        .parse()
        .ok()
}

fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("png"))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render(&self, pdf: &Path) -> Result<RenderedDocument, RenderError> {
        if !pdf.is_file() {
            return Err(RenderError::NotFound(pdf.to_path_buf()));
        }

        let workdir = tempfile::Builder::new().prefix("medqa-pages").tempdir()?;
        debug!(pdf = %pdf.display(), dpi = self.config.dpi, "rendering pages");

        let mut command = Command::new(&self.config.binary);
        command
            .arg("-png")
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(pdf)
            .arg(workdir.path().join(PAGE_PREFIX))
            .kill_on_drop(true);

        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            command.output(),
        )
        .await
        .map_err(|_| RenderError::Timeout(self.config.timeout_secs))?
        .map_err(|source| RenderError::Spawn {
            binary: self.config.binary.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pages = collect_pages(workdir.path())?;
        if pages.is_empty() {
            return Err(RenderError::NoPages(pdf.to_path_buf()));
        }

        Ok(RenderedDocument {
            pages,
            _workdir: Some(workdir),
        })
    }
}
