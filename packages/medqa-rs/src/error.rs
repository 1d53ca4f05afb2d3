use crate::pdf_renderer::RenderError;
use medqa_ocr::OcrError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one page. The run logs it and moves on to the next page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to load page image: {0}")]
    Image(#[from] image::ImageError),
    #[error("layout detection failed: {0}")]
    Detection(#[source] OcrError),
    #[error(transparent)]
    Output(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input document could not be opened or rendered; nothing was processed.
    #[error("failed to render {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("page {page} failed: {source}")]
    Page {
        page: usize,
        #[source]
        source: PageError,
    },
    #[error(transparent)]
    Output(anyhow::Error),
}
