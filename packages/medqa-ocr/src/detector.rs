use async_trait::async_trait;
use image::DynamicImage;

use crate::engine::OcrError;
use crate::region::BoundingBox;

/// Finds text-bearing regions on a rendered page.
///
/// Implementations return boxes in page pixel coordinates and in no
/// particular order; [`crate::ReadingOrderResolver`] orders them.
#[async_trait]
pub trait LayoutDetector: Send + Sync {
    async fn detect(&self, page: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError>;
}
