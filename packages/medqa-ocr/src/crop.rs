use image::{DynamicImage, GenericImageView};

use crate::engine::OcrError;
use crate::region::BoundingBox;

/// Cuts `bbox` out of `image`.
///
/// Coordinates are clamped to the image first; a box that is empty after
/// clamping is rejected with [`OcrError::InvalidBoundingBox`].
pub fn crop_region(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage, OcrError> {
    let (width, height) = image.dimensions();
    let clamped = bbox.clamp(width, height);
    if clamped.is_degenerate() {
        return Err(OcrError::InvalidBoundingBox(*bbox));
    }

    // clamped coordinates are within [0, u32 dimension], so the casts are lossless
    Ok(image.crop_imm(
        clamped.left as u32,
        clamped.top as u32,
        clamped.width() as u32,
        clamped.height() as u32,
    ))
}
