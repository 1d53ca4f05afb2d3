pub mod clustering;
pub mod crop;
pub mod detector;
pub mod engine;
pub mod reading_order;
pub mod region;
pub mod tesseract;

pub use clustering::{kmeans_two, TwoMeans};
pub use crop::crop_region;
pub use detector::LayoutDetector;
pub use engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
pub use reading_order::{Column, ColumnSplit, OrderedBox, ReadingOrderConfig, ReadingOrderResolver};
pub use region::{BoundingBox, TextRegion};
pub use tesseract::{TesseractConfig, TesseractEngine};
