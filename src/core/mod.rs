pub mod annotator;
pub mod classifier;
pub mod detector;
pub mod face_box;
pub mod glyphs;
pub mod locator;
pub mod pipeline;
pub mod preprocess;
pub mod scorer;
pub mod session;

pub use annotator::{Annotator, Label};
pub use classifier::{NormalizedBuffer, RegionClassifier};
pub use detector::{Detector, OnnxDetector};
pub use face_box::FaceBox;
pub use locator::FaceLocator;
pub use pipeline::{FaceReport, FramePipeline};
pub use preprocess::Orientation;
pub use scorer::{OnnxScorer, Scorer};
