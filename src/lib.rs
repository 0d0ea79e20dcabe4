pub mod common;
pub mod core;

pub use common::{Config, FaceTagError, Result};
pub use self::core::{
    Annotator, Detector, FaceBox, FaceLocator, FaceReport, FramePipeline, Label,
    NormalizedBuffer, OnnxDetector, OnnxScorer, Orientation, RegionClassifier, Scorer,
};
