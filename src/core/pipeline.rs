use crate::common::{Config, Result};
use crate::core::annotator::{Annotator, Label};
use crate::core::classifier::RegionClassifier;
use crate::core::detector::OnnxDetector;
use crate::core::face_box::FaceBox;
use crate::core::locator::FaceLocator;
use crate::core::preprocess::{self, Orientation};
use crate::core::scorer::OnnxScorer;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Outcome for one classified face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceReport {
    pub face: FaceBox,
    pub score: f32,
    pub label: Label,
}

/// Detect, classify and label faces in one frame at a time.
pub struct FramePipeline {
    locator: FaceLocator,
    classifier: RegionClassifier,
    annotator: Annotator,
    orientation: Orientation,
}

impl FramePipeline {
    pub fn new(
        locator: FaceLocator,
        classifier: RegionClassifier,
        annotator: Annotator,
        orientation: Orientation,
    ) -> Self {
        Self { locator, classifier, annotator, orientation }
    }

    /// Load both ONNX models. A scorer that cannot be loaded is fatal; a
    /// detector that cannot be loaded leaves the pipeline running blind.
    pub fn from_config(config: &Config) -> Result<Self> {
        let scorer = OnnxScorer::new(config)?;
        let classifier = RegionClassifier::new(Box::new(scorer), config.scorer.input_size)?;

        let locator = match OnnxDetector::new(config) {
            Ok(detector) => FaceLocator::new(Box::new(detector)),
            Err(e) => {
                tracing::warn!("Face detector unavailable, no faces will be found: {}", e);
                FaceLocator::disabled()
            }
        }
        .with_min_face_ratio(config.detector.min_face_ratio);

        Ok(Self::new(
            locator,
            classifier,
            Annotator::new(&config.annotation),
            config.preprocess.orientation,
        ))
    }

    pub fn detector_enabled(&self) -> bool {
        self.locator.is_enabled()
    }

    /// Annotate `frame` and hand it back in its original orientation.
    pub fn process_frame(&self, mut frame: RgbaImage) -> RgbaImage {
        self.annotate_frame(&mut frame);
        frame
    }

    /// In-place variant of [`process_frame`](Self::process_frame) that also
    /// reports each labelled face, in oriented-frame coordinates.
    pub fn annotate_frame(&self, frame: &mut RgbaImage) -> Vec<FaceReport> {
        if frame.width() == 0 || frame.height() == 0 {
            tracing::debug!("Empty frame, passing through");
            return Vec::new();
        }

        preprocess::orient(frame, self.orientation);
        let gray = preprocess::to_gray(frame);

        let faces = self.locator.locate(&gray);
        tracing::debug!("Located {} faces in {}x{} frame", faces.len(), gray.width(), gray.height());

        // Score every face before drawing so crops never contain annotations
        let mut reports = Vec::with_capacity(faces.len());
        for face in faces {
            match self.classifier.classify(frame, &face) {
                Ok(Some(score)) => reports.push(FaceReport {
                    face,
                    score,
                    label: Label::from_score(score),
                }),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping face at {:?}: scoring failed: {}", face, e),
            }
        }

        for report in &reports {
            self.annotator.annotate(frame, &report.face, report.label);
        }

        preprocess::restore(frame, self.orientation);
        reports
    }
}
