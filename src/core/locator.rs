use crate::core::detector::Detector;
use crate::core::face_box::FaceBox;
use image::GrayImage;

pub const DEFAULT_MIN_FACE_RATIO: f32 = 0.1;

/// Smallest face side the detector is asked to report.
pub fn min_face_size(gray_height: u32, ratio: f32) -> u32 {
    (gray_height as f32 * ratio).floor() as u32
}

/// Best-effort adapter over a [`Detector`]. A missing or failing detector
/// reports no faces instead of an error.
pub struct FaceLocator {
    detector: Option<Box<dyn Detector>>,
    min_face_ratio: f32,
}

impl FaceLocator {
    pub fn new(detector: Box<dyn Detector>) -> Self {
        Self {
            detector: Some(detector),
            min_face_ratio: DEFAULT_MIN_FACE_RATIO,
        }
    }

    /// A locator whose detector failed to initialise.
    pub fn disabled() -> Self {
        Self {
            detector: None,
            min_face_ratio: DEFAULT_MIN_FACE_RATIO,
        }
    }

    pub fn with_min_face_ratio(mut self, ratio: f32) -> Self {
        self.min_face_ratio = ratio;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.detector.is_some()
    }

    pub fn locate(&self, gray: &GrayImage) -> Vec<FaceBox> {
        let Some(detector) = &self.detector else {
            return Vec::new();
        };

        let min_size = min_face_size(gray.height(), self.min_face_ratio);
        match detector.detect(gray, min_size) {
            Ok(faces) => faces,
            Err(e) => {
                tracing::warn!("Face detection failed, treating frame as empty: {}", e);
                Vec::new()
            }
        }
    }
}
