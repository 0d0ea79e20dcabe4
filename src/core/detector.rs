use crate::common::{config::DetectorConfig, Config, Result};
use crate::core::face_box::FaceBox;
use crate::core::session::{load_session, SessionOptions};
use image::{imageops::{self, FilterType}, GrayImage};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::sync::Arc;

/// Locates rectangular face candidates in a grayscale image.
pub trait Detector: Send + Sync {
    /// Faces smaller than `min_size` pixels on either side may be ignored.
    fn detect(&self, gray: &GrayImage, min_size: u32) -> Result<Vec<FaceBox>>;
}

/// Raw detection before conversion to integer pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl Candidate {
    fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// Single-class YOLO-style face detector running on ONNX Runtime.
pub struct OnnxDetector {
    session: Session,
    _environment: Arc<Environment>,
    config: DetectorConfig,
}

impl OnnxDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let (session, environment) = load_session(
            "face_detector",
            &config.models.detector_path,
            &config.performance,
            &SessionOptions::default(),
        )?;

        Ok(Self {
            session,
            _environment: environment,
            config: config.detector.clone(),
        })
    }

    fn image_to_array(&self, gray: &GrayImage) -> Array4<f32> {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let raw = gray.as_raw();
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        let norm_factor = 1.0 / 255.0;
        for y in 0..height {
            let row_offset = y * width;
            for x in 0..width {
                let pixel_value = raw[row_offset + x] as f32 * norm_factor;
                array[[0, 0, y, x]] = pixel_value;
                array[[0, 1, y, x]] = pixel_value;
                array[[0, 2, y, x]] = pixel_value;
            }
        }

        array
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, gray: &GrayImage, min_size: u32) -> Result<Vec<FaceBox>> {
        let orig_width = gray.width() as f32;
        let orig_height = gray.height() as f32;

        let img_array = if gray.width() == self.config.input_width
            && gray.height() == self.config.input_height {
            self.image_to_array(gray)
        } else {
            let resized = imageops::resize(
                gray,
                self.config.input_width,
                self.config.input_height,
                FilterType::Nearest,
            );
            self.image_to_array(&resized)
        };

        let cow_array = CowArray::from(img_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let Some(output) = outputs.first() else {
            tracing::warn!("Detector produced no outputs");
            return Ok(Vec::new());
        };
        let tensor = output.try_extract::<f32>()?;
        let view = tensor.view();
        let shape = view.shape().to_vec();
        let data: Vec<f32> = view.iter().copied().collect();

        let candidates = parse_detections(&data, &shape, &self.config);

        let scale_x = orig_width / self.config.input_width as f32;
        let scale_y = orig_height / self.config.input_height as f32;

        let faces = candidates
            .into_iter()
            .map(|c| to_face_box(&c, scale_x, scale_y))
            .filter(|face| face.width >= min_size && face.height >= min_size)
            .collect::<Vec<_>>();

        tracing::debug!("Detector found {} faces (min size {})", faces.len(), min_size);
        Ok(faces)
    }
}

fn to_face_box(candidate: &Candidate, scale_x: f32, scale_y: f32) -> FaceBox {
    let x1 = (candidate.x1 * scale_x).round();
    let y1 = (candidate.y1 * scale_y).round();
    let x2 = (candidate.x2 * scale_x).round();
    let y2 = (candidate.y2 * scale_y).round();
    FaceBox::new(
        x1 as i32,
        y1 as i32,
        (x2 - x1).max(0.0) as u32,
        (y2 - y1).max(0.0) as u32,
    )
}

/// Decode a `[1, N, 5]` or transposed `[1, 5, N]` output into boxes in
/// detector input space, then apply NMS and the confidence threshold.
pub fn parse_detections(output: &[f32], shape: &[usize], config: &DetectorConfig) -> Vec<Candidate> {
    let mut faces = Vec::new();

    let (num_predictions, prediction_length, is_transposed) = if shape.len() >= 3 {
        if shape[2] > shape[1] && shape[1] <= 10 {
            (shape[2], shape[1], true)
        } else {
            (shape[1], shape[2], false)
        }
    } else if shape.len() == 2 {
        (shape[0], shape[1], false)
    } else {
        tracing::warn!("Unexpected output shape: {:?}", shape);
        return faces;
    };

    if prediction_length < 4 || output.len() < num_predictions * prediction_length {
        tracing::warn!("Detector output too short for shape {:?}", shape);
        return faces;
    }

    let input_width = config.input_width as f32;
    let input_height = config.input_height as f32;

    for i in 0..num_predictions {
        let field = |k: usize| -> f32 {
            if is_transposed {
                output[k * num_predictions + i]
            } else {
                output[i * prediction_length + k]
            }
        };

        let (x_center_raw, y_center_raw, width_raw, height_raw) = (field(0), field(1), field(2), field(3));
        let confidence = if prediction_length > 4 { field(4) } else { 0.0 };

        // Normalised coordinates are scaled up to the input resolution
        let (scale_x, scale_y) = if x_center_raw > 1.0 || y_center_raw > 1.0 || width_raw > 1.0 || height_raw > 1.0 {
            (1.0, 1.0)
        } else {
            (input_width, input_height)
        };

        let x_center = x_center_raw * scale_x;
        let y_center = y_center_raw * scale_y;
        let width = width_raw * scale_x;
        let height = height_raw * scale_y;

        if confidence > 0.001 {
            let x1 = (x_center - width / 2.0).max(0.0);
            let y1 = (y_center - height / 2.0).max(0.0);
            let x2 = (x_center + width / 2.0).min(input_width);
            let y2 = (y_center + height / 2.0).min(input_height);

            if x2 > x1 && y2 > y1 {
                faces.push(Candidate { x1, y1, x2, y2, confidence });
            }
        }
    }

    let mut faces = apply_nms(faces, config.nms_iou);
    faces.retain(|face| face.confidence >= config.confidence_threshold);
    faces
}

pub fn apply_nms(mut boxes: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    if boxes.is_empty() {
        return boxes;
    }

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| calculate_iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

pub fn calculate_iou(box1: &Candidate, box2: &Candidate) -> f32 {
    let x1 = box1.x1.max(box2.x1);
    let y1 = box1.y1.max(box2.y1);
    let x2 = box1.x2.min(box2.x2);
    let y2 = box1.y2.min(box2.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = box1.width() * box1.height();
    let area2 = box2.width() * box2.height();
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
