use crate::common::{Config, FaceTagError, Result};
use crate::core::classifier::NormalizedBuffer;
use crate::core::session::{load_session, SessionOptions};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::sync::Arc;

/// Maps a fixed-size normalised face buffer to a single score.
pub trait Scorer: Send + Sync {
    /// Number of floats the model consumes per call.
    fn input_len(&self) -> usize;

    fn infer(&self, buffer: &NormalizedBuffer) -> Result<f32>;
}

/// Binary face classifier running on ONNX Runtime. The model takes an
/// NHWC `[1, size, size, 3]` float tensor and emits one value.
pub struct OnnxScorer {
    session: Session,
    _environment: Arc<Environment>,
    input_size: u32,
}

impl OnnxScorer {
    pub fn new(config: &Config) -> Result<Self> {
        let options = SessionOptions {
            intra_threads: Some(config.scorer.num_threads),
            use_gpu: config.scorer.use_gpu,
        };
        let (session, environment) = load_session(
            "face_scorer",
            &config.models.scorer_path,
            &config.performance,
            &options,
        )?;

        Ok(Self {
            session,
            _environment: environment,
            input_size: config.scorer.input_size,
        })
    }
}

impl Scorer for OnnxScorer {
    fn input_len(&self) -> usize {
        NormalizedBuffer::len_for(self.input_size)
    }

    fn infer(&self, buffer: &NormalizedBuffer) -> Result<f32> {
        if buffer.side() != self.input_size {
            return Err(FaceTagError::InputSize {
                expected: self.input_len(),
                actual: buffer.values().len(),
            });
        }

        let side = self.input_size as usize;
        let input_array = Array4::from_shape_vec((1, side, side, 3), buffer.values().to_vec())
            .map_err(|e| FaceTagError::Inference(format!("Bad input shape: {}", e)))?;
        let cow_array = CowArray::from(input_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let output = outputs
            .first()
            .ok_or_else(|| FaceTagError::Inference("Scorer produced no outputs".to_string()))?;

        let tensor = output.try_extract::<f32>()?;
        let score = tensor
            .view()
            .iter()
            .next()
            .copied()
            .ok_or_else(|| FaceTagError::Inference("Scorer output is empty".to_string()))?;

        Ok(score)
    }
}
