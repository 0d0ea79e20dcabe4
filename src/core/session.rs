use crate::common::{config::PerformanceConfig, FaceTagError, Result};
use ort::{Environment, ExecutionProvider, GraphOptimizationLevel, Session, SessionBuilder};
use std::path::Path;
use std::sync::Arc;

/// Knobs shared by the detector and scorer sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub intra_threads: Option<i16>,
    pub use_gpu: bool,
}

/// Build an ONNX Runtime session for `model_path`. The environment must
/// outlive the session, so it is handed back alongside it.
pub fn load_session(
    name: &str,
    model_path: &Path,
    performance: &PerformanceConfig,
    options: &SessionOptions,
) -> Result<(Session, Arc<Environment>)> {
    let environment = Arc::new(
        Environment::builder()
            .with_name(name)
            .build()
            .map_err(|e| FaceTagError::Model(format!("Failed to create environment: {}", e)))?
    );

    if !model_path.exists() {
        return Err(FaceTagError::Model(
            format!("Model not found at: {:?}", model_path)
        ));
    }

    let mut session_builder = SessionBuilder::new(&environment)?;

    let opt_level = match performance.optimization_level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    };
    session_builder = session_builder.with_optimization_level(opt_level)?;

    if let Some(threads) = options.intra_threads {
        session_builder = session_builder.with_intra_threads(threads)?;
    }

    // Falls back to CPU when the CUDA provider is unavailable at runtime
    if options.use_gpu {
        session_builder = session_builder
            .with_execution_providers([ExecutionProvider::CUDA(Default::default())])?;
    }

    let session = session_builder.with_model_from_file(model_path)?;
    tracing::info!("Loaded {} model from {}", name, model_path.display());

    Ok((session, environment))
}
