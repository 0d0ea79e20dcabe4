use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{FaceTagError, Result};
use crate::core::preprocess::Orientation;

pub const DEFAULT_CONFIG_PATH: &str = "configs/facetag.toml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub models: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    pub detector_path: PathBuf,
    pub scorer_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detector_path: PathBuf::from("models/face_detector.onnx"),
            scorer_path: PathBuf::from("models/face_classifier.onnx"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_input")]
    pub input_width: u32,
    #[serde(default = "default_detector_input")]
    pub input_height: u32,
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f32,
    #[serde(default = "default_nms_iou")]
    pub nms_iou: f32,
    /// Smallest face to report, as a fraction of the grayscale frame height.
    #[serde(default = "default_min_face_ratio")]
    pub min_face_ratio: f32,
}

fn default_detector_input() -> u32 { 640 }
fn default_confidence() -> f32 { 0.5 }
fn default_nms_iou() -> f32 { 0.45 }
fn default_min_face_ratio() -> f32 { 0.1 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: default_detector_input(),
            input_height: default_detector_input(),
            confidence_threshold: default_confidence(),
            nms_iou: default_nms_iou(),
            min_face_ratio: default_min_face_ratio(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScorerConfig {
    /// Side length of the square crop the scoring model was trained on.
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_num_threads")]
    pub num_threads: i16,
    #[serde(default)]
    pub use_gpu: bool,
}

fn default_input_size() -> u32 { 96 }
fn default_num_threads() -> i16 { 2 }

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            num_threads: default_num_threads(),
            use_gpu: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PreprocessConfig {
    #[serde(default)]
    pub orientation: Orientation,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnnotationConfig {
    #[serde(default = "default_box_color")]
    pub box_color: [u8; 4],
    #[serde(default = "default_box_thickness")]
    pub box_thickness: u32,
    #[serde(default = "default_text_color")]
    pub text_color: [u8; 4],
    #[serde(default = "default_text_scale")]
    pub text_scale: u32,
    /// Offset of the label baseline from the box's top-left corner.
    #[serde(default = "default_text_offset")]
    pub text_offset: [i32; 2],
}

fn default_box_color() -> [u8; 4] { [0, 255, 0, 255] }
fn default_box_thickness() -> u32 { 2 }
fn default_text_color() -> [u8; 4] { [255, 255, 255, 150] }
fn default_text_scale() -> u32 { 2 }
fn default_text_offset() -> [i32; 2] { [10, 20] }

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            box_color: default_box_color(),
            box_thickness: default_box_thickness(),
            text_color: default_text_color(),
            text_scale: default_text_scale(),
            text_offset: default_text_offset(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

fn default_optimization_level() -> u32 { 3 }

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { optimization_level: default_optimization_level() }
    }
}

impl Config {
    /// Load from the first config file found: `configs/facetag.toml`, then
    /// `~/.config/facetag/facetag.toml`.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local.exists() {
            return Self::load_from_path(&local);
        }
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/facetag/facetag.toml");
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }
        Err(FaceTagError::Config(format!(
            "Config file not found: {}. Please create it from the example.", DEFAULT_CONFIG_PATH
        )))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceTagError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| FaceTagError::Config(format!("Config parse error: {}", e)))?;

        if let Some(base) = path.parent() {
            config.resolve_model_paths(base);
        }

        config.validate()?;
        Ok(config)
    }

    /// Make relative model paths relative to `base` instead of the working directory.
    pub fn resolve_model_paths(&mut self, base: &Path) {
        for model_path in [&mut self.models.detector_path, &mut self.models.scorer_path] {
            if model_path.is_relative() {
                *model_path = base.join(&*model_path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FaceTagError::Config(format!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FaceTagError::Config(format!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(FaceTagError::Config(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.detector.nms_iou) {
            return Err(FaceTagError::Config(format!(
                "NMS IoU threshold must be between 0.0 and 1.0, got {}",
                self.detector.nms_iou
            )));
        }
        if !(0.0..1.0).contains(&self.detector.min_face_ratio) {
            return Err(FaceTagError::Config(format!(
                "Minimum face ratio must be in [0.0, 1.0), got {}",
                self.detector.min_face_ratio
            )));
        }

        if self.scorer.input_size == 0 || self.scorer.input_size > 1024 {
            return Err(FaceTagError::Config(format!(
                "Scorer input size must be between 1 and 1024, got {}",
                self.scorer.input_size
            )));
        }
        if self.scorer.num_threads < 1 {
            return Err(FaceTagError::Config(format!(
                "Scorer thread count must be at least 1, got {}",
                self.scorer.num_threads
            )));
        }

        if self.annotation.box_thickness == 0 || self.annotation.box_thickness > 32 {
            return Err(FaceTagError::Config(format!(
                "Box thickness must be between 1 and 32, got {}",
                self.annotation.box_thickness
            )));
        }
        if self.annotation.text_scale == 0 || self.annotation.text_scale > 16 {
            return Err(FaceTagError::Config(format!(
                "Text scale must be between 1 and 16, got {}",
                self.annotation.text_scale
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[models]
detector_path = "models/det.onnx"
scorer_path = "/opt/models/cls.onnx"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.scorer.input_size, 96);
        assert_eq!(config.scorer.num_threads, 2);
        assert_eq!(config.preprocess.orientation, Orientation::Rotate90);
        assert_eq!(config.annotation.box_color, [0, 255, 0, 255]);
        assert_eq!(config.annotation.text_offset, [10, 20]);
        assert!((config.detector.min_face_ratio - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn relative_model_paths_resolve_against_config_dir() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        let dir = file.path().parent().unwrap();
        assert_eq!(config.models.detector_path, dir.join("models/det.onnx"));
        assert_eq!(config.models.scorer_path, PathBuf::from("/opt/models/cls.onnx"));
    }

    #[test]
    fn orientation_parses_lowercase_names() {
        let text = format!("{MINIMAL}\n[preprocess]\norientation = \"upright\"\n");
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.preprocess.orientation, Orientation::Upright);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load_from_path(Path::new("/nonexistent/facetag.toml")).unwrap_err();
        assert!(matches!(err, FaceTagError::Config(_)));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.scorer.input_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.min_face_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.annotation.box_thickness = 0;
        assert!(config.validate().is_err());
    }
}
