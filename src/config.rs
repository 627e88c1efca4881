use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::dataset::DatasetConfig;
use crate::detector::DetectorConfig;
use crate::dispatcher::ActionConfig;
use crate::hid::VolumeConfig;
use crate::mouse_filter::{PointerConfig, Smoothing};

/// Configuración completa, leída de `manocontrol.toml`.
/// Cualquier sección o campo ausente toma su valor por defecto.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub models: ModelConfig,
    pub actions: ActionConfig,
    pub pointer: PointerConfig,
    pub volume: VolumeConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub keypoint_model: PathBuf,
    pub keypoint_labels: PathBuf,
    pub point_history_model: PathBuf,
    pub point_history_labels: PathBuf,
    /// Confianza mínima del clasificador temporal
    pub score_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            keypoint_model: PathBuf::from("model/keypoint_classifier/keypoint_classifier.onnx"),
            keypoint_labels: PathBuf::from("model/keypoint_classifier/keypoint_classifier_label.csv"),
            point_history_model: PathBuf::from(
                "model/point_history_classifier/point_history_classifier.onnx",
            ),
            point_history_labels: PathBuf::from(
                "model/point_history_classifier/point_history_classifier_label.csv",
            ),
            score_threshold: 0.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Carga el fichero si existe; si no, valores por defecto
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Cargando configuración de {:?}", path);
            Self::load_from_file(path)
        } else {
            log::info!("{:?} no existe, usando configuración por defecto", path);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.detector.command.is_empty() {
            return invalid("detector.command must not be empty");
        }
        if self.detector.width == 0 || self.detector.height == 0 {
            return invalid("Detector frame size must be positive");
        }
        if !(0.0..=1.0).contains(&self.detector.min_detection_confidence)
            || !(0.0..=1.0).contains(&self.detector.min_tracking_confidence)
        {
            return invalid("Detector confidences must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.models.score_threshold) {
            return invalid("models.score_threshold must be within [0, 1]");
        }
        if self.pointer.screen_width == 0 || self.pointer.screen_height == 0 {
            return invalid("Screen size must be positive");
        }
        if !(self.pointer.alpha > 0.0 && self.pointer.alpha <= 1.0) {
            return invalid("pointer.alpha must be within (0, 1]");
        }
        if self.pointer.smoothing == Smoothing::MovingAverage && self.pointer.average_window == 0 {
            return invalid("pointer.average_window must be at least 1");
        }
        if self.pointer.deadzone_px < 0.0 {
            return invalid("pointer.deadzone_px must not be negative");
        }
        if self.volume.step_percent == 0 || self.volume.step_percent > 100 {
            return invalid("volume.step_percent must be within 1..=100");
        }
        if self.actions.volume_up_gesture == self.actions.volume_down_gesture {
            return invalid("Volume up and down must use different gestures");
        }
        if self.actions.cursor_sign == self.actions.click_sign {
            return invalid("Cursor and click must use different hand signs");
        }
        Ok(())
    }
}
