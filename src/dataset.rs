use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Deserialize;

use crate::pipeline::FrameOutput;

/// Modo de captura de datos de entrenamiento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    #[default]
    Normal,
    KeyPoint,
    PointHistory,
}

impl LoggingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LoggingMode::Normal => "Normal",
            LoggingMode::KeyPoint => "Logging Key Point",
            LoggingMode::PointHistory => "Logging Point History",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub keypoint_csv: PathBuf,
    pub point_history_csv: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            keypoint_csv: PathBuf::from("model/keypoint_classifier/keypoint.csv"),
            point_history_csv: PathBuf::from("model/point_history_classifier/point_history.csv"),
        }
    }
}

/// Añade vectores de características etiquetados a los CSV de entrenamiento.
/// Formato de fila: `label,f0,f1,...`
pub struct DatasetLogger {
    config: DatasetConfig,
}

impl DatasetLogger {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Escribe la fila correspondiente al modo; devuelve si se escribió algo.
    /// Solo se aceptan etiquetas 0-9.
    pub fn log(&self, mode: LoggingMode, label: Option<u8>, output: &FrameOutput) -> Result<bool> {
        let Some(label) = label.filter(|l| *l <= 9) else {
            return Ok(false);
        };

        let (path, features) = match mode {
            LoggingMode::Normal => return Ok(false),
            LoggingMode::KeyPoint => (&self.config.keypoint_csv, output.keypoint_features.as_ref()),
            LoggingMode::PointHistory => {
                (&self.config.point_history_csv, output.history_features.as_ref())
            }
        };

        let Some(features) = features else {
            return Ok(false);
        };

        append_row(path, label, features)?;
        log::info!("📝 Fila {} guardada en {:?} ({} valores)", label, path, features.len());
        Ok(true)
    }
}

fn append_row(path: &Path, label: u8, features: &[f32]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("No se pudo crear el directorio {:?}", parent))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("No se pudo abrir {:?}", path))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    let mut record = Vec::with_capacity(features.len() + 1);
    record.push(label.to_string());
    record.extend(features.iter().map(|v| v.to_string()));
    writer.write_record(&record)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::HandStatus;

    fn output(keypoint: Option<Vec<f32>>, history: Option<Vec<f32>>) -> FrameOutput {
        FrameOutput {
            status: HandStatus::Classified,
            handedness: None,
            hand_sign: None,
            fingertip: None,
            bounding_rect: None,
            finger: None,
            stable_gesture: None,
            history: Vec::new(),
            keypoint_features: keypoint,
            history_features: history,
        }
    }

    fn logger(name: &str) -> (DatasetLogger, DatasetConfig) {
        let dir = std::env::temp_dir().join("manocontrol_dataset_test").join(name);
        let _ = fs::remove_dir_all(&dir);
        let config = DatasetConfig {
            keypoint_csv: dir.join("keypoint.csv"),
            point_history_csv: dir.join("point_history.csv"),
        };
        (DatasetLogger::new(config.clone()), config)
    }

    #[test]
    fn keypoint_rows_are_appended() {
        let (logger, config) = logger("keypoint");
        let out = output(Some(vec![0.0, -0.5, 1.0]), None);

        assert!(logger.log(LoggingMode::KeyPoint, Some(3), &out).unwrap());
        assert!(logger.log(LoggingMode::KeyPoint, Some(7), &out).unwrap());

        let content = fs::read_to_string(&config.keypoint_csv).unwrap();
        assert_eq!(content, "3,0,-0.5,1\n7,0,-0.5,1\n");
        assert!(!config.point_history_csv.exists());
    }

    #[test]
    fn history_rows_need_a_full_window() {
        let (logger, config) = logger("history");
        assert!(!logger
            .log(LoggingMode::PointHistory, Some(1), &output(Some(vec![1.0]), None))
            .unwrap());
        assert!(logger
            .log(LoggingMode::PointHistory, Some(1), &output(None, Some(vec![0.0, 0.25])))
            .unwrap());
        let content = fs::read_to_string(&config.point_history_csv).unwrap();
        assert_eq!(content, "1,0,0.25\n");
    }

    #[test]
    fn nothing_is_written_without_mode_or_label() {
        let (logger, config) = logger("skip");
        let out = output(Some(vec![1.0]), Some(vec![1.0]));
        assert!(!logger.log(LoggingMode::Normal, Some(1), &out).unwrap());
        assert!(!logger.log(LoggingMode::KeyPoint, None, &out).unwrap());
        assert!(!logger.log(LoggingMode::KeyPoint, Some(12), &out).unwrap());
        assert!(!config.keypoint_csv.exists());
    }
}
