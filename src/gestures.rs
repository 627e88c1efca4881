use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has {actual} labels, expected {expected} ({kind})")]
    CountMismatch {
        path: String,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown {kind} class id {id}")]
    UnknownClass { kind: &'static str, id: usize },
}

/// Pose estática de la mano (orden de entrenamiento del clasificador de keypoints)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSign {
    Open,
    Close,
    Pointer,
    Ok,
}

impl HandSign {
    pub const ALL: [HandSign; 4] = [HandSign::Open, HandSign::Close, HandSign::Pointer, HandSign::Ok];

    pub fn from_id(id: usize) -> Result<Self, LabelError> {
        Self::ALL
            .get(id)
            .copied()
            .ok_or(LabelError::UnknownClass { kind: "hand sign", id })
    }

    pub fn id(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandSign::Open => "Open",
            HandSign::Close => "Close",
            HandSign::Pointer => "Pointer",
            HandSign::Ok => "OK",
        }
    }

    /// Solo la pose de apuntar alimenta el historial con la punta del índice
    pub fn is_pointing(self) -> bool {
        self == HandSign::Pointer
    }
}

/// Gesto dinámico del dedo índice (orden de entrenamiento del clasificador temporal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerGesture {
    Stop,
    Clockwise,
    CounterClockwise,
    Move,
}

impl FingerGesture {
    pub const ALL: [FingerGesture; 4] = [
        FingerGesture::Stop,
        FingerGesture::Clockwise,
        FingerGesture::CounterClockwise,
        FingerGesture::Move,
    ];

    /// Clase neutra: también la que se usa cuando la confianza es baja
    pub const NEUTRAL: FingerGesture = FingerGesture::Stop;

    pub fn from_id(id: usize) -> Result<Self, LabelError> {
        Self::ALL
            .get(id)
            .copied()
            .ok_or(LabelError::UnknownClass { kind: "finger gesture", id })
    }

    pub fn id(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FingerGesture::Stop => "Stop",
            FingerGesture::Clockwise => "Clockwise",
            FingerGesture::CounterClockwise => "Counter Clockwise",
            FingerGesture::Move => "Move",
        }
    }
}

/// Lee un CSV de etiquetas (una por fila, primera columna, BOM opcional)
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, LabelError> {
    let path = path.as_ref();
    let csv_err = |source: csv::Error| LabelError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if let Some(first) = record.get(0) {
            let label = first.trim_start_matches('\u{feff}').trim();
            if !label.is_empty() {
                labels.push(label.to_string());
            }
        }
    }
    Ok(labels)
}

/// Comprueba al arrancar que el fichero de etiquetas tiene tantas clases
/// como variantes tiene el enum correspondiente.
pub fn validate_label_count(
    labels: &[String],
    expected: usize,
    kind: &'static str,
    path: impl AsRef<Path>,
) -> Result<(), LabelError> {
    if labels.len() != expected {
        return Err(LabelError::CountMismatch {
            path: path.as_ref().display().to_string(),
            kind,
            expected,
            actual: labels.len(),
        });
    }
    Ok(())
}

/// Carga y valida las etiquetas de los dos clasificadores
pub fn load_label_sets(
    keypoint_labels: impl AsRef<Path>,
    point_history_labels: impl AsRef<Path>,
) -> Result<(Vec<String>, Vec<String>), LabelError> {
    let keypoint = load_labels(&keypoint_labels)?;
    validate_label_count(&keypoint, HandSign::ALL.len(), "hand sign", &keypoint_labels)?;

    let history = load_labels(&point_history_labels)?;
    validate_label_count(&history, FingerGesture::ALL.len(), "finger gesture", &point_history_labels)?;

    for (sign, label) in HandSign::ALL.iter().zip(&keypoint) {
        if !sign.as_str().eq_ignore_ascii_case(label) {
            log::warn!("Etiqueta {} ({}) no coincide con {:?}", sign.id(), label, sign);
        }
    }
    for (gesture, label) in FingerGesture::ALL.iter().zip(&history) {
        if !gesture.as_str().eq_ignore_ascii_case(label) {
            log::warn!("Etiqueta {} ({}) no coincide con {:?}", gesture.id(), label, gesture);
        }
    }

    Ok((keypoint, history))
}
