//! Pipeline por frame: landmarks → clasificador estático → historial de la
//! punta del índice → clasificador temporal → votación.
//!
//! El estado entre frames vive en [`GestureSession`], que el llamador posee y
//! pasa en cada llamada. Los clasificadores son cajas negras detrás del trait
//! [`Classifier`].

use thiserror::Error;

use crate::classifier::{check_shape, Classifier, ClassifierError, Prediction};
use crate::gestures::{FingerGesture, HandSign, LabelError};
use crate::keypoint_features::{bounding_rect, normalize_landmarks};
use crate::point_history::PointHistory;
use crate::types::{FrameInput, Point, KEYPOINT_FEATURES, POINT_HISTORY_FEATURES};
use crate::vote::GestureVotes;
#[cfg(feature = "onnx")]
use crate::{classifier::OnnxClassifier, gestures::load_label_sets};

/// Etapa que falló, para distinguir errores del clasificador estático y del temporal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    KeyPoint,
    PointHistory,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage:?} classifier failed: {source}")]
    Classifier {
        stage: Stage,
        #[source]
        source: ClassifierError,
    },

    #[error("{stage:?} classifier returned an unknown class: {source}")]
    Label {
        stage: Stage,
        #[source]
        source: LabelError,
    },
}

/// Estado de la mano en el frame procesado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandStatus {
    NoHand,
    /// Todos los landmarks coinciden con la muñeca; se marca y no se clasifica
    Degenerate,
    Classified,
}

/// Lectura del clasificador temporal en un frame concreto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerReading {
    /// Lo que dijo el modelo
    pub prediction: Prediction,
    /// Gesto aceptado tras aplicar el umbral de confianza
    pub gesture: FingerGesture,
}

/// Todo lo que produce un frame para el dispatcher, el logging y los overlays
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub status: HandStatus,
    pub handedness: Option<String>,
    pub hand_sign: Option<HandSign>,
    /// Punta del índice en píxeles crudos (para mover el cursor)
    pub fingertip: Option<Point>,
    pub bounding_rect: Option<[i32; 4]>,
    pub finger: Option<FingerReading>,
    /// Gesto temporal estabilizado por votación
    pub stable_gesture: Option<FingerGesture>,
    /// Contenido del historial tras este frame (más antiguo primero)
    pub history: Vec<Point>,
    pub keypoint_features: Option<Vec<f32>>,
    pub history_features: Option<Vec<f32>>,
}

impl FrameOutput {
    fn new(status: HandStatus) -> Self {
        Self {
            status,
            handedness: None,
            hand_sign: None,
            fingertip: None,
            bounding_rect: None,
            finger: None,
            stable_gesture: None,
            history: Vec::new(),
            keypoint_features: None,
            history_features: None,
        }
    }
}

/// Buffers que persisten entre frames de una misma sesión
#[derive(Debug, Clone, Default)]
pub struct GestureSession {
    pub point_history: PointHistory,
    pub votes: GestureVotes,
}

impl GestureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stable_gesture(&self) -> Option<FingerGesture> {
        self.votes
            .most_common()
            .and_then(|id| FingerGesture::from_id(id).ok())
    }
}

pub struct GesturePipeline<K, H> {
    keypoint: K,
    point_history: H,
    /// Predicciones temporales por debajo de este valor cuentan como gesto neutro
    score_threshold: f32,
}

impl<K: Classifier, H: Classifier> GesturePipeline<K, H> {
    pub fn new(keypoint: K, point_history: H, score_threshold: f32) -> Self {
        Self {
            keypoint,
            point_history,
            score_threshold,
        }
    }

    /// Verifica que cada modelo acepta su vector y produce tantas clases como
    /// variantes tiene su enum
    pub fn check_models(&self) -> Result<(), PipelineError> {
        check_shape(&self.keypoint, KEYPOINT_FEATURES, HandSign::ALL.len()).map_err(|source| {
            PipelineError::Classifier {
                stage: Stage::KeyPoint,
                source,
            }
        })?;
        check_shape(
            &self.point_history,
            POINT_HISTORY_FEATURES,
            FingerGesture::ALL.len(),
        )
        .map_err(|source| PipelineError::Classifier {
            stage: Stage::PointHistory,
            source,
        })
    }

    /// Procesa un frame completo sobre la sesión dada.
    ///
    /// Si algún clasificador falla se devuelve el error y la sesión queda tal
    /// cual estaba antes del frame.
    pub fn process_frame(
        &mut self,
        session: &mut GestureSession,
        frame: &FrameInput,
    ) -> Result<FrameOutput, PipelineError> {
        let Some(hand) = frame.hand.as_ref() else {
            session.point_history.push_sentinel();
            let mut output = FrameOutput::new(HandStatus::NoHand);
            output.stable_gesture = session.stable_gesture();
            output.history = session.point_history.to_vec();
            return Ok(output);
        };

        let mut output = FrameOutput::new(HandStatus::Classified);
        output.handedness = Some(hand.handedness.clone());
        output.fingertip = Some(hand.fingertip());
        output.bounding_rect = bounding_rect(&hand.landmarks);

        let keypoint_features = match normalize_landmarks(&hand.landmarks) {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Frame sin clasificar: {}", e);
                session.point_history.push_sentinel();
                output.status = HandStatus::Degenerate;
                output.stable_gesture = session.stable_gesture();
                output.history = session.point_history.to_vec();
                return Ok(output);
            }
        };

        let sign_prediction = self
            .keypoint
            .classify(&keypoint_features)
            .map_err(|source| PipelineError::Classifier {
                stage: Stage::KeyPoint,
                source,
            })?;
        let hand_sign = HandSign::from_id(sign_prediction.class_id).map_err(|source| {
            PipelineError::Label {
                stage: Stage::KeyPoint,
                source,
            }
        })?;

        // El historial se toca solo cuando el frame ya no puede fallar por la
        // etapa estática; si falla la temporal se deshace el push.
        let snapshot = session.point_history.clone();
        if hand_sign.is_pointing() {
            session.point_history.push(hand.fingertip());
        } else {
            session.point_history.push_sentinel();
        }

        let history_features = session.point_history.features(frame.width, frame.height);
        if let Some(features) = history_features.as_ref() {
            let reading = match self.classify_history(features) {
                Ok(reading) => reading,
                Err(e) => {
                    session.point_history = snapshot;
                    return Err(e);
                }
            };
            session.votes.push(reading.gesture.id());
            output.finger = Some(reading);
        }

        output.hand_sign = Some(hand_sign);
        output.stable_gesture = session.stable_gesture();
        output.history = session.point_history.to_vec();
        output.keypoint_features = Some(keypoint_features);
        output.history_features = history_features;
        Ok(output)
    }

    fn classify_history(&mut self, features: &[f32]) -> Result<FingerReading, PipelineError> {
        let prediction = self
            .point_history
            .classify(features)
            .map_err(|source| PipelineError::Classifier {
                stage: Stage::PointHistory,
                source,
            })?;

        let gesture = if prediction.score < self.score_threshold {
            log::debug!(
                "Gesto temporal {} con confianza baja ({:.2}), se toma como {:?}",
                prediction.class_id,
                prediction.score,
                FingerGesture::NEUTRAL
            );
            FingerGesture::NEUTRAL
        } else {
            FingerGesture::from_id(prediction.class_id).map_err(|source| PipelineError::Label {
                stage: Stage::PointHistory,
                source,
            })?
        };

        Ok(FingerReading { prediction, gesture })
    }
}

/// Carga etiquetas y ambos modelos ONNX según la configuración
#[cfg(feature = "onnx")]
pub fn load_onnx_pipeline(
    models: &crate::config::ModelConfig,
) -> anyhow::Result<GesturePipeline<OnnxClassifier, OnnxClassifier>> {
    use anyhow::Context;

    let (keypoint_labels, history_labels) =
        load_label_sets(&models.keypoint_labels, &models.point_history_labels)?;
    log::info!("Etiquetas de pose: {:?}", keypoint_labels);
    log::info!("Etiquetas de gesto: {:?}", history_labels);

    let keypoint = OnnxClassifier::new(&models.keypoint_model.to_string_lossy(), KEYPOINT_FEATURES)
        .with_context(|| format!("No se pudo cargar {:?}", models.keypoint_model))?;
    let point_history = OnnxClassifier::new(
        &models.point_history_model.to_string_lossy(),
        POINT_HISTORY_FEATURES,
    )
    .with_context(|| format!("No se pudo cargar {:?}", models.point_history_model))?;

    let pipeline = GesturePipeline::new(keypoint, point_history, models.score_threshold);
    pipeline.check_models()?;
    Ok(pipeline)
}
