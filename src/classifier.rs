use thiserror::Error;

#[cfg(feature = "onnx")]
use ort::session::Session;
#[cfg(feature = "onnx")]
use ort::tensor::TensorElementType;
#[cfg(feature = "onnx")]
use ort::value::ValueType;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("Invalid feature size: expected {expected}, got {actual}")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("Model returned no scores")]
    EmptyOutput,

    #[error("Model has {actual} classes, expected {expected}")]
    ClassCount { expected: usize, actual: usize },

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },

    #[error("Classifier backend failure: {0}")]
    Backend(String),
}

/// Resultado de una inferencia: clase ganadora y su probabilidad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub score: f32,
}

/// Frontera con los modelos: vector de características → id de clase
pub trait Classifier {
    /// Longitud exacta del vector que acepta el modelo
    fn input_len(&self) -> usize;

    /// Número de clases declarado por el modelo, si se conoce
    fn num_classes(&self) -> Option<usize> {
        None
    }

    fn classify(&mut self, features: &[f32]) -> Result<Prediction, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn input_len(&self) -> usize {
        (**self).input_len()
    }

    fn num_classes(&self) -> Option<usize> {
        (**self).num_classes()
    }

    fn classify(&mut self, features: &[f32]) -> Result<Prediction, ClassifierError> {
        (**self).classify(features)
    }
}

/// Comprueba la longitud antes de tocar el modelo
pub fn check_input_len(features: &[f32], expected: usize) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::InvalidFeatureSize {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Comprueba al arrancar que el clasificador encaja con el vector de
/// características y con el número de clases esperado
pub fn check_shape(
    classifier: &dyn Classifier,
    input_len: usize,
    classes: usize,
) -> Result<(), ClassifierError> {
    if classifier.input_len() != input_len {
        return Err(ClassifierError::InvalidFeatureSize {
            expected: input_len,
            actual: classifier.input_len(),
        });
    }
    match classifier.num_classes() {
        Some(actual) if actual != classes => Err(ClassifierError::ClassCount {
            expected: classes,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Índice y valor de la máxima probabilidad
pub fn argmax(scores: &[f32]) -> Option<Prediction> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .fold(None, |best: Option<Prediction>, (i, &s)| match best {
            Some(b) if b.score >= s => Some(b),
            _ => Some(Prediction { class_id: i, score: s }),
        })
}

/// Clasificador respaldado por un modelo ONNX con entrada [1, N] float32
#[cfg(feature = "onnx")]
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    prob_output_name: String,
    input_len: usize,
    num_classes: Option<usize>,
}

#[cfg(feature = "onnx")]
impl OnnxClassifier {
    pub fn new(model_path: &str, input_len: usize) -> Result<Self, ClassifierError> {
        let session = Session::builder()?.commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(ClassifierError::MissingIo { kind: "input" })?;

        // Ancho declarado de la entrada: [batch, N]; dimensiones dinámicas (-1) no se comprueban
        if let Some(width) = session.inputs.first().and_then(|i| last_dim(&i.input_type)) {
            if width != input_len {
                return Err(ClassifierError::InvalidFeatureSize {
                    expected: input_len,
                    actual: width,
                });
            }
        }

        // Preferir la salida float32 (probabilidades) frente a la de etiquetas
        let prob_output = session
            .outputs
            .iter()
            .find(|output| {
                matches!(
                    output.output_type,
                    ValueType::Tensor {
                        ty: TensorElementType::Float32,
                        ..
                    }
                )
            })
            .or_else(|| session.outputs.first())
            .ok_or(ClassifierError::MissingIo { kind: "output" })?;
        let prob_output_name = prob_output.name.clone();
        let num_classes = last_dim(&prob_output.output_type);

        log::info!("[ONNX] Modelo cargado: {}", model_path);
        log::debug!("[ONNX] Input: {} ({} valores)", input_name, input_len);
        log::debug!("[ONNX] Output: {}", prob_output_name);

        Ok(Self {
            session,
            input_name,
            prob_output_name,
            input_len,
            num_classes,
        })
    }

    /// Probabilidades por clase en el orden del modelo
    pub fn scores(&mut self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        check_input_len(features, self.input_len)?;

        let shape = vec![1_usize, self.input_len];
        let input_value = ort::value::Value::from_array((shape, features.to_vec()))?;

        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => &input_value,
        ])?;

        let (_, prob_data) =
            outputs[self.prob_output_name.as_str()].try_extract_tensor::<f32>()?;

        Ok(prob_data.to_vec())
    }
}

/// Última dimensión de un tensor si es fija
#[cfg(feature = "onnx")]
fn last_dim(value_type: &ValueType) -> Option<usize> {
    match value_type {
        ValueType::Tensor { shape, .. } => shape
            .iter()
            .last()
            .and_then(|&d| usize::try_from(d).ok())
            .filter(|&d| d > 0),
        _ => None,
    }
}

#[cfg(feature = "onnx")]
impl Classifier for OnnxClassifier {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    fn classify(&mut self, features: &[f32]) -> Result<Prediction, ClassifierError> {
        let scores = self.scores(features)?;
        argmax(&scores).ok_or(ClassifierError::EmptyOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    impl Classifier for Fixed {
        fn input_len(&self) -> usize {
            3
        }

        fn classify(&mut self, features: &[f32]) -> Result<Prediction, ClassifierError> {
            check_input_len(features, self.input_len())?;
            Ok(Prediction {
                class_id: self.0,
                score: 1.0,
            })
        }
    }

    #[test]
    fn argmax_picks_highest_score() {
        let p = argmax(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(p.class_id, 1);
        assert_eq!(p.score, 0.7);
    }

    #[test]
    fn argmax_tie_keeps_first() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]).unwrap().class_id, 0);
    }

    #[test]
    fn argmax_of_nothing() {
        assert!(argmax(&[]).is_none());
        assert!(argmax(&[f32::NAN]).is_none());
    }

    #[test]
    fn boxed_classifier_validates_size() {
        let mut boxed: Box<dyn Classifier> = Box::new(Fixed(2));
        assert_eq!(boxed.classify(&[0.0; 3]).unwrap().class_id, 2);
        assert!(matches!(
            boxed.classify(&[0.0; 5]),
            Err(ClassifierError::InvalidFeatureSize {
                expected: 3,
                actual: 5
            })
        ));
    }

    struct Declared(usize, Option<usize>);

    impl Classifier for Declared {
        fn input_len(&self) -> usize {
            self.0
        }

        fn num_classes(&self) -> Option<usize> {
            self.1
        }

        fn classify(&mut self, _features: &[f32]) -> Result<Prediction, ClassifierError> {
            Err(ClassifierError::EmptyOutput)
        }
    }

    #[test]
    fn shape_check_catches_wrong_width_and_class_count() {
        assert!(check_shape(&Declared(42, Some(4)), 42, 4).is_ok());
        assert!(check_shape(&Declared(42, None), 42, 4).is_ok());
        assert!(matches!(
            check_shape(&Declared(32, Some(4)), 42, 4),
            Err(ClassifierError::InvalidFeatureSize { expected: 42, actual: 32 })
        ));
        assert!(matches!(
            check_shape(&Declared(42, Some(5)), 42, 4),
            Err(ClassifierError::ClassCount { expected: 4, actual: 5 })
        ));
    }
}
