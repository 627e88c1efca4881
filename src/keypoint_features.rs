use thiserror::Error;

use crate::types::{landmarks, Point, KEYPOINT_FEATURES, NUM_LANDMARKS};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Invalid landmark count: expected {expected}, got {actual}")]
    InvalidLandmarkCount { expected: usize, actual: usize },

    /// Todos los landmarks coinciden con la muñeca: no hay escala posible
    #[error("Degenerate landmarks: every point coincides with the wrist")]
    Degenerate,
}

/// Convierte los 21 landmarks en píxeles al vector de 42 características
/// del clasificador estático.
///
/// Layout: [x0, y0, x1, y1, ..., x20, y20], relativo a la muñeca (landmark 0)
/// y dividido por el máximo valor absoluto, así que todo queda en [-1, 1].
pub fn normalize_landmarks(points: &[Point]) -> Result<Vec<f32>, FeatureError> {
    if points.len() != NUM_LANDMARKS {
        return Err(FeatureError::InvalidLandmarkCount {
            expected: NUM_LANDMARKS,
            actual: points.len(),
        });
    }

    let base = points[landmarks::WRIST];
    let mut features = Vec::with_capacity(KEYPOINT_FEATURES);
    for p in points {
        features.push((p.x - base.x) as f32);
        features.push((p.y - base.y) as f32);
    }

    let max_value = features.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    if max_value == 0.0 {
        return Err(FeatureError::Degenerate);
    }

    for v in features.iter_mut() {
        *v /= max_value;
    }

    Ok(features)
}

/// Pasa una coordenada normalizada [0, 1] del detector a píxel, recortada al frame
pub fn to_pixel(normalized: f32, dimension: u32) -> i32 {
    let max_px = dimension.saturating_sub(1) as i32;
    ((normalized * dimension as f32) as i32).clamp(0, max_px)
}

/// Rectángulo envolvente [x_min, y_min, x_max, y_max] de la mano
pub fn bounding_rect(points: &[Point]) -> Option<[i32; 4]> {
    let first = points.first()?;
    let mut rect = [first.x, first.y, first.x, first.y];
    for p in &points[1..] {
        rect[0] = rect[0].min(p.x);
        rect[1] = rect[1].min(p.y);
        rect[2] = rect[2].max(p.x);
        rect[3] = rect[3].max(p.y);
    }
    Some(rect)
}
