use std::collections::VecDeque;

use crate::types::{Point, HISTORY_LEN, POINT_HISTORY_FEATURES};

/// Historial circular de la punta del índice (o del centinela (0,0))
/// Se añade exactamente una entrada por frame procesado.
#[derive(Debug, Clone)]
pub struct PointHistory {
    buffer: VecDeque<Point>,
    capacity: usize,
}

impl PointHistory {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(HISTORY_LEN),
            capacity: HISTORY_LEN,
        }
    }

    /// Añade un punto al final; descarta el más antiguo si se supera la capacidad
    pub fn push(&mut self, point: Point) {
        self.buffer.push_back(point);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    pub fn push_sentinel(&mut self) {
        self.push(Point::SENTINEL);
    }

    /// Verifica si hay exactamente 16 entradas (ventana completa)
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn latest(&self) -> Option<Point> {
        self.buffer.back().copied()
    }

    /// Recorre el historial del más antiguo al más reciente
    pub fn iter(&self) -> impl Iterator<Item = &Point> + '_ {
        self.buffer.iter()
    }

    pub fn to_vec(&self) -> Vec<Point> {
        self.buffer.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Vector de 32 características para el clasificador temporal.
    ///
    /// Solo existe con la ventana completa; con menos entradas devuelve `None`
    /// y el clasificador no se invoca en ese frame.
    pub fn features(&self, frame_width: u32, frame_height: u32) -> Option<Vec<f32>> {
        if !self.is_full() {
            return None;
        }
        Some(normalize_history(&self.to_vec(), frame_width, frame_height))
    }
}

impl Default for PointHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordenadas relativas a la primera entrada, divididas por el ancho y alto
/// del frame (cada eje por separado). No se acota a [-1, 1].
pub fn normalize_history(points: &[Point], frame_width: u32, frame_height: u32) -> Vec<f32> {
    let Some(base) = points.first().copied() else {
        return Vec::new();
    };
    let width = frame_width.max(1) as f32;
    let height = frame_height.max(1) as f32;

    let mut features = Vec::with_capacity(POINT_HISTORY_FEATURES);
    for p in points {
        features.push((p.x - base.x) as f32 / width);
        features.push((p.y - base.y) as f32 / height);
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_not_ready_initially() {
        let history = PointHistory::new();
        assert!(history.is_empty());
        assert!(!history.is_full());
        assert!(history.features(960, 540).is_none());
    }

    #[test]
    fn test_features_only_at_full_capacity() {
        let mut history = PointHistory::new();
        for i in 0..HISTORY_LEN {
            assert!(history.features(960, 540).is_none(), "ready at size {}", i);
            history.push(Point::new(i as i32, 0));
        }
        assert_eq!(history.len(), HISTORY_LEN);
        let features = history.features(960, 540).unwrap();
        assert_eq!(features.len(), POINT_HISTORY_FEATURES);
    }

    #[test]
    fn test_sliding_window_keeps_last_16() {
        let mut history = PointHistory::new();
        for i in 0..40 {
            history.push(Point::new(i, i * 2));
        }

        let expected: Vec<Point> = (24..40).map(|i| Point::new(i, i * 2)).collect();
        assert_eq!(history.to_vec(), expected);
        assert_eq!(history.latest(), Some(Point::new(39, 78)));
    }

    #[test]
    fn test_features_relative_to_first_entry() {
        let mut history = PointHistory::new();
        for i in 0..HISTORY_LEN as i32 {
            history.push(Point::new(100 + i * 96, 270 - i * 54));
        }

        let features = history.features(960, 540).unwrap();
        assert_eq!(&features[..2], &[0.0, 0.0]);
        assert!((features[2] - 0.1).abs() < 1e-6);
        assert!((features[3] + 0.1).abs() < 1e-6);
        // Sin normalización de magnitud: la última x supera 1
        assert!((features[30] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_sentinels_are_plain_entries() {
        let mut history = PointHistory::new();
        history.push(Point::new(480, 270));
        for _ in 1..HISTORY_LEN {
            history.push_sentinel();
        }
        let features = history.features(960, 540).unwrap();
        assert!((features[2] + 0.5).abs() < 1e-6);
        assert!((features[3] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clear() {
        let mut history = PointHistory::new();
        history.push(Point::new(3, 4));
        history.clear();
        assert!(history.is_empty());
    }
}
