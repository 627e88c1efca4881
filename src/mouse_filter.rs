use std::collections::VecDeque;

use serde::Deserialize;

use crate::types::Point;

/// Tipo de suavizado del cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// Exponencial con peso `alpha`
    Ema,
    /// Media de las últimas `average_window` posiciones (el ratón clásico de 5 muestras)
    MovingAverage,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Resolución de pantalla sobre la que se escala la punta del índice
    pub screen_width: u32,
    pub screen_height: u32,
    pub smoothing: Smoothing,
    /// Peso del objetivo nuevo en el suavizado exponencial (1.0 = sin suavizado)
    pub alpha: f32,
    /// Muestras promediadas con `Smoothing::MovingAverage`
    pub average_window: usize,
    /// Movimientos menores a esto (px de pantalla) no mueven el cursor
    pub deadzone_px: f32,
    /// Espejar el eje X (cámara sin voltear)
    pub mirror_x: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            smoothing: Smoothing::Ema,
            alpha: 0.35,
            average_window: 5,
            deadzone_px: 3.0,
            mirror_x: false,
        }
    }
}

/// Lleva la punta del índice del frame de la cámara a la pantalla con suavizado
pub struct PointerFilter {
    /// Última posición emitida
    prev: Option<(f32, f32)>,
    /// Objetivos recientes para la media móvil
    recent: VecDeque<(f32, f32)>,
    config: PointerConfig,
}

impl PointerFilter {
    pub fn new(config: PointerConfig) -> Self {
        Self {
            prev: None,
            recent: VecDeque::with_capacity(config.average_window),
            config,
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
        self.recent.clear();
    }

    /// Escala lineal frame → pantalla, sin filtrar
    pub fn to_screen(&self, tip: Point, frame_width: u32, frame_height: u32) -> (f32, f32) {
        let mut nx = tip.x as f32 / frame_width.max(1) as f32;
        let ny = tip.y as f32 / frame_height.max(1) as f32;
        if self.config.mirror_x {
            nx = 1.0 - nx;
        }
        (
            nx.clamp(0.0, 1.0) * self.config.screen_width as f32,
            ny.clamp(0.0, 1.0) * self.config.screen_height as f32,
        )
    }

    /// Devuelve la nueva posición absoluta del cursor, o `None` si el cambio
    /// cae dentro de la zona muerta.
    pub fn update(&mut self, tip: Point, frame_width: u32, frame_height: u32) -> Option<(i32, i32)> {
        let (tx, ty) = self.to_screen(tip, frame_width, frame_height);

        if self.config.smoothing == Smoothing::MovingAverage {
            self.recent.push_back((tx, ty));
            while self.recent.len() > self.config.average_window.max(1) {
                self.recent.pop_front();
            }
        }

        let Some((px, py)) = self.prev else {
            self.prev = Some((tx, ty));
            return Some((tx.round() as i32, ty.round() as i32));
        };

        let (x, y) = match self.config.smoothing {
            Smoothing::Ema => (
                self.config.alpha * tx + (1.0 - self.config.alpha) * px,
                self.config.alpha * ty + (1.0 - self.config.alpha) * py,
            ),
            Smoothing::MovingAverage => {
                let n = self.recent.len() as f32;
                let (sx, sy) = self
                    .recent
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
                (sx / n, sy / n)
            }
        };

        if (x - px).abs() < self.config.deadzone_px && (y - py).abs() < self.config.deadzone_px {
            return None;
        }

        self.prev = Some((x, y));
        Some((x.round() as i32, y.round() as i32))
    }
}
