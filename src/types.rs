/// Coordenada entera en píxeles dentro del frame de la cámara
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Entrada de historial que significa "sin gesto de apuntar en este frame"
    pub const SENTINEL: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

/// Índices de landmarks usados (convención MediaPipe Hands)
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const INDEX_TIP: usize = 8;
}

/// Una mano detectada: 21 landmarks en píxeles + lateralidad
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    pub landmarks: [Point; NUM_LANDMARKS],
    /// "Left" o "Right", tal como lo reporta el detector
    pub handedness: String,
    pub score: f32,
}

impl HandObservation {
    pub fn fingertip(&self) -> Point {
        self.landmarks[landmarks::INDEX_TIP]
    }
}

/// Lo que el detector entrega por cada frame capturado
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub width: u32,
    pub height: u32,
    pub hand: Option<HandObservation>,
}

impl FrameInput {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            hand: None,
        }
    }
}

/// Constantes del sistema
pub const NUM_LANDMARKS: usize = 21;
pub const HISTORY_LEN: usize = 16;
pub const KEYPOINT_FEATURES: usize = NUM_LANDMARKS * 2; // 42
pub const POINT_HISTORY_FEATURES: usize = HISTORY_LEN * 2; // 32
