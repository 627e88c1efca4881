use serde::Deserialize;

use crate::gestures::{FingerGesture, HandSign};
use crate::mouse_filter::{PointerConfig, PointerFilter};
use crate::pipeline::FrameOutput;

/// Acción de sistema resultante de un frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Posición absoluta del cursor en píxeles de pantalla
    MoveCursor { x: i32, y: i32 },
    Click,
    VolumeUp,
    VolumeDown,
}

/// Cuándo se disparan las acciones puntuales (click y volumen)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Una vez, al activarse el gesto
    Edge,
    /// En cada frame en que el gesto sigue activo
    EveryFrame,
}

/// Tabla gesto → acción
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub trigger: TriggerPolicy,
    pub cursor_sign: HandSign,
    pub click_sign: HandSign,
    pub volume_down_gesture: FingerGesture,
    pub volume_up_gesture: FingerGesture,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerPolicy::Edge,
            cursor_sign: HandSign::Ok,
            click_sign: HandSign::Close,
            volume_down_gesture: FingerGesture::Clockwise,
            volume_up_gesture: FingerGesture::CounterClockwise,
        }
    }
}

/// Destino de las acciones (uinput, amixer, log...)
pub trait ActionSink {
    fn perform(&mut self, action: Action) -> anyhow::Result<()>;
}

/// Sink que solo registra las acciones (modo --dry-run)
#[derive(Debug, Default)]
pub struct LogActions;

impl ActionSink for LogActions {
    fn perform(&mut self, action: Action) -> anyhow::Result<()> {
        match action {
            Action::MoveCursor { .. } => log::debug!("🖱️  {:?}", action),
            _ => log::info!("🎮 {:?}", action),
        }
        Ok(())
    }
}

/// Traduce la salida estabilizada del pipeline en acciones de sistema
pub struct ActionDispatcher {
    config: ActionConfig,
    pointer: PointerFilter,
    click_active: bool,
    /// Último gesto estable visto en un frame con clasificación temporal
    last_stable: Option<FingerGesture>,
}

impl ActionDispatcher {
    pub fn new(config: ActionConfig, pointer: PointerConfig) -> Self {
        Self {
            config,
            pointer: PointerFilter::new(pointer),
            click_active: false,
            last_stable: None,
        }
    }

    pub fn decide(&mut self, output: &FrameOutput, frame_width: u32, frame_height: u32) -> Vec<Action> {
        let mut actions = Vec::new();
        let every_frame = self.config.trigger == TriggerPolicy::EveryFrame;

        // Cursor: continuo mientras se mantenga la pose
        match (output.hand_sign, output.fingertip) {
            (Some(sign), Some(tip)) if sign == self.config.cursor_sign => {
                if let Some((x, y)) = self.pointer.update(tip, frame_width, frame_height) {
                    actions.push(Action::MoveCursor { x, y });
                }
            }
            _ => self.pointer.reset(),
        }

        let click_now = output.hand_sign == Some(self.config.click_sign);
        if click_now && (every_frame || !self.click_active) {
            actions.push(Action::Click);
        }
        self.click_active = click_now;

        // Volumen: solo en frames donde el clasificador temporal se ejecutó
        if output.finger.is_some() {
            let stable = output.stable_gesture;
            let changed = stable != self.last_stable;
            if every_frame || changed {
                if stable == Some(self.config.volume_down_gesture) {
                    actions.push(Action::VolumeDown);
                } else if stable == Some(self.config.volume_up_gesture) {
                    actions.push(Action::VolumeUp);
                }
            }
            self.last_stable = stable;
        }

        actions
    }

    /// Decide y envía al sink; los errores del sink se registran y no cortan el frame
    pub fn dispatch(
        &mut self,
        output: &FrameOutput,
        frame_width: u32,
        frame_height: u32,
        sink: &mut dyn ActionSink,
    ) -> Vec<Action> {
        let actions = self.decide(output, frame_width, frame_height);
        for action in &actions {
            if let Err(e) = sink.perform(*action) {
                log::error!("❌ Error ejecutando {:?}: {:#}", action, e);
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Prediction;
    use crate::pipeline::{FingerReading, HandStatus};
    use crate::types::Point;

    fn frame(sign: Option<HandSign>, stable: Option<FingerGesture>, classified: bool) -> FrameOutput {
        FrameOutput {
            status: HandStatus::Classified,
            handedness: Some("Right".to_string()),
            hand_sign: sign,
            fingertip: Some(Point::new(480, 270)),
            bounding_rect: None,
            finger: classified.then(|| FingerReading {
                prediction: Prediction {
                    class_id: stable.map(|g| g.id()).unwrap_or(0),
                    score: 0.9,
                },
                gesture: stable.unwrap_or(FingerGesture::Stop),
            }),
            stable_gesture: stable,
            history: Vec::new(),
            keypoint_features: None,
            history_features: None,
        }
    }

    fn dispatcher(trigger: TriggerPolicy) -> ActionDispatcher {
        ActionDispatcher::new(
            ActionConfig {
                trigger,
                ..ActionConfig::default()
            },
            PointerConfig::default(),
        )
    }

    #[derive(Default)]
    struct Recorder(Vec<Action>);

    impl ActionSink for Recorder {
        fn perform(&mut self, action: Action) -> anyhow::Result<()> {
            self.0.push(action);
            Ok(())
        }
    }

    #[test]
    fn ok_sign_moves_cursor_to_scaled_fingertip() {
        let mut d = dispatcher(TriggerPolicy::Edge);
        let actions = d.decide(&frame(Some(HandSign::Ok), None, false), 960, 540);
        assert_eq!(actions, vec![Action::MoveCursor { x: 960, y: 540 }]);
    }

    #[test]
    fn edge_trigger_clicks_once_per_gesture() {
        let mut d = dispatcher(TriggerPolicy::Edge);
        let close = frame(Some(HandSign::Close), None, false);
        let open = frame(Some(HandSign::Open), None, false);

        assert_eq!(d.decide(&close, 960, 540), vec![Action::Click]);
        assert!(d.decide(&close, 960, 540).is_empty());
        assert!(d.decide(&open, 960, 540).is_empty());
        assert_eq!(d.decide(&close, 960, 540), vec![Action::Click]);
    }

    #[test]
    fn every_frame_trigger_repeats_while_held() {
        let mut d = dispatcher(TriggerPolicy::EveryFrame);
        let cw = frame(Some(HandSign::Pointer), Some(FingerGesture::Clockwise), true);
        for _ in 0..3 {
            assert_eq!(d.decide(&cw, 960, 540), vec![Action::VolumeDown]);
        }
    }

    #[test]
    fn edge_trigger_steps_volume_once() {
        let mut d = dispatcher(TriggerPolicy::Edge);
        let ccw = frame(Some(HandSign::Pointer), Some(FingerGesture::CounterClockwise), true);
        let stop = frame(Some(HandSign::Pointer), Some(FingerGesture::Stop), true);

        assert_eq!(d.decide(&ccw, 960, 540), vec![Action::VolumeUp]);
        assert!(d.decide(&ccw, 960, 540).is_empty());
        assert!(d.decide(&stop, 960, 540).is_empty());
        assert_eq!(d.decide(&ccw, 960, 540), vec![Action::VolumeUp]);
    }

    #[test]
    fn volume_ignores_frames_without_temporal_classification() {
        let mut d = dispatcher(TriggerPolicy::EveryFrame);
        let held = frame(None, Some(FingerGesture::Clockwise), false);
        assert!(d.decide(&held, 960, 540).is_empty());
    }

    #[test]
    fn dispatch_forwards_to_sink() {
        let mut d = dispatcher(TriggerPolicy::Edge);
        let mut sink = Recorder::default();
        d.dispatch(&frame(Some(HandSign::Close), None, false), 960, 540, &mut sink);
        assert_eq!(sink.0, vec![Action::Click]);
    }
}
