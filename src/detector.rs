//! Fuente de landmarks: el detector de manos corre fuera de este proceso
//! (MediaPipe Hands en un script auxiliar) y escribe una línea JSON por frame:
//!
//! ```text
//! {"width":960,"height":540,"hands":[{"handedness":"Right","score":0.93,
//!   "landmarks":[{"x":0.51,"y":0.62,"z":0.0}, ... 21 puntos]}]}
//! ```
//!
//! Las coordenadas llegan normalizadas a [0, 1] y aquí se pasan a píxeles.
//! El mismo formato sirve para reproducir capturas grabadas (`.jsonl`).
//!
//! El detector en vivo es `hand_landmarks.py`, en la raíz del repositorio; se
//! ejecuta con el Python de `.venv` (ver `DetectorConfig::command`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use thiserror::Error;

use crate::keypoint_features::to_pixel;
use crate::types::{FrameInput, HandObservation, Point, NUM_LANDMARKS};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid detector line {line}: {source}")]
    JsonError {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Detector did not signal ready, got: {0:?}")]
    NotReady(String),

    #[error("Empty detector command")]
    EmptyCommand,

    #[error("Detector subprocess has no {0}")]
    MissingPipe(&'static str),
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    #[serde(default = "default_score")]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct FrameJson {
    width: u32,
    height: u32,
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

fn default_score() -> f32 {
    1.0
}

/// Cualquier cosa que entregue frames de landmarks, uno por llamada
pub trait LandmarkSource {
    /// `Ok(None)` marca el fin del stream
    fn next_frame(&mut self) -> Result<Option<FrameInput>, DetectorError>;
}

/// Lector del protocolo de líneas JSON sobre cualquier `BufRead`
pub struct JsonLinesSource<R> {
    reader: R,
    line_no: usize,
    min_score: f32,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, min_score: f32) -> Self {
        Self {
            reader,
            line_no: 0,
            min_score,
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Abre una captura grabada
    pub fn open(path: impl AsRef<Path>, min_score: f32) -> Result<Self, DetectorError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), min_score))
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameInput>, DetectorError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return parse_frame(&line, self.min_score)
                .map(Some)
                .map_err(|source| DetectorError::JsonError {
                    line: self.line_no,
                    source,
                });
        }
    }
}

/// Convierte una línea del detector en un frame. Se queda con la primera mano
/// válida; las que no traen 21 landmarks o tienen score bajo se descartan.
pub fn parse_frame(line: &str, min_score: f32) -> Result<FrameInput, serde_json::Error> {
    let frame: FrameJson = serde_json::from_str(line.trim())?;

    if let Some(error) = frame.error.as_deref() {
        log::warn!("Error del detector: {}", error);
    }

    let mut hand = None;
    for h in frame.hands {
        if h.landmarks.len() != NUM_LANDMARKS {
            log::warn!("Se esperaban {} landmarks, llegaron {}", NUM_LANDMARKS, h.landmarks.len());
            continue;
        }
        if h.score < min_score {
            log::debug!("Mano descartada por score {:.2}", h.score);
            continue;
        }

        let mut landmarks = [Point::SENTINEL; NUM_LANDMARKS];
        for (dst, lm) in landmarks.iter_mut().zip(&h.landmarks) {
            *dst = Point::new(to_pixel(lm.x, frame.width), to_pixel(lm.y, frame.height));
        }
        hand = Some(HandObservation {
            landmarks,
            handedness: h.handedness,
            score: h.score,
        });
        break;
    }

    Ok(FrameInput {
        width: frame.width,
        height: frame.height,
        hand,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Programa y argumentos base del detector (p. ej. un script Python)
    pub command: Vec<String>,
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub static_image_mode: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: vec![
                ".venv/bin/python".to_string(),
                "hand_landmarks.py".to_string(),
            ],
            device: 0,
            width: 960,
            height: 540,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
            static_image_mode: false,
        }
    }
}

impl DetectorConfig {
    /// Argumentos que se añaden al comando base
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--device".to_string(),
            self.device.to_string(),
            "--width".to_string(),
            self.width.to_string(),
            "--height".to_string(),
            self.height.to_string(),
            "--min-detection-confidence".to_string(),
            self.min_detection_confidence.to_string(),
            "--min-tracking-confidence".to_string(),
            self.min_tracking_confidence.to_string(),
        ];
        if self.static_image_mode {
            args.push("--static-image-mode".to_string());
        }
        args
    }
}

/// Proceso hijo del detector; al soltarlo se mata y se recoge
pub struct DetectorProcess {
    child: Child,
}

impl DetectorProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for DetectorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Detector en un subproceso: se lee su stdout con el protocolo de líneas JSON
pub struct SubprocessDetector {
    process: DetectorProcess,
    source: JsonLinesSource<BufReader<ChildStdout>>,
}

impl SubprocessDetector {
    pub fn spawn(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let (program, base_args) = config
            .command
            .split_first()
            .ok_or(DetectorError::EmptyCommand)?;

        log::info!("Arrancando detector de manos: {}", config.command.join(" "));

        let mut child = Command::new(program)
            .args(base_args)
            .args(config.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdout = child.stdout.take();
        let process = DetectorProcess { child };
        let stdout = stdout.ok_or(DetectorError::MissingPipe("stdout"))?;
        let mut reader = BufReader::new(stdout);

        // Esperar la señal "READY"; si no llega, `process` mata al hijo
        let mut ready_line = String::new();
        reader.read_line(&mut ready_line)?;
        if ready_line.trim() != "READY" {
            return Err(DetectorError::NotReady(ready_line));
        }

        log::info!("Detector de manos listo (pid {})", process.id());

        Ok(Self {
            process,
            source: JsonLinesSource::new(reader, config.min_detection_confidence),
        })
    }

    /// Separa el proceso (que se queda el dueño) del lector (que puede ir a
    /// otro hilo). Soltar el proceso cierra el stream y el lector ve EOF.
    pub fn split(self) -> (DetectorProcess, JsonLinesSource<BufReader<ChildStdout>>) {
        (self.process, self.source)
    }
}

impl LandmarkSource for SubprocessDetector {
    fn next_frame(&mut self) -> Result<Option<FrameInput>, DetectorError> {
        self.source.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hand_json(n: usize, score: f32) -> String {
        let landmarks: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"x":{},"y":{},"z":0.0}}"#, 0.05 * i as f32, 0.5))
            .collect();
        format!(
            r#"{{"handedness":"Right","score":{},"landmarks":[{}]}}"#,
            score,
            landmarks.join(",")
        )
    }

    #[test]
    fn parses_hand_into_pixels() {
        let line = format!(r#"{{"width":960,"height":540,"hands":[{}]}}"#, hand_json(21, 0.9));
        let frame = parse_frame(&line, 0.5).unwrap();
        let hand = frame.hand.unwrap();
        assert_eq!(frame.width, 960);
        assert_eq!(hand.handedness, "Right");
        assert_eq!(hand.landmarks[0], Point::new(0, 270));
        assert_eq!(hand.landmarks[10], Point::new(480, 270));
        // 0.05 * 20 = 1.0 → recortado al último píxel
        assert_eq!(hand.landmarks[20], Point::new(959, 270));
    }

    #[test]
    fn no_hands_means_empty_frame() {
        let frame = parse_frame(r#"{"width":640,"height":480,"hands":[]}"#, 0.5).unwrap();
        assert_eq!(frame, FrameInput::empty(640, 480));

        let frame = parse_frame(r#"{"width":640,"height":480}"#, 0.5).unwrap();
        assert!(frame.hand.is_none());
    }

    #[test]
    fn invalid_hands_are_dropped() {
        let line = format!(
            r#"{{"width":960,"height":540,"hands":[{},{},{}]}}"#,
            hand_json(20, 0.9),
            hand_json(21, 0.2),
            hand_json(21, 0.8)
        );
        let frame = parse_frame(&line, 0.5).unwrap();
        assert_eq!(frame.hand.unwrap().score, 0.8);
    }

    #[test]
    fn stream_skips_blank_lines_and_ends() {
        let data = format!(
            "{}\n\n{}\n",
            r#"{"width":960,"height":540,"hands":[]}"#,
            format!(r#"{{"width":960,"height":540,"hands":[{}]}}"#, hand_json(21, 1.0))
        );
        let mut source = JsonLinesSource::new(Cursor::new(data), 0.5);
        assert!(source.next_frame().unwrap().unwrap().hand.is_none());
        assert!(source.next_frame().unwrap().unwrap().hand.is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let data = "{\"width\":960,\"height\":540}\nnot json\n";
        let mut source = JsonLinesSource::new(Cursor::new(data), 0.5);
        source.next_frame().unwrap();
        match source.next_frame() {
            Err(DetectorError::JsonError { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn detector_args_include_camera_settings() {
        let config = DetectorConfig {
            static_image_mode: true,
            ..DetectorConfig::default()
        };
        let args = config.args();
        assert_eq!(&args[..4], &["--device", "0", "--width", "960"]);
        assert_eq!(args.last().unwrap(), "--static-image-mode");
    }

    fn shell(script: &str) -> DetectorConfig {
        DetectorConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn subprocess_frames_follow_ready() {
        let mut detector = SubprocessDetector::spawn(&shell(
            r#"echo READY; echo '{"width":640,"height":480,"hands":[]}'"#,
        ))
        .unwrap();
        let frame = detector.next_frame().unwrap().unwrap();
        assert_eq!(frame, FrameInput::empty(640, 480));
        assert!(detector.next_frame().unwrap().is_none());
    }

    #[test]
    fn subprocess_without_ready_is_rejected() {
        match SubprocessDetector::spawn(&shell("echo hola")) {
            Err(DetectorError::NotReady(line)) => assert_eq!(line.trim(), "hola"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("detector accepted without READY"),
        }
    }

    #[test]
    fn dropping_process_ends_the_stream() {
        let detector = SubprocessDetector::spawn(&shell("echo READY; exec sleep 30")).unwrap();
        let (process, mut source) = detector.split();
        let started = std::time::Instant::now();
        drop(process);
        assert!(source.next_frame().unwrap().is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn default_detector_script_ships_with_the_crate() {
        let script = &DetectorConfig::default().command[1];
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(script);
        assert!(path.exists(), "missing {}", path.display());
    }
}
