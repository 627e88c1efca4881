use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use manocontrol::config::Config;
use manocontrol::detector::{JsonLinesSource, LandmarkSource};
use manocontrol::dispatcher::ActionDispatcher;
use manocontrol::pipeline::{load_onnx_pipeline, FrameOutput, GestureSession, HandStatus};

const USAGE: &str = "Uso: replay_jsonl [--config <archivo.toml>] [--dump-features] <captura.jsonl>";

struct ReplayOptions {
    config: PathBuf,
    dump_features: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut opts = ReplayOptions {
        config: PathBuf::from("manocontrol.toml"),
        dump_features: false,
    };
    let mut capture: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-features" => opts.dump_features = true,
            "--config" => opts.config = args.next().map(PathBuf::from).context(USAGE)?,
            _ => {
                if capture.is_some() {
                    bail!(USAGE);
                }
                capture = Some(PathBuf::from(arg));
            }
        }
    }

    let capture = capture.ok_or_else(|| anyhow!("Debes especificar una captura .jsonl\n{}", USAGE))?;
    Ok((capture, opts))
}

fn describe(output: &FrameOutput) -> String {
    match output.status {
        HandStatus::NoHand => "sin mano".to_string(),
        HandStatus::Degenerate => "landmarks degenerados".to_string(),
        HandStatus::Classified => {
            let sign = output.hand_sign.map(|s| s.as_str()).unwrap_or("-");
            let finger = output
                .finger
                .map(|f| format!("{} ({:.2})", f.gesture.as_str(), f.prediction.score))
                .unwrap_or_else(|| "-".to_string());
            format!("{:<8} dedo: {}", sign, finger)
        }
    }
}

fn dump(title: &str, values: &[f32]) {
    println!("    {} ({} valores):", title, values.len());
    for (idx, value) in values.iter().enumerate() {
        println!("      {:03}: {:>10.6}", idx, value);
    }
}

fn main() -> Result<()> {
    let (capture, opts) = parse_args()?;
    println!("🎞️  Reproduciendo landmarks desde {:?}", capture);

    let config = Config::load_or_default(&opts.config)?;
    let mut pipeline = load_onnx_pipeline(&config.models)?;
    let mut source = JsonLinesSource::open(&capture, config.detector.min_detection_confidence)
        .with_context(|| format!("No se pudo abrir {:?}", capture))?;

    let mut session = GestureSession::new();
    let mut dispatcher = ActionDispatcher::new(config.actions, config.pointer);
    let mut frames = 0usize;

    while let Some(frame) = source.next_frame()? {
        frames += 1;
        let output = match pipeline.process_frame(&mut session, &frame) {
            Ok(output) => output,
            Err(e) => {
                println!("{:>5}: ❌ {}", frames, e);
                continue;
            }
        };

        let stable = output.stable_gesture.map(|g| g.as_str()).unwrap_or("-");
        let actions = dispatcher.decide(&output, frame.width, frame.height);
        println!(
            "{:>5}: {:<32} estable: {:<18} acciones: {:?}",
            frames,
            describe(&output),
            stable,
            actions
        );

        if opts.dump_features {
            if let Some(features) = output.keypoint_features.as_deref() {
                dump("keypoints", features);
            }
            if let Some(features) = output.history_features.as_deref() {
                dump("historial", features);
            }
        }
    }

    println!("\n🏁 {} frames procesados", frames);
    Ok(())
}
