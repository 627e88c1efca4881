use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, never, select, unbounded, Sender};

use manocontrol::config::Config;
use manocontrol::dataset::{DatasetLogger, LoggingMode};
use manocontrol::detector::{DetectorProcess, JsonLinesSource, LandmarkSource, SubprocessDetector};
use manocontrol::dispatcher::{Action, ActionDispatcher, ActionSink, LogActions};
use manocontrol::fps::FpsCounter;
use manocontrol::hid::OsActions;
use manocontrol::keyboard::{self, KeyCommand};
use manocontrol::logger::init_logger;
use manocontrol::pipeline::{load_onnx_pipeline, GestureSession};
use manocontrol::types::FrameInput;

const USAGE: &str = "Uso: manocontrol [--config <archivo.toml>] [--dry-run] [--replay <captura.jsonl>]";

struct Options {
    config: PathBuf,
    dry_run: bool,
    replay: Option<PathBuf>,
}

fn parse_args() -> Result<Options> {
    let mut opts = Options {
        config: PathBuf::from("manocontrol.toml"),
        dry_run: false,
        replay: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                opts.config = args.next().map(PathBuf::from).context(USAGE)?;
            }
            "--replay" => {
                opts.replay = Some(args.next().map(PathBuf::from).context(USAGE)?);
            }
            "--dry-run" => opts.dry_run = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("Argumento desconocido: {}\n{}", other, USAGE),
        }
    }
    Ok(opts)
}

type BoxedSource = Box<dyn LandmarkSource + Send>;

enum Event {
    Key(Option<KeyCommand>),
    Frame(Option<FrameInput>),
}

/// Reenvía las acciones al hilo de salida sin bloquear el bucle de frames
struct ChannelSink(Sender<Action>);

impl ActionSink for ChannelSink {
    fn perform(&mut self, action: Action) -> Result<()> {
        self.0
            .send(action)
            .context("El hilo de acciones ya no está disponible")
    }
}

fn main() -> Result<()> {
    init_logger();
    println!("🖐️  ManoControl - Gestos de mano → ratón y volumen\n");

    let opts = parse_args()?;
    let config = Config::load_or_default(&opts.config)
        .with_context(|| format!("Configuración inválida en {:?}", opts.config))?;

    println!("🔧 Inicializando clasificadores ONNX...");
    let mut pipeline = load_onnx_pipeline(&config.models)?;
    println!("✅ Clasificadores cargados\n");

    // Fuente de landmarks: captura grabada o detector en vivo. El proceso del
    // detector se queda en este hilo para recogerlo al salir.
    let (detector_process, mut source): (Option<DetectorProcess>, BoxedSource) =
        match &opts.replay {
            Some(path) => {
                println!("🎞️  Reproduciendo captura {:?}", path);
                let source = JsonLinesSource::open(path, config.detector.min_detection_confidence)
                    .with_context(|| format!("No se pudo abrir {:?}", path))?;
                (None, Box::new(source) as BoxedSource)
            }
            None => {
                println!(
                    "📷 Cámara {} ({}x{})",
                    config.detector.device, config.detector.width, config.detector.height
                );
                let (process, source) = SubprocessDetector::spawn(&config.detector)
                    .context("No se pudo arrancar el detector")?
                    .split();
                (Some(process), Box::new(source) as BoxedSource)
            }
        };

    let (tx_frame, rx_frame) = bounded::<FrameInput>(4);
    let detector_thread = std::thread::spawn(move || loop {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if tx_frame.send(frame).is_err() {
                    return;
                }
            }
            Ok(None) => {
                log::info!("Fin del stream de landmarks");
                return;
            }
            Err(e) => {
                log::error!("❌ Error en el detector: {}", e);
                return;
            }
        }
    });

    // Hilo de acciones: uinput y amixer pueden tardar, no deben frenar los frames
    let (tx_action, rx_action) = unbounded::<Action>();
    let dry_run = opts.dry_run;
    let pointer = config.pointer;
    let volume = config.volume.clone();
    let action_thread = std::thread::spawn(move || {
        let mut sink: Box<dyn ActionSink> = if dry_run {
            println!("🧪 Modo dry-run: las acciones solo se registran");
            Box::new(LogActions)
        } else {
            match OsActions::new(&pointer, volume) {
                Ok(os) => {
                    println!("✅ HID inicializado (/dev/uinput)");
                    Box::new(os)
                }
                Err(e) => {
                    log::error!("❌ {:#}; las acciones solo se registrarán", e);
                    Box::new(LogActions)
                }
            }
        };

        while let Ok(action) = rx_action.recv() {
            if let Err(e) = sink.perform(action) {
                log::error!("❌ Error ejecutando {:?}: {:#}", action, e);
            }
        }
    });

    let (tx_key, rx_key) = unbounded::<KeyCommand>();
    let mut rx_key = match keyboard::spawn_listener(tx_key) {
        Some(_) => rx_key,
        None => never(),
    };

    println!("✅ Sistema listo\n");
    println!("Teclas:");
    println!("  n / k / h → modo normal / guardar keypoints / guardar historial");
    println!("  0-9       → etiqueta del frame actual");
    println!("  Esc / q   → salir\n");

    let mut session = GestureSession::new();
    let mut dispatcher = ActionDispatcher::new(config.actions, config.pointer);
    let mut actions = ChannelSink(tx_action);
    let dataset = DatasetLogger::new(config.dataset.clone());
    let mut fps = FpsCounter::default();
    let mut mode = LoggingMode::Normal;
    let mut pending_label: Option<u8> = None;
    let mut last_sign = None;
    let mut last_gesture = None;
    let mut frames = 0u64;

    loop {
        let event = select! {
            recv(rx_key) -> msg => Event::Key(msg.ok()),
            recv(rx_frame) -> msg => Event::Frame(msg.ok()),
        };

        let frame = match event {
            Event::Key(Some(KeyCommand::Quit)) => {
                println!("\n👋 Saliendo...");
                break;
            }
            Event::Key(Some(KeyCommand::Mode(new_mode))) => {
                mode = new_mode;
                println!("📝 Modo: {}", mode.as_str());
                continue;
            }
            Event::Key(Some(KeyCommand::Number(n))) => {
                pending_label = Some(n);
                continue;
            }
            Event::Key(None) => {
                rx_key = never();
                continue;
            }
            Event::Frame(None) => {
                println!("\n🏁 Stream terminado tras {} frames", frames);
                break;
            }
            Event::Frame(Some(frame)) => frame,
        };

        frames += 1;
        let current_fps = fps.tick();

        let output = match pipeline.process_frame(&mut session, &frame) {
            Ok(output) => output,
            Err(e) => {
                log::error!("❌ Error clasificando frame {}: {}", frames, e);
                continue;
            }
        };

        if let Err(e) = dataset.log(mode, pending_label.take(), &output) {
            log::error!("❌ Error guardando dataset: {:#}", e);
        }

        if output.hand_sign != last_sign {
            if let Some(sign) = output.hand_sign {
                log::info!(
                    "[POSE] {} ({})",
                    sign.as_str(),
                    output.handedness.as_deref().unwrap_or("?")
                );
            }
            last_sign = output.hand_sign;
        }
        if output.stable_gesture != last_gesture {
            if let Some(gesture) = output.stable_gesture {
                log::info!("[GESTO] {}", gesture.as_str());
            }
            last_gesture = output.stable_gesture;
        }

        dispatcher.dispatch(&output, frame.width, frame.height, &mut actions);

        log::debug!(
            "frame={} fps={:.1} status={:?} history={}",
            frames,
            current_fps,
            output.status,
            session.point_history.len()
        );
    }

    // Matar el detector cierra su stdout; el hilo lector ve EOF o un canal cerrado
    drop(detector_process);
    drop(rx_frame);
    if detector_thread.join().is_err() {
        log::error!("❌ El hilo del detector terminó con pánico");
    }

    drop(actions);
    if action_thread.join().is_err() {
        log::error!("❌ El hilo de acciones terminó con pánico");
    }
    Ok(())
}
