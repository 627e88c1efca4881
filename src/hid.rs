use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use uinput::device::Device;
use uinput::event::absolute;
use uinput::event::controller;

use crate::dispatcher::{Action, ActionSink};
use crate::mouse_filter::PointerConfig;

/// Puntero virtual con posición absoluta y botón izquierdo
pub struct HidOutput {
    dev: Device,
}

impl HidOutput {
    pub fn new(pointer: &PointerConfig) -> Result<Self, uinput::Error> {
        let dev = uinput::default()?
            .name("manocontrol-pointer")?
            .event(uinput::event::Controller::Mouse(controller::Mouse::Left))?
            .event(uinput::event::Absolute::Position(absolute::Position::X))?
            .min(0)
            .max(pointer.screen_width.saturating_sub(1) as i32)
            .event(uinput::event::Absolute::Position(absolute::Position::Y))?
            .min(0)
            .max(pointer.screen_height.saturating_sub(1) as i32)
            .create()?;

        Ok(HidOutput { dev })
    }

    fn sync(&mut self) -> Result<(), uinput::Error> {
        self.dev.synchronize()
    }

    /// Lleva el cursor a (x, y) en píxeles de pantalla
    pub fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), uinput::Error> {
        self.dev.send(absolute::Position::X, x)?;
        self.dev.send(absolute::Position::Y, y)?;
        self.sync()
    }

    /// Hace un click simple (press + release)
    pub fn click_left(&mut self) -> Result<(), uinput::Error> {
        self.dev
            .press(&controller::Controller::Mouse(controller::Mouse::Left))?;
        self.sync()?;
        std::thread::sleep(Duration::from_millis(10));
        self.dev
            .release(&controller::Controller::Mouse(controller::Mouse::Left))?;
        self.sync()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Dispositivo de amixer (-D)
    pub mixer_device: String,
    pub control: String,
    pub step_percent: u8,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            mixer_device: "pulse".to_string(),
            control: "Master".to_string(),
            step_percent: 5,
        }
    }
}

/// Control de volumen vía `amixer`
pub struct VolumeControl {
    config: VolumeConfig,
}

impl VolumeControl {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    /// Argumentos de amixer para un paso arriba (`+`) o abajo (`-`)
    pub fn amixer_args(&self, up: bool) -> Vec<String> {
        let sign = if up { '+' } else { '-' };
        vec![
            "-D".to_string(),
            self.config.mixer_device.clone(),
            "sset".to_string(),
            self.config.control.clone(),
            format!("{}%{}", self.config.step_percent, sign),
        ]
    }

    pub fn step(&mut self, up: bool) -> anyhow::Result<()> {
        let status = Command::new("amixer")
            .args(self.amixer_args(up))
            .status()
            .context("No se pudo ejecutar amixer")?;
        if !status.success() {
            bail!("amixer terminó con {}", status);
        }
        Ok(())
    }
}

/// Sink real: uinput para el puntero, amixer para el volumen
pub struct OsActions {
    hid: HidOutput,
    volume: VolumeControl,
}

impl OsActions {
    pub fn new(pointer: &PointerConfig, volume: VolumeConfig) -> anyhow::Result<Self> {
        let hid = HidOutput::new(pointer)
            .map_err(|e| anyhow!("No se pudo inicializar HID (/dev/uinput): {}", e))?;
        Ok(Self {
            hid,
            volume: VolumeControl::new(volume),
        })
    }
}

impl ActionSink for OsActions {
    fn perform(&mut self, action: Action) -> anyhow::Result<()> {
        match action {
            Action::MoveCursor { x, y } => self
                .hid
                .move_cursor(x, y)
                .map_err(|e| anyhow!("Error moviendo cursor: {}", e)),
            Action::Click => self
                .hid
                .click_left()
                .map_err(|e| anyhow!("Error en click: {}", e)),
            Action::VolumeUp => self.volume.step(true),
            Action::VolumeDown => self.volume.step(false),
        }
    }
}
