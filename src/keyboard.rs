use std::fs;
use std::path::Path;
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use evdev::{Device, InputEventKind, Key};

use crate::dataset::LoggingMode;

/// Orden de teclado para el bucle principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    Mode(LoggingMode),
    /// Etiqueta 0-9 para el frame actual
    Number(u8),
}

/// Tecla → orden. Las demás teclas se ignoran.
pub fn key_command(key: Key) -> Option<KeyCommand> {
    let command = match key {
        Key::KEY_ESC | Key::KEY_Q => KeyCommand::Quit,
        Key::KEY_N => KeyCommand::Mode(LoggingMode::Normal),
        Key::KEY_K => KeyCommand::Mode(LoggingMode::KeyPoint),
        Key::KEY_H => KeyCommand::Mode(LoggingMode::PointHistory),
        Key::KEY_0 => KeyCommand::Number(0),
        Key::KEY_1 => KeyCommand::Number(1),
        Key::KEY_2 => KeyCommand::Number(2),
        Key::KEY_3 => KeyCommand::Number(3),
        Key::KEY_4 => KeyCommand::Number(4),
        Key::KEY_5 => KeyCommand::Number(5),
        Key::KEY_6 => KeyCommand::Number(6),
        Key::KEY_7 => KeyCommand::Number(7),
        Key::KEY_8 => KeyCommand::Number(8),
        Key::KEY_9 => KeyCommand::Number(9),
        _ => return None,
    };
    Some(command)
}

/// Orden para un evento de tecla según su valor (0 suelta, 1 pulsación,
/// 2 repetición). Mantener un dígito pulsado etiqueta un frame por repetición;
/// las repeticiones de las demás teclas se ignoran.
pub fn event_command(key: Key, value: i32) -> Option<KeyCommand> {
    match (value, key_command(key)?) {
        (1, command) => Some(command),
        (2, command @ KeyCommand::Number(_)) => Some(command),
        _ => None,
    }
}

/// Busca el primer teclado en /dev/input
pub fn find_keyboard() -> Result<Device> {
    for entry in fs::read_dir("/dev/input")?.flatten() {
        let path = entry.path();
        let is_event = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if !is_event {
            continue;
        }
        if let Some(device) = open_keyboard(&path) {
            return Ok(device);
        }
    }
    Err(anyhow!("No se encontró ningún dispositivo de teclado en /dev/input"))
}

fn open_keyboard(path: &Path) -> Option<Device> {
    let device = Device::open(path).ok()?;
    let name = device.name()?.to_lowercase();
    if name.contains("keyboard") || name.contains("at translated") {
        log::info!("✅ Teclado encontrado: {} ({})", name, path.display());
        Some(device)
    } else {
        None
    }
}

/// Lanza el hilo que escucha el teclado. Sin teclado no hay hilo: se avisa y
/// se sigue sin control por teclas.
pub fn spawn_listener(tx: Sender<KeyCommand>) -> Option<JoinHandle<()>> {
    let mut device = match find_keyboard() {
        Ok(d) => d,
        Err(e) => {
            log::warn!("⚠️  {:#}; control por teclado desactivado", e);
            return None;
        }
    };

    Some(std::thread::spawn(move || loop {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(e) => {
                log::error!("❌ Error leyendo teclado: {}", e);
                return;
            }
        };
        for ev in events {
            let InputEventKind::Key(key) = ev.kind() else {
                continue;
            };
            if let Some(command) = event_command(key, ev.value()) {
                if tx.send(command).is_err() {
                    return;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(key_command(Key::KEY_ESC), Some(KeyCommand::Quit));
        assert_eq!(key_command(Key::KEY_Q), Some(KeyCommand::Quit));
        assert_eq!(key_command(Key::KEY_K), Some(KeyCommand::Mode(LoggingMode::KeyPoint)));
        assert_eq!(key_command(Key::KEY_H), Some(KeyCommand::Mode(LoggingMode::PointHistory)));
        assert_eq!(key_command(Key::KEY_N), Some(KeyCommand::Mode(LoggingMode::Normal)));
        assert_eq!(key_command(Key::KEY_0), Some(KeyCommand::Number(0)));
        assert_eq!(key_command(Key::KEY_7), Some(KeyCommand::Number(7)));
        assert_eq!(key_command(Key::KEY_A), None);
    }

    #[test]
    fn held_digit_repeats_but_other_keys_do_not() {
        assert_eq!(event_command(Key::KEY_4, 1), Some(KeyCommand::Number(4)));
        for _ in 0..3 {
            assert_eq!(event_command(Key::KEY_4, 2), Some(KeyCommand::Number(4)));
        }
        assert_eq!(event_command(Key::KEY_4, 0), None);

        assert_eq!(event_command(Key::KEY_K, 1), Some(KeyCommand::Mode(LoggingMode::KeyPoint)));
        assert_eq!(event_command(Key::KEY_K, 2), None);
        assert_eq!(event_command(Key::KEY_Q, 2), None);
        assert_eq!(event_command(Key::KEY_A, 2), None);
    }
}
