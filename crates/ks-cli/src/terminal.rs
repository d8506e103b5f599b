//! Local terminal handling for `--tty` sessions

use std::io;
use std::time::Duration;

use bytes::Bytes;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};

use ks_protocol::TerminalSize;
use ks_stream::{InputEvent, InputSource};

/// Size assumed when the terminal cannot be queried
const FALLBACK_SIZE: TerminalSize = TerminalSize {
    height: 24,
    width: 80,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw mode for the lifetime of the guard
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Current size of the local terminal
pub fn current_size() -> TerminalSize {
    match size() {
        Ok((cols, rows)) => TerminalSize::new(rows, cols),
        Err(_) => FALLBACK_SIZE,
    }
}

/// Whether a key press detaches from the session (Ctrl+])
pub fn is_detach_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char(']')
}

/// Resize-capable input fed by terminal key and resize events
///
/// Puts the terminal into raw mode; it is restored when the returned
/// guard drops. Ctrl+] ends the input, which closes the connection.
pub fn terminal_input() -> io::Result<(RawModeGuard, InputSource)> {
    let guard = RawModeGuard::enable()?;
    let (tx, source) = InputSource::resizable(256, current_size());

    tokio::task::spawn_blocking(move || loop {
        if tx.is_closed() {
            break;
        }

        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!("Failed to poll terminal: {}", e);
                let _ = tx.blocking_send(InputEvent::End);
                break;
            }
        }

        let input = match event::read() {
            Ok(Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            })) => {
                if kind == KeyEventKind::Release {
                    continue;
                }
                if is_detach_key(code, modifiers) {
                    InputEvent::End
                } else {
                    let data = key_to_bytes(code, modifiers);
                    if data.is_empty() {
                        continue;
                    }
                    InputEvent::Data(Bytes::from(data))
                }
            }
            Ok(Event::Paste(text)) => InputEvent::Data(Bytes::from(text.into_bytes())),
            Ok(Event::Resize(cols, rows)) => InputEvent::Resize(TerminalSize::new(rows, cols)),
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Failed to read terminal event: {}", e);
                InputEvent::End
            }
        };

        let end = input == InputEvent::End;
        if tx.blocking_send(input).is_err() || end {
            break;
        }
    });

    Ok((guard, source))
}

/// Convert a key event to the bytes a terminal would send
pub fn key_to_bytes(code: KeyCode, modifiers: KeyModifiers) -> Vec<u8> {
    use KeyCode::*;

    match code {
        Char(c) => {
            if modifiers.contains(KeyModifiers::CONTROL) {
                // Ctrl+A = 0x01, Ctrl+B = 0x02, etc.
                let ctrl_char = (c.to_ascii_lowercase() as u8).wrapping_sub(b'a' - 1);
                vec![ctrl_char]
            } else if modifiers.contains(KeyModifiers::ALT) {
                let mut bytes = vec![0x1b];
                bytes.extend_from_slice(c.to_string().as_bytes());
                bytes
            } else {
                c.to_string().into_bytes()
            }
        }
        Enter => vec![b'\r'],
        Tab => vec![b'\t'],
        BackTab => vec![0x1b, b'[', b'Z'],
        Backspace => vec![0x7f],
        Esc => vec![0x1b],
        Up => vec![0x1b, b'[', b'A'],
        Down => vec![0x1b, b'[', b'B'],
        Right => vec![0x1b, b'[', b'C'],
        Left => vec![0x1b, b'[', b'D'],
        Home => vec![0x1b, b'[', b'H'],
        End => vec![0x1b, b'[', b'F'],
        PageUp => vec![0x1b, b'[', b'5', b'~'],
        PageDown => vec![0x1b, b'[', b'6', b'~'],
        Delete => vec![0x1b, b'[', b'3', b'~'],
        Insert => vec![0x1b, b'[', b'2', b'~'],
        F(n) => match n {
            1 => vec![0x1b, b'O', b'P'],
            2 => vec![0x1b, b'O', b'Q'],
            3 => vec![0x1b, b'O', b'R'],
            4 => vec![0x1b, b'O', b'S'],
            5 => b"\x1b[15~".to_vec(),
            6 => b"\x1b[17~".to_vec(),
            7 => b"\x1b[18~".to_vec(),
            8 => b"\x1b[19~".to_vec(),
            9 => b"\x1b[20~".to_vec(),
            10 => b"\x1b[21~".to_vec(),
            11 => b"\x1b[23~".to_vec(),
            12 => b"\x1b[24~".to_vec(),
            _ => vec![],
        },
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_keys() {
        assert_eq!(
            key_to_bytes(KeyCode::Char('c'), KeyModifiers::CONTROL),
            vec![0x03]
        );
        assert_eq!(
            key_to_bytes(KeyCode::Char('D'), KeyModifiers::CONTROL),
            vec![0x04]
        );
    }

    #[test]
    fn test_plain_and_alt_chars() {
        assert_eq!(key_to_bytes(KeyCode::Char('é'), KeyModifiers::NONE), "é".as_bytes());
        assert_eq!(
            key_to_bytes(KeyCode::Char('x'), KeyModifiers::ALT),
            vec![0x1b, b'x']
        );
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(key_to_bytes(KeyCode::Enter, KeyModifiers::NONE), b"\r");
        assert_eq!(key_to_bytes(KeyCode::Up, KeyModifiers::NONE), b"\x1b[A");
        assert_eq!(key_to_bytes(KeyCode::F(5), KeyModifiers::NONE), b"\x1b[15~");
        assert!(key_to_bytes(KeyCode::F(20), KeyModifiers::NONE).is_empty());
    }

    #[test]
    fn test_detach_key() {
        assert!(is_detach_key(KeyCode::Char(']'), KeyModifiers::CONTROL));
        assert!(!is_detach_key(KeyCode::Char(']'), KeyModifiers::NONE));
    }
}
