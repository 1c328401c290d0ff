use std::collections::VecDeque;
use std::io::{self, IsTerminal as _};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers as Mod},
    terminal,
};

use crate::device::{Input, StdinInput};

/// Raw terminal mode, held for as long as this guard lives.
///
/// Raw mode is only entered if stdin is an interactive terminal. It is left again on drop, so
/// the terminal is restored however the machine stops (including a panic unwinding past it).
#[derive(Debug)]
pub struct RawMode {
    enabled: bool,
}

impl RawMode {
    pub fn acquire() -> io::Result<Self> {
        if !io::stdin().is_terminal() {
            return Ok(Self { enabled: false });
        }
        terminal::enable_raw_mode()?;
        Ok(Self { enabled: true })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enabled {
            // Nothing left to report a failure to
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Keystrokes from an interactive terminal in raw mode.
///
/// Keys are translated to the bytes a cooked terminal would deliver. Multi-byte characters are
/// queued as UTF-8 and handed out one byte at a time.
///
/// `Ctrl+C` is reported as an [`io::ErrorKind::Interrupted`] error from any method.
#[derive(Debug, Default)]
pub struct TerminalInput {
    pending: VecDeque<u8>,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every event which can be read without waiting.
    fn drain_ready(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            self.accept(event::read()?)?;
        }
        Ok(())
    }

    fn accept(&mut self, event: Event) -> io::Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if let Some(bytes) = key_bytes(key)? {
            self.pending.extend(bytes);
        }
        Ok(())
    }
}

impl Input for TerminalInput {
    fn poll(&mut self) -> io::Result<Option<u8>> {
        self.drain_ready()?;
        Ok(self.pending.pop_front())
    }

    fn read(&mut self) -> io::Result<u8> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            self.accept(event::read()?)?;
        }
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        self.drain_ready()
    }
}

/// Bytes produced by a key press, if any.
fn key_bytes(event: KeyEvent) -> io::Result<Option<Vec<u8>>> {
    if matches!(event.kind, KeyEventKind::Release) {
        return Ok(None);
    }

    let bytes = match (event.modifiers, event.code) {
        // Ctrl+C
        (Mod::CONTROL, KeyCode::Char('c')) => {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "Ctrl+C pressed"));
        }
        // Other control characters, eg. Ctrl+D is EOT
        (Mod::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => {
            vec![ch.to_ascii_lowercase() as u8 & 0x1f]
        }

        (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => vec![b'\n'],
        (_, KeyCode::Backspace) => vec![0x08],
        (_, KeyCode::Tab) => vec![b'\t'],
        (_, KeyCode::Esc) => vec![0x1b],
        (_, KeyCode::Delete) => vec![0x7f],

        // Normal character
        (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => {
            let mut buf = [0u8; 4];
            ch.encode_utf8(&mut buf).as_bytes().to_vec()
        }

        _ => return Ok(None),
    };
    Ok(Some(bytes))
}

/// The process's keyboard: an interactive terminal, or piped stdin.
#[derive(Debug)]
pub enum Keyboard {
    Terminal(TerminalInput),
    Stdin(StdinInput),
}

impl Keyboard {
    /// Terminal events while raw mode is held, plain stdin otherwise.
    pub fn new(raw: &RawMode) -> Self {
        if raw.is_enabled() {
            Self::Terminal(TerminalInput::new())
        } else {
            Self::Stdin(StdinInput::new())
        }
    }
}

impl Input for Keyboard {
    fn poll(&mut self) -> io::Result<Option<u8>> {
        match self {
            Self::Terminal(terminal) => terminal.poll(),
            Self::Stdin(stdin) => stdin.poll(),
        }
    }

    fn read(&mut self) -> io::Result<u8> {
        match self {
            Self::Terminal(terminal) => terminal.read(),
            Self::Stdin(stdin) => stdin.read(),
        }
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        match self {
            Self::Terminal(terminal) => terminal.check_interrupt(),
            Self::Stdin(stdin) => stdin.check_interrupt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(modifiers: Mod, code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn printable_keys() {
        assert_eq!(
            key_bytes(press(Mod::NONE, KeyCode::Char('a'))).unwrap(),
            Some(vec![b'a'])
        );
        assert_eq!(
            key_bytes(press(Mod::SHIFT, KeyCode::Char('A'))).unwrap(),
            Some(vec![b'A'])
        );
        assert_eq!(
            key_bytes(press(Mod::NONE, KeyCode::Enter)).unwrap(),
            Some(vec![b'\n'])
        );
    }

    #[test]
    fn multibyte_characters_are_utf8() {
        assert_eq!(
            key_bytes(press(Mod::NONE, KeyCode::Char('é'))).unwrap(),
            Some(vec![0xc3, 0xa9])
        );
    }

    #[test]
    fn control_keys() {
        assert_eq!(
            key_bytes(press(Mod::CONTROL, KeyCode::Char('d'))).unwrap(),
            Some(vec![0x04])
        );
        let err = key_bytes(press(Mod::CONTROL, KeyCode::Char('c'))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn releases_and_unmapped_keys_are_ignored() {
        let mut release = press(Mod::NONE, KeyCode::Char('a'));
        release.kind = KeyEventKind::Release;
        assert_eq!(key_bytes(release).unwrap(), None);
        assert_eq!(key_bytes(press(Mod::NONE, KeyCode::Left)).unwrap(), None);
    }

    #[test]
    fn queued_bytes_are_read_in_order() {
        let mut input = TerminalInput::new();
        input
            .accept(Event::Key(press(Mod::NONE, KeyCode::Char('é'))))
            .unwrap();
        input.accept(Event::FocusGained).unwrap();
        assert_eq!(input.read().unwrap(), 0xc3);
        assert_eq!(input.read().unwrap(), 0xa9);
    }
}
