//! Character devices the machine talks to.
//!
//! The machine never touches stdin/stdout directly; it is handed an [`Input`] and an [`Output`]
//! at construction. The binary wires these to the terminal (see [`crate::term`]), while tests use
//! [`Scripted`] and [`Recorder`].

use std::collections::VecDeque;
use std::io::{self, Read, Write as _};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Source of keystrokes.
pub trait Input {
    /// Take one character if one is ready, without blocking.
    fn poll(&mut self) -> io::Result<Option<u8>>;

    /// Block until a character is available and take it.
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] if no character will ever arrive.
    fn read(&mut self) -> io::Result<u8>;

    /// Check for a pending external interrupt without consuming characters.
    ///
    /// An interrupt is reported as an error of kind [`io::ErrorKind::Interrupted`].
    fn check_interrupt(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink for characters written by the running program.
pub trait Output {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn write_str(&mut self, string: &str) -> io::Result<()> {
        for byte in string.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Input + ?Sized> Input for Box<T> {
    fn poll(&mut self) -> io::Result<Option<u8>> {
        (**self).poll()
    }
    fn read(&mut self) -> io::Result<u8> {
        (**self).read()
    }
    fn check_interrupt(&mut self) -> io::Result<()> {
        (**self).check_interrupt()
    }
}

impl<T: Output + ?Sized> Output for Box<T> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }
    fn write_str(&mut self, string: &str) -> io::Result<()> {
        (**self).write_str(string)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Input fed from a fixed sequence of bytes.
///
/// Every byte is immediately 'ready'. Once exhausted, `poll` reports nothing ready and `read`
/// reports end of input.
#[derive(Debug, Default)]
pub struct Scripted {
    pending: VecDeque<u8>,
    /// Amount of times the device was polled.
    polls: usize,
    interrupt: bool,
}

impl Scripted {
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            pending: bytes.as_ref().iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Report an interrupt on the next check.
    pub fn interrupt(mut self) -> Self {
        self.interrupt = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Input for Scripted {
    fn poll(&mut self) -> io::Result<Option<u8>> {
        self.polls += 1;
        Ok(self.pending.pop_front())
    }

    fn read(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "end of scripted input"))
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        if self.interrupt {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "scripted interrupt"));
        }
        Ok(())
    }
}

/// Output which keeps everything written to it.
#[derive(Debug, Default)]
pub struct Recorder {
    bytes: Vec<u8>,
    flushes: usize,
}

impl Recorder {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Written bytes, lossily decoded as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Output for Recorder {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.bytes.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Stdin which is not attached to a terminal, i.e. piped.
///
/// A background thread reads the pipe into a channel, so [`Input::poll`] only looks at what has
/// already arrived and never waits on a producer which keeps the pipe open.
#[derive(Debug)]
pub struct StdinInput {
    bytes: Receiver<io::Result<u8>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self::spawn(io::stdin())
    }

    /// Read `source` on its own thread. The channel disconnects at EOF or after an error.
    pub fn spawn<R: Read + Send + 'static>(mut source: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0; 1];
            loop {
                let byte = match source.read(&mut buf) {
                    Ok(0) => return,
                    Ok(_) => Ok(buf[0]),
                    // Signal delivered mid-read, not a user interrupt
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = byte.is_err();
                if tx.send(byte).is_err() || failed {
                    return;
                }
            }
        });
        Self { bytes: rx }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for StdinInput {
    fn poll(&mut self) -> io::Result<Option<u8>> {
        match self.bytes.try_recv() {
            Ok(byte) => byte.map(Some),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn read(&mut self) -> io::Result<u8> {
        self.bytes
            .recv()
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")))
    }
}

/// Stdout, translating `\n` to `\r\n` while the terminal is in raw mode.
#[derive(Debug)]
pub struct StdoutOutput {
    stdout: io::Stdout,
    raw: bool,
}

impl StdoutOutput {
    pub fn new(raw: bool) -> Self {
        Self {
            stdout: io::stdout(),
            raw,
        }
    }
}

impl Output for StdoutOutput {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if self.raw && byte == b'\n' {
            return self.stdout.write_all(b"\r\n");
        }
        self.stdout.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_drains_in_order() {
        let mut input = Scripted::new("ab");
        assert_eq!(input.poll().unwrap(), Some(b'a'));
        assert_eq!(input.read().unwrap(), b'b');
        assert_eq!(input.poll().unwrap(), None);
        assert_eq!(input.polls(), 2);

        let err = input.read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn scripted_interrupt() {
        let mut input = Scripted::new("").interrupt();
        let err = input.check_interrupt().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn recorder_keeps_bytes() {
        let mut output = Recorder::default();
        output.write_byte(b'>').unwrap();
        output.write_str(" hi\n").unwrap();
        output.flush().unwrap();
        assert_eq!(output.bytes(), b"> hi\n");
        assert_eq!(output.text(), "> hi\n");
        assert_eq!(output.flushes(), 1);
    }

    /// A pipe whose writer decides when bytes arrive and when it closes.
    struct HeldPipe(Receiver<u8>);

    impl Read for HeldPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn stdin_poll_does_not_wait_on_open_pipe() {
        let (writer, pipe) = mpsc::channel();
        let mut input = StdinInput::spawn(HeldPipe(pipe));

        // Nothing written yet, writer still open
        assert_eq!(input.poll().unwrap(), None);
        assert_eq!(input.poll().unwrap(), None);

        writer.send(b'x').unwrap();
        assert_eq!(input.read().unwrap(), b'x');

        drop(writer);
        let err = input.read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(input.poll().unwrap(), None);
    }

    #[test]
    fn stdin_poll_sees_arrived_bytes() {
        let mut input = StdinInput::spawn(&b"ok"[..]);
        assert_eq!(input.read().unwrap(), b'o');
        // The reader thread may not have caught up yet
        let byte = loop {
            if let Some(byte) = input.poll().unwrap() {
                break byte;
            }
            thread::yield_now();
        };
        assert_eq!(byte, b'k');
    }

    #[test]
    fn boxed_devices_forward() {
        let mut input: Box<dyn Input> = Box::new(Scripted::new("z"));
        assert_eq!(input.read().unwrap(), b'z');
        let mut output: Box<dyn Output> = Box::new(Recorder::default());
        output.write_str("ok").unwrap();
    }
}
