//! Purpose: Read a file as a push-driven sequence of raw lines that can be paused and resumed.
//! Exports: `LineSource`, `SourceControl`, `RawLine`.
//! Role: Streaming Source Reader; knows nothing about schemas or records.
//! Invariants: Lines are delivered in file order with the record separator stripped.
//! Invariants: Production halts before the next line while paused; no line is lost.
//! Invariants: The end callback fires exactly once, after the last line and after the file is closed.
//! Invariants: A closed control stops production at the next line boundary without firing the end callback.

use crate::core::error::{Error, ErrorKind};
use bstr::ByteSlice;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

const READ_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
struct Gate {
    paused: bool,
    closed: bool,
}

#[derive(Debug, Default)]
struct GateState {
    gate: Mutex<Gate>,
    changed: Condvar,
}

/// Shared pause/resume/close switch for one `LineSource`.
#[derive(Clone, Debug, Default)]
pub struct SourceControl {
    inner: Arc<GateState>,
}

impl SourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        let mut gate = self.lock();
        if !gate.paused {
            trace!("source paused");
            gate.paused = true;
        }
    }

    pub fn resume(&self) {
        let mut gate = self.lock();
        if gate.paused {
            trace!("source resumed");
            gate.paused = false;
            self.inner.changed.notify_all();
        }
    }

    /// Permanently stops production; wakes a paused source so it can release its file.
    pub fn close(&self) {
        let mut gate = self.lock();
        gate.closed = true;
        self.inner.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Blocks while paused. Returns `false` once the control is closed.
    fn wait_until_open(&self) -> bool {
        let gate = self.lock();
        let gate = self
            .inner
            .changed
            .wait_while(gate, |gate| gate.paused && !gate.closed)
            .unwrap_or_else(PoisonError::into_inner);
        !gate.closed
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawLine<'a> {
    /// 1-based position in the file, counting blank lines.
    pub number: u64,
    pub text: &'a str,
}

pub struct LineSource {
    reader: BufReader<File>,
    path: PathBuf,
    control: SourceControl,
}

impl LineSource {
    pub fn open(path: impl AsRef<Path>, control: SourceControl) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| open_error(path, err))?;
        debug!(path = %path.display(), "opened line source");
        Ok(Self {
            reader: BufReader::with_capacity(READ_BUFFER_BYTES, file),
            path: path.to_path_buf(),
            control,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn control(&self) -> &SourceControl {
        &self.control
    }

    /// Pushes every line to `on_line`, then closes the file and calls `on_end`.
    ///
    /// Returns early, without calling `on_end`, when `on_line` fails, a read fails,
    /// or the control is closed.
    pub fn run<L, E>(self, mut on_line: L, on_end: E) -> Result<(), Error>
    where
        L: FnMut(RawLine<'_>) -> Result<(), Error>,
        E: FnOnce(),
    {
        let Self {
            mut reader,
            path,
            control,
        } = self;
        let mut buf = Vec::with_capacity(256);
        let mut number = 0u64;

        loop {
            if !control.wait_until_open() {
                debug!(path = %path.display(), line = number, "line source closed early");
                return Ok(());
            }

            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read line")
                    .with_path(&path)
                    .with_line(number + 1)
                    .with_source(err)
            })?;
            if read == 0 {
                break;
            }
            number += 1;

            let bytes = strip_separator(&buf);
            let text = bytes.to_str().map_err(|err| {
                Error::new(ErrorKind::Decode)
                    .with_message("line is not valid UTF-8")
                    .with_path(&path)
                    .with_line(number)
                    .with_source(err)
            })?;
            on_line(RawLine { number, text })?;
        }

        drop(reader);
        debug!(path = %path.display(), lines = number, "line source finished");
        on_end();
        Ok(())
    }
}

fn strip_separator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn open_error(path: &Path, err: io::Error) -> Error {
    let message = match err.kind() {
        io::ErrorKind::NotFound => format!("file path was invalid: '{}'", path.display()),
        _ => format!("failed to open '{}'", path.display()),
    };
    Error::new(ErrorKind::Config)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}
