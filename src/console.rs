// src/console.rs
//
// Console output for non-packet lines, with an optional serial log copy.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::io::LineSink;

/// Prints console lines to stdout and optionally appends them to a file.
pub struct ConsoleSink<W: Write = std::io::Stdout> {
    out: W,
    serial_log: Option<BufWriter<File>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
            serial_log: None,
        }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            serial_log: None,
        }
    }

    /// Also append every line to `path` (created if missing).
    pub fn with_serial_log(mut self, path: &Path) -> Result<Self, String> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open serial log {}: {}", path.display(), e))?;
        tlog!("[console] Saving serial log to {}", path.display());
        self.serial_log = Some(BufWriter::new(file));
        Ok(self)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineSink for ConsoleSink<W> {
    fn log_line(&mut self, line: &str) {
        // stdout may be a closed pipe (`| head`); the bridge keeps going
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();

        if let Some(log) = self.serial_log.as_mut() {
            if let Err(e) = writeln!(log, "{}", line).and_then(|_| log.flush()) {
                tlog!("[console] Serial log write failed, disabling it: {}", e);
                self.serial_log = None;
            }
        }
    }
}
