// src/capture/fifo.rs
//
// Named pipe (FIFO) sink that Wireshark reads the pcap stream from.
//
// State machine:
//
//   Uncreated --create--> Created --open ok--> Open --write ok--> Streaming
//                            ^  |                |                   |
//                            |  +--no reader-----+                   |
//                            +-------------- reader closed (EPIPE) --+
//
//   Uncreated --path holds a non-FIFO / mkfifo fails--> Unusable
//
// Opens are non-blocking so the bridge never waits for a reader. Writes while
// no reader is attached are discarded.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use super::CaptureError;

/// Permission bits for a FIFO we create (before umask): owner read/write only
const FIFO_MODE: libc::mode_t = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoState {
    /// mkfifo not attempted yet
    Uncreated,
    /// FIFO node exists, no write handle
    Created,
    /// Write handle just opened, nothing written on it yet
    Open,
    /// At least one record written on the current handle
    Streaming,
    /// The path can not be used for this session
    Unusable,
}

/// Result of trying to get a write handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A handle was already open
    AlreadyOpen,
    /// A reader is attached and a fresh handle was opened; a new stream starts
    Opened,
    /// Nobody is reading, nothing to write to
    NoReader,
    /// The sink is in the Unusable state
    Unusable,
}

/// Result of writing one record
#[derive(Debug)]
pub enum WriteOutcome {
    /// All bytes handed to the pipe
    Written(usize),
    /// Reader closed its end; the handle was dropped
    Disconnected,
    /// Any other failure; the record was dropped, state unchanged
    Failed(io::Error),
    /// No handle to write to
    NotOpen,
}

/// Owner of the FIFO at one path.
pub struct PipeSink {
    path: PathBuf,
    state: FifoState,
    fifo: Option<File>,
    /// Why the sink went Unusable, replayed by later create() calls
    failure: Option<CaptureError>,
}

impl PipeSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: FifoState::Uncreated,
            fifo: None,
            failure: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> FifoState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.fifo.is_some()
    }

    /// Create the FIFO node, or adopt an existing one.
    ///
    /// Only the first call does any work; later calls return the cached
    /// outcome. A non-FIFO at the path or any other mkfifo failure moves the
    /// sink to `Unusable` and is returned as an error, the same error on
    /// every call.
    pub fn create(&mut self) -> Result<(), CaptureError> {
        match self.state {
            FifoState::Uncreated => {}
            FifoState::Unusable => {
                return Err(match &self.failure {
                    Some(err) => replay(err),
                    None => CaptureError::NotAFifo(self.path.clone()),
                })
            }
            _ => return Ok(()),
        }

        match self.make_or_adopt() {
            Ok(()) => {
                self.state = FifoState::Created;
                Ok(())
            }
            Err(err) => {
                tlog!("[fifo] {}", err);
                self.state = FifoState::Unusable;
                self.failure = Some(replay(&err));
                Err(err)
            }
        }
    }

    fn make_or_adopt(&self) -> Result<(), CaptureError> {
        match make_fifo(&self.path) {
            Ok(()) => {
                tlog!("[fifo] Created FIFO queue {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let meta = std::fs::metadata(&self.path)
                    .map_err(|e| CaptureError::StatFailed(self.path.clone(), e))?;
                if !meta.file_type().is_fifo() {
                    return Err(CaptureError::NotAFifo(self.path.clone()));
                }
                tlog!(
                    "[fifo] Queue {} already exists - reusing it",
                    self.path.display()
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                Err(CaptureError::InvalidPath(self.path.clone()))
            }
            Err(e) => Err(CaptureError::CreateFailed(self.path.clone(), e)),
        }
    }

    /// Make sure a write handle exists, opening one if a reader is attached.
    pub fn ensure_open(&mut self) -> OpenOutcome {
        match self.state {
            FifoState::Open | FifoState::Streaming => return OpenOutcome::AlreadyOpen,
            FifoState::Unusable => return OpenOutcome::Unusable,
            FifoState::Uncreated => {
                if self.create().is_err() {
                    return OpenOutcome::Unusable;
                }
            }
            FifoState::Created => {}
        }

        let opened = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path);

        match opened {
            Ok(file) => {
                tlog!("[fifo] Reader attached to {}", self.path.display());
                self.fifo = Some(file);
                self.state = FifoState::Open;
                OpenOutcome::Opened
            }
            Err(e) if e.raw_os_error() == Some(libc::ENXIO) => OpenOutcome::NoReader,
            Err(e) => {
                // Same handling as "no reader": try again on the next frame
                tlog!(
                    "[fifo] Could not open FIFO queue {}: {}",
                    self.path.display(),
                    e
                );
                OpenOutcome::NoReader
            }
        }
    }

    /// Write one complete record to the open handle.
    pub fn write(&mut self, record: &[u8]) -> WriteOutcome {
        let Some(fifo) = self.fifo.as_mut() else {
            return WriteOutcome::NotOpen;
        };

        // A full pipe can fail write_all after part of the record went out.
        // The reader then sees a misaligned stream until it reconnects.
        match fifo.write_all(record).and_then(|_| fifo.flush()) {
            Ok(()) => {
                self.state = FifoState::Streaming;
                WriteOutcome::Written(record.len())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tlog!("[fifo] Remote end stopped reading {}", self.path.display());
                self.close();
                WriteOutcome::Disconnected
            }
            Err(e) => {
                tlog!(
                    "[fifo] Write to {} failed, dropping record: {}",
                    self.path.display(),
                    e
                );
                WriteOutcome::Failed(e)
            }
        }
    }

    /// Release the write handle. The FIFO node itself stays in place.
    pub fn close(&mut self) {
        if self.fifo.take().is_some() {
            self.state = FifoState::Created;
        }
    }
}

/// Same error again; io::Error is not Clone
fn replay(err: &CaptureError) -> CaptureError {
    fn copy_io(e: &io::Error) -> io::Error {
        match e.raw_os_error() {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(e.kind(), e.to_string()),
        }
    }

    match err {
        CaptureError::NotAFifo(p) => CaptureError::NotAFifo(p.clone()),
        CaptureError::CreateFailed(p, e) => CaptureError::CreateFailed(p.clone(), copy_io(e)),
        CaptureError::StatFailed(p, e) => CaptureError::StatFailed(p.clone(), copy_io(e)),
        CaptureError::InvalidPath(p) => CaptureError::InvalidPath(p.clone()),
    }
}

/// mkfifo(3), reported as an io::Error
fn make_fifo(path: &Path) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated string that outlives the call
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    /// Open the read end without blocking, like a capture tool would
    pub(crate) fn open_reader(path: &Path) -> File {
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .unwrap()
    }

    /// Drain whatever is currently buffered in the pipe
    pub(crate) fn drain(reader: &mut File) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("read failed: {}", e),
            }
        }
        out
    }

    #[test]
    fn test_create_makes_a_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);

        assert_eq!(sink.state(), FifoState::Uncreated);
        sink.create().unwrap();
        assert_eq!(sink.state(), FifoState::Created);
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
    }

    #[test]
    fn test_create_is_idempotent_on_existing_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");

        let mut first = PipeSink::new(&path);
        first.create().unwrap();
        let inode = std::fs::metadata(&path).unwrap().ino();

        // Same sink again, then a fresh sink on the same path
        first.create().unwrap();
        let mut second = PipeSink::new(&path);
        second.create().unwrap();

        assert_eq!(second.state(), FifoState::Created);
        assert_eq!(std::fs::metadata(&path).unwrap().ino(), inode);
    }

    #[test]
    fn test_regular_file_at_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        std::fs::write(&path, b"not a pipe").unwrap();

        let mut sink = PipeSink::new(&path);
        assert!(matches!(sink.create(), Err(CaptureError::NotAFifo(_))));
        assert_eq!(sink.state(), FifoState::Unusable);
        assert_eq!(sink.ensure_open(), OpenOutcome::Unusable);
        // The file is left alone
        assert_eq!(std::fs::read(&path).unwrap(), b"not a pipe".to_vec());
    }

    #[test]
    fn test_missing_parent_directory_fails_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sniff");

        let mut sink = PipeSink::new(&path);
        assert!(matches!(sink.create(), Err(CaptureError::CreateFailed(_, _))));
        assert_eq!(sink.state(), FifoState::Unusable);

        // Asking again reports the same failure, not a bogus "not a FIFO"
        match sink.create() {
            Err(CaptureError::CreateFailed(p, e)) => {
                assert_eq!(p, path);
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected CreateFailed, got {:?}", other),
        }
        assert_eq!(sink.ensure_open(), OpenOutcome::Unusable);
    }

    #[test]
    fn test_fifo_is_private_to_owner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);
        sink.create().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode {:o}", mode & 0o777);
    }

    #[test]
    fn test_open_without_reader_stays_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PipeSink::new(dir.path().join("sniff"));
        sink.create().unwrap();

        assert_eq!(sink.ensure_open(), OpenOutcome::NoReader);
        assert_eq!(sink.state(), FifoState::Created);
        assert!(matches!(sink.write(b"data"), WriteOutcome::NotOpen));
    }

    #[test]
    fn test_open_creates_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);

        assert_eq!(sink.ensure_open(), OpenOutcome::NoReader);
        assert_eq!(sink.state(), FifoState::Created);
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
    }

    #[test]
    fn test_write_reaches_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);
        sink.create().unwrap();

        let mut reader = open_reader(&path);
        assert_eq!(sink.ensure_open(), OpenOutcome::Opened);
        assert_eq!(sink.state(), FifoState::Open);
        assert_eq!(sink.ensure_open(), OpenOutcome::AlreadyOpen);

        assert!(matches!(sink.write(b"hello"), WriteOutcome::Written(5)));
        assert_eq!(sink.state(), FifoState::Streaming);
        assert_eq!(drain(&mut reader), b"hello".to_vec());
    }

    #[test]
    fn test_reader_disconnect_returns_to_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);
        sink.create().unwrap();

        let reader = open_reader(&path);
        assert_eq!(sink.ensure_open(), OpenOutcome::Opened);
        assert!(matches!(sink.write(b"one"), WriteOutcome::Written(3)));
        drop(reader);

        assert!(matches!(sink.write(b"two"), WriteOutcome::Disconnected));
        assert_eq!(sink.state(), FifoState::Created);
        assert!(!sink.is_open());

        // A new reader gets a new handle
        let _reader = open_reader(&path);
        assert_eq!(sink.ensure_open(), OpenOutcome::Opened);
    }

    #[test]
    fn test_close_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sniff");
        let mut sink = PipeSink::new(&path);
        sink.create().unwrap();
        let mut reader = open_reader(&path);

        assert_eq!(sink.ensure_open(), OpenOutcome::Opened);
        sink.close();
        assert_eq!(sink.state(), FifoState::Created);
        // Writer gone: reader sees EOF
        assert!(drain(&mut reader).is_empty());
    }
}
