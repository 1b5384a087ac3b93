// src/logging.rs
//
// Bridge diagnostics. Every `tlog!` line goes to stderr with a local
// `HH:MM:SS.mmm` stamp. With `--log-dir` the same lines are also appended
// to a per-run file, and `sniffpipe.log` in that directory points at the
// newest run.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the symlink to the current run's log file
pub const LATEST_LOG_LINK: &str = "sniffpipe.log";

struct RunLog {
    path: PathBuf,
    file: File,
}

static RUN_LOG: Mutex<Option<RunLog>> = Mutex::new(None);

fn stamp() -> impl fmt::Display {
    chrono::Local::now().format("%H:%M:%S%.3f")
}

/// Write one diagnostic line. Use `tlog!` rather than calling this.
#[doc(hidden)]
pub fn emit(args: fmt::Arguments<'_>) {
    let line = format!("{} {}", stamp(), args);
    eprintln!("{}", line);

    if let Ok(mut guard) = RUN_LOG.lock() {
        let failed = match guard.as_mut() {
            Some(log) => writeln!(log.file, "{}", line).is_err(),
            None => false,
        };
        if failed {
            eprintln!("{} [logging] Log file write failed, file logging off", stamp());
            *guard = None;
        }
    }
}

/// Start appending diagnostics to a new file in `dir`.
///
/// Returns the path of the file. Replaces any file logging already running.
pub fn init_file_logging(dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log dir {}: {}", dir.display(), e))?;

    let name = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-sniffpipe.log")
        .to_string();
    let path = dir.join(&name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;

    #[cfg(unix)]
    {
        let link = dir.join(LATEST_LOG_LINK);
        let _ = std::fs::remove_file(&link);
        if let Err(e) = std::os::unix::fs::symlink(&name, &link) {
            eprintln!("{} [logging] No {} link: {}", stamp(), LATEST_LOG_LINK, e);
        }
    }

    if let Ok(mut guard) = RUN_LOG.lock() {
        *guard = Some(RunLog {
            path: path.clone(),
            file,
        });
    }
    crate::tlog!("[logging] Logging to {}", path.display());
    Ok(path)
}

/// Path of the file currently receiving diagnostics, if any.
pub fn log_file_path() -> Option<PathBuf> {
    RUN_LOG
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|log| log.path.clone()))
}

pub fn stop_file_logging() {
    let stopped = RUN_LOG
        .lock()
        .map(|mut guard| guard.take())
        .ok()
        .flatten();
    if let Some(log) = stopped {
        eprintln!("{} [logging] Closed {}", stamp(), log.path.display());
    }
}

/// Timestamped diagnostic line to stderr, and to the run log when enabled.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::logging::emit(format_args!($($arg)*))
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// File logging is process-wide; tests that turn it on take this lock.
    pub(crate) static FILE_LOGGING: Mutex<()> = Mutex::new(());

    pub(crate) fn file_logging_guard() -> std::sync::MutexGuard<'static, ()> {
        FILE_LOGGING.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_file_logging_writes_and_links() {
        let _guard = file_logging_guard();
        let dir = tempfile::tempdir().unwrap();

        let path = init_file_logging(dir.path()).unwrap();
        assert_eq!(log_file_path(), Some(path.clone()));
        crate::tlog!("[test] hello from the log");
        stop_file_logging();
        assert_eq!(log_file_path(), None);

        let contents = std::fs::read_to_string(dir.path().join(LATEST_LOG_LINK)).unwrap();
        assert!(contents.contains("[test] hello from the log"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn test_bad_log_dir_is_reported() {
        let _guard = file_logging_guard();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        assert!(init_file_logging(&blocker.join("logs")).is_err());
        assert_eq!(log_file_path(), None);
    }
}
