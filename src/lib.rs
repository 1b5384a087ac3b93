// src/lib.rs
//
// sniffpipe: serial console monitor that forwards packet records printed by
// the device into a pcap FIFO for Wireshark, and everything else to stdout.

#[macro_use]
pub mod logging;

pub mod bridge;
pub mod capture;
pub mod console;
pub mod io;
pub mod settings;

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use bridge::{Bridge, BridgeStats};
pub use settings::BridgeSettings;

use capture::CaptureSession;
use console::ConsoleSink;
use io::serial::SerialLineTransport;
use io::{send_text, transmit_channel, TransmitSender};

/// Run the bridge until Ctrl-C or until the device goes away.
pub async fn run(settings: BridgeSettings) -> Result<BridgeStats, String> {
    settings.validate()?;

    if let Some(dir) = &settings.log_dir {
        logging::init_file_logging(dir)?;
    }

    // FIFO problems are fatal, report them before touching the device
    let session = CaptureSession::open(settings.capture_config()).map_err(|e| e.to_string())?;

    let mut sink = ConsoleSink::stdout();
    if let Some(path) = &settings.serial_log {
        sink = sink.with_serial_log(path)?;
    }

    let transport =
        SerialLineTransport::open(settings.serial_config()).map_err(|e| e.to_string())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let (transmit_tx, transmit_rx) = transmit_channel();
    let send_timeout = Duration::from_millis(settings.read_timeout_ms) + Duration::from_millis(500);
    spawn_stdin_sender(transmit_tx, shutdown.clone(), send_timeout);

    let worker_flag = shutdown.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        let mut bridge = Bridge::new(transport, sink, session, worker_flag).with_transmit(transmit_rx);
        bridge.run()
    });

    let finished = tokio::select! {
        joined = &mut worker => Some(joined),
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tlog!("[bridge] Interrupted, stopping"),
                Err(e) => tlog!("[bridge] Could not listen for Ctrl-C ({}), stopping", e),
            }
            None
        }
    };
    let joined = match finished {
        Some(joined) => joined,
        None => {
            shutdown.store(true, Ordering::Relaxed);
            worker.await
        }
    };

    logging::stop_file_logging();

    match joined {
        Ok(Ok(stats)) => Ok(stats),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("Bridge worker panicked: {:?}", e)),
    }
}

/// Forward lines typed on stdin to the device.
///
/// The thread is detached: it sits in a blocking stdin read and goes away
/// with the process.
fn spawn_stdin_sender(tx: TransmitSender, shutdown: Arc<AtomicBool>, timeout: Duration) {
    let spawned = std::thread::Builder::new()
        .name("stdin sender".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match line {
                    Ok(text) => {
                        if let Err(e) = send_text(&tx, &text, timeout) {
                            tlog!("[stdin] {}", e);
                        }
                    }
                    Err(e) => {
                        tlog!("[stdin] Read failed, no more input will be sent: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tlog!("[stdin] Could not start input thread: {}", e);
    }
}
