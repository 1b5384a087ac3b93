// src/bridge.rs
//
// Bridge worker: the single thread that reads console lines, routes packet
// records into the capture session and everything else to the line sink.
//
// One iteration:
//   1. stop if the shutdown flag is set
//   2. write pending send-text requests to the device
//   3. read one line (bounded by the transport timeout) and dispatch it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::{extract, CaptureSession, Extracted, FrameOutcome};
use crate::io::{now_us, IoError, LineSink, LineTransport, TransmitReceiver};

/// Running counters for one bridge session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub lines_logged: u64,
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub frames_written: u64,
    /// Decoded fine but nobody was reading
    pub frames_discarded: u64,
    pub bytes_written: u64,
    pub reader_disconnects: u64,
    pub texts_sent: u64,
}

impl BridgeStats {
    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Dropped(_) => {
                self.frames_dropped += 1;
                return;
            }
            FrameOutcome::Written(n) => {
                self.frames_written += 1;
                self.bytes_written += *n as u64;
            }
            FrameOutcome::ReaderGone => {
                self.reader_disconnects += 1;
                self.frames_discarded += 1;
            }
            FrameOutcome::NoReader | FrameOutcome::Unusable => self.frames_discarded += 1,
            FrameOutcome::WriteFailed => self.frames_dropped += 1,
        }
        self.frames_decoded += 1;
    }
}

pub struct Bridge<T: LineTransport, S: LineSink> {
    transport: T,
    sink: S,
    session: CaptureSession,
    transmit_rx: Option<TransmitReceiver>,
    shutdown: Arc<AtomicBool>,
    stats: BridgeStats,
}

impl<T: LineTransport, S: LineSink> Bridge<T, S> {
    pub fn new(transport: T, sink: S, session: CaptureSession, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            transport,
            sink,
            session,
            transmit_rx: None,
            shutdown,
            stats: BridgeStats::default(),
        }
    }

    /// Accept send-text requests from the control surface
    pub fn with_transmit(mut self, rx: TransmitReceiver) -> Self {
        self.transmit_rx = Some(rx);
        self
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Route one console line.
    pub fn dispatch_line(&mut self, line: &str) {
        match extract(line, self.session.marker()) {
            Extracted::Packet(payload) => {
                let outcome = self.session.handle_payload(payload);
                self.stats.record(&outcome);
            }
            Extracted::Log(text) => {
                self.sink.log_line(text);
                self.stats.lines_logged += 1;
            }
        }
    }

    fn process_transmits(&mut self) {
        let Some(rx) = self.transmit_rx.as_ref() else {
            return;
        };
        while let Ok(req) = rx.try_recv() {
            let result = self
                .transport
                .write_bytes(&req.data)
                .map_err(|e| e.to_string());
            match &result {
                Ok(()) => self.stats.texts_sent += 1,
                Err(e) => tlog!("[bridge] Send failed: {}", e),
            }
            let _ = req.result_tx.try_send(result);
        }
    }

    /// Run until shutdown is requested or the device goes away.
    ///
    /// Returns the final counters on shutdown, or the transport error that
    /// ended the session. The pipe handle is released either way.
    pub fn run(&mut self) -> Result<BridgeStats, IoError> {
        let started_us = now_us();
        tlog!(
            "[bridge] Bridging {} -> {} ({:?}, link type {})",
            self.transport.name(),
            self.session.config().fifo_path.display(),
            self.session.config().decoder.encoding,
            self.session.config().link_type.dlt()
        );

        let result = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break Ok(());
            }

            self.process_transmits();

            match self.transport.read_line() {
                Ok(Some(line)) => self.dispatch_line(&line),
                Ok(None) => {
                    // Timeout, go round and poll the flag again
                }
                Err(e) if e.is_fatal() => break Err(e),
                Err(e) => tlog!("[bridge] {}", e),
            }
        };

        self.session.close();

        let elapsed_s = now_us().saturating_sub(started_us) as f64 / 1_000_000.0;
        let s = &self.stats;
        tlog!(
            "[bridge] Session ended after {:.1}s: {} lines, {} frames written ({} bytes), {} dropped, {} discarded, {} reader disconnects, {} sent",
            elapsed_s,
            s.lines_logged,
            s.frames_written,
            s.bytes_written,
            s.frames_dropped,
            s.frames_discarded,
            s.reader_disconnects,
            s.texts_sent
        );

        match result {
            Ok(()) => Ok(self.stats.clone()),
            Err(e) => {
                tlog!("[bridge] Transport failed: {}", e);
                Err(e)
            }
        }
    }
}
