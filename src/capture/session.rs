// src/capture/session.rs
//
// Capture session: one decoder configuration, one pcap encoder, one FIFO.
// Keeps the "global header pending" flag and the pipe handle in lockstep:
// every fresh handle starts a fresh pcap stream.

use chrono::{DateTime, Utc};

use super::decoder::{decode_payload, DecodeError};
use super::fifo::{FifoState, OpenOutcome, PipeSink, WriteOutcome};
use super::pcap::CaptureEncoder;
use super::{CaptureConfig, CaptureError};

/// What happened to one packet record
#[derive(Debug)]
pub enum FrameOutcome {
    /// Record (and global header, if due) written; byte count
    Written(usize),
    /// No reader attached, record discarded
    NoReader,
    /// Payload could not be decoded, record dropped
    Dropped(DecodeError),
    /// Reader went away during the write, record lost
    ReaderGone,
    /// Write failed for another reason, record dropped
    WriteFailed,
    /// FIFO path is unusable for this session
    Unusable,
}

pub struct CaptureSession {
    config: CaptureConfig,
    encoder: CaptureEncoder,
    sink: PipeSink,
}

impl CaptureSession {
    /// Session with the FIFO not created yet; it is created on first use.
    pub fn new(config: CaptureConfig) -> Self {
        let encoder = CaptureEncoder::new(config.link_type);
        let sink = PipeSink::new(config.fifo_path.clone());
        Self {
            config,
            encoder,
            sink,
        }
    }

    /// Session with the FIFO created up front, so a bad path is reported
    /// before any device traffic is read.
    pub fn open(config: CaptureConfig) -> Result<Self, CaptureError> {
        let mut session = Self::new(config);
        session.sink.create()?;
        Ok(session)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn marker(&self) -> &str {
        &self.config.marker
    }

    pub fn fifo_state(&self) -> FifoState {
        self.sink.state()
    }

    /// Decode a marker-stripped payload and stream it.
    pub fn handle_payload(&mut self, payload: &str) -> FrameOutcome {
        match decode_payload(payload, &self.config.decoder) {
            Ok(frame) => self.write_frame(&frame),
            Err(e) => {
                tlog!(
                    "[decoder] Dropping packet for {}: {}",
                    self.config.fifo_path.display(),
                    e
                );
                FrameOutcome::Dropped(e)
            }
        }
    }

    pub fn write_frame(&mut self, frame: &[u8]) -> FrameOutcome {
        self.write_frame_at(frame, Utc::now())
    }

    pub fn write_frame_at(&mut self, frame: &[u8], ts: DateTime<Utc>) -> FrameOutcome {
        match self.sink.ensure_open() {
            OpenOutcome::AlreadyOpen => {}
            OpenOutcome::Opened => self.encoder.reset(),
            OpenOutcome::NoReader => return FrameOutcome::NoReader,
            OpenOutcome::Unusable => return FrameOutcome::Unusable,
        }

        let record = self.encoder.encode_at(frame, ts);
        match self.sink.write(&record) {
            WriteOutcome::Written(n) => FrameOutcome::Written(n),
            WriteOutcome::Disconnected => {
                self.encoder.reset();
                FrameOutcome::ReaderGone
            }
            WriteOutcome::Failed(_) => FrameOutcome::WriteFailed,
            WriteOutcome::NotOpen => FrameOutcome::NoReader,
        }
    }

    /// Release the pipe handle (shutdown). The next write starts a new stream.
    pub fn close(&mut self) {
        self.sink.close();
        self.encoder.reset();
    }
}
