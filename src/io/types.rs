// src/io/types.rs
//
// Shared types for the send-text path between the control surface and the worker.

use std::sync::mpsc as std_mpsc;
use std::time::Duration;

// ============================================================================
// Transmit Types
// ============================================================================

/// Transmit request sent through the channel
pub struct TransmitRequest {
    /// Bytes to write to the device, already terminated
    pub data: Vec<u8>,
    /// Sync oneshot channel to send the result back
    pub result_tx: std_mpsc::SyncSender<Result<(), String>>,
}

/// Sender type for transmit requests (sync-safe)
pub type TransmitSender = std_mpsc::SyncSender<TransmitRequest>;

/// Receiver side drained by the worker once per iteration
pub type TransmitReceiver = std_mpsc::Receiver<TransmitRequest>;

/// Queue depth for pending transmit requests
pub const TRANSMIT_QUEUE_DEPTH: usize = 32;

/// Create the bounded transmit channel
pub fn transmit_channel() -> (TransmitSender, TransmitReceiver) {
    std_mpsc::sync_channel::<TransmitRequest>(TRANSMIT_QUEUE_DEPTH)
}

/// Queue a line of text for the device and wait for the worker to write it.
///
/// The device console expects CRLF-terminated commands, so `\r\n` is appended.
/// The wait is bounded by `timeout`; the worker picks requests up once per
/// read iteration, so this should exceed the transport read timeout.
pub fn send_text(tx: &TransmitSender, text: &str, timeout: Duration) -> Result<(), String> {
    let mut data = Vec::with_capacity(text.len() + 2);
    data.extend_from_slice(text.as_bytes());
    data.extend_from_slice(b"\r\n");

    let (result_tx, result_rx) = std_mpsc::sync_channel(1);

    tx.try_send(TransmitRequest { data, result_tx })
        .map_err(|e| format!("Failed to queue transmit request: {}", e))?;

    result_rx
        .recv_timeout(timeout)
        .map_err(|e| format!("Transmit timeout or channel closed: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_text_appends_crlf() {
        let (tx, rx) = transmit_channel();

        let worker = std::thread::spawn(move || {
            let req = rx.recv().unwrap();
            let data = req.data.clone();
            req.result_tx.send(Ok(())).unwrap();
            data
        });

        send_text(&tx, "wifi_sta_connect", Duration::from_secs(5)).unwrap();
        assert_eq!(worker.join().unwrap(), b"wifi_sta_connect\r\n".to_vec());
    }

    #[test]
    fn test_send_text_reports_write_failure() {
        let (tx, rx) = transmit_channel();

        let worker = std::thread::spawn(move || {
            let req = rx.recv().unwrap();
            req.result_tx.send(Err("port gone".to_string())).unwrap();
        });

        let result = send_text(&tx, "reboot", Duration::from_secs(5));
        worker.join().unwrap();
        assert_eq!(result, Err("port gone".to_string()));
    }

    #[test]
    fn test_send_text_times_out_without_worker() {
        let (tx, _rx) = transmit_channel();
        let result = send_text(&tx, "help", Duration::from_millis(10));
        assert!(result.is_err());
    }
}
