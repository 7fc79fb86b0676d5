//! Telemetry source module: the ingestion pipeline behind two channels
//!
//! Everything with real concurrency lives here. Sources run their producer
//! threads separately from the consumer, communicating only through two
//! bounded crossbeam channels:
//!
//! - the **status channel** carries [`StatusMessage`] samples
//! - the **signal channel** carries [`SignalMessage`] lifecycle events
//!
//! A full channel blocks the producing thread; that is the pipeline's only
//! form of backpressure. Delivery is FIFO per channel with no cross-channel
//! ordering guarantee.
//!
//! # Components
//!
//! - [`TelemetrySource`] - Capability trait every source implements
//! - [`SerialSource`] - Physical source reading the line protocol off a serial port
//! - [`SynthSource`] - Synthetic fixed-cadence generator for hardware-free runs
//! - [`Supervisor`] - Selects a source, wires the channels, owns shutdown
//! - [`TelemetryReceiver`] - Consumer-side handle for both channels
//!
//! # Example
//!
//! ```ignore
//! use pidscope_rs::config::AppConfig;
//! use pidscope_rs::source::Supervisor;
//!
//! let config = AppConfig::load_or_default();
//! let (mut supervisor, receiver) = Supervisor::start(&config)?;
//!
//! for msg in receiver.drain_status() {
//!     println!("t={} err={} out={}", msg.time, msg.error, msg.output);
//! }
//!
//! supervisor.shutdown(&receiver)?;
//! ```

pub mod protocol;
pub mod serial_source;
pub mod source_trait;
pub mod supervisor;
pub mod synth_source;

pub use protocol::{parse_status_line, LineFramer, ProtocolError, TOKENS_PER_LINE};
pub use serial_source::{SerialSource, SerialTransport};
pub use source_trait::TelemetrySource;
pub use supervisor::Supervisor;
pub use synth_source::{SynthPattern, SynthSource};

use crate::error::{Result, TelemetryError};
use crate::types::{SignalMessage, StatusMessage};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often a blocked producer send rechecks the cancel flag
pub(crate) const SEND_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Budget for delivering the terminal halt signal to a slow consumer
pub(crate) const HALT_SEND_BUDGET: Duration = Duration::from_secs(2);

/// Outcome of a cancel-aware channel send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendOutcome {
    /// Message delivered
    Sent,
    /// Shutdown preempted the send; message dropped
    Cancelled,
    /// Consumer dropped its receiver
    Disconnected,
}

/// Send on a bounded channel while staying responsive to shutdown.
///
/// Blocks like a plain send under backpressure, but rechecks `running` at
/// [`SEND_POLL_INTERVAL`] so a stalled consumer can never deadlock shutdown.
pub(crate) fn send_cancellable<T>(
    tx: &Sender<T>,
    mut msg: T,
    running: &AtomicBool,
) -> SendOutcome {
    loop {
        match tx.send_timeout(msg, SEND_POLL_INTERVAL) {
            Ok(()) => return SendOutcome::Sent,
            Err(SendTimeoutError::Timeout(returned)) => {
                if !running.load(Ordering::SeqCst) {
                    return SendOutcome::Cancelled;
                }
                msg = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => return SendOutcome::Disconnected,
        }
    }
}

/// Deliver the terminal halt signal with a bounded overall budget.
///
/// The halt signal must go out even though the cancel flag is already down,
/// so this keeps retrying past cancellation, up to [`HALT_SEND_BUDGET`].
pub(crate) fn send_halt(tx: &Sender<SignalMessage>, msg: SignalMessage) -> SendOutcome {
    let deadline = Instant::now() + HALT_SEND_BUDGET;
    let mut msg = msg;
    loop {
        match tx.send_timeout(msg, SEND_POLL_INTERVAL) {
            Ok(()) => return SendOutcome::Sent,
            Err(SendTimeoutError::Timeout(returned)) => {
                if Instant::now() >= deadline {
                    tracing::error!("gave up delivering halt signal to a stalled consumer");
                    return SendOutcome::Cancelled;
                }
                msg = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => return SendOutcome::Disconnected,
        }
    }
}

/// Consumer-side handle for the two output channels
///
/// This pair of receivers is the entire contract the pipeline exposes to the
/// visualization component. How the consumer buffers, windows, or displays
/// the data is its own business.
pub struct TelemetryReceiver {
    /// Receiver for control-loop samples
    pub status: Receiver<StatusMessage>,
    /// Receiver for lifecycle signals
    pub signals: Receiver<SignalMessage>,
}

impl TelemetryReceiver {
    /// Try to receive one status sample without blocking.
    pub fn try_recv_status(&self) -> Option<StatusMessage> {
        self.status.try_recv().ok()
    }

    /// Try to receive one signal without blocking.
    pub fn try_recv_signal(&self) -> Option<SignalMessage> {
        self.signals.try_recv().ok()
    }

    /// Receive all pending status samples.
    pub fn drain_status(&self) -> Vec<StatusMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.status.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Receive all pending signals.
    pub fn drain_signals(&self) -> Vec<SignalMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.signals.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Block until the terminal halt signal arrives, or the timeout expires.
    ///
    /// Non-halt signals received along the way are discarded; by the time a
    /// consumer waits for halt it has stopped caring about heartbeats.
    pub fn wait_for_halt(&self, timeout: Duration) -> Result<SignalMessage> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TelemetryError::Timeout(
                    "halt signal not observed before deadline".to_string(),
                ));
            }
            match self.signals.recv_timeout(remaining) {
                Ok(sig) if sig.is_halt() => return Ok(sig),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(TelemetryError::Timeout(
                        "halt signal not observed before deadline".to_string(),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TelemetryError::Channel(
                        "signal channel closed before halt was observed".to_string(),
                    ));
                }
            }
        }
    }
}

/// Construct the bounded status/signal channel pair.
///
/// Returns the two send ends for [`TelemetrySource::assign_channels`] and the
/// consumer handle holding both receive ends.
pub fn telemetry_channels(
    capacity: usize,
) -> (
    Sender<StatusMessage>,
    Sender<SignalMessage>,
    TelemetryReceiver,
) {
    let (status_tx, status_rx) = bounded(capacity);
    let (signal_tx, signal_rx) = bounded(capacity);
    (
        status_tx,
        signal_tx,
        TelemetryReceiver {
            status: status_rx,
            signals: signal_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_channels_are_bounded() {
        let (status_tx, _signal_tx, receiver) = telemetry_channels(2);
        assert!(status_tx.try_send(StatusMessage::normal(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)).is_ok());
        assert!(status_tx.try_send(StatusMessage::normal(0.1, 0.0, 0.0, 0.0, 0.0, 0.0)).is_ok());
        // Third send hits the capacity limit
        assert!(status_tx.try_send(StatusMessage::normal(0.2, 0.0, 0.0, 0.0, 0.0, 0.0)).is_err());

        assert_eq!(receiver.drain_status().len(), 2);
    }

    #[test]
    fn test_send_cancellable_aborts_on_cancel() {
        let (tx, _rx) = bounded(1);
        let running = AtomicBool::new(false);
        tx.try_send(1u32).unwrap();
        // Channel full and cancellation already requested: the send gives up
        assert_eq!(send_cancellable(&tx, 2u32, &running), SendOutcome::Cancelled);
    }

    #[test]
    fn test_send_cancellable_detects_disconnect() {
        let (tx, rx) = bounded::<u32>(1);
        drop(rx);
        let running = AtomicBool::new(true);
        assert_eq!(send_cancellable(&tx, 1, &running), SendOutcome::Disconnected);
    }

    #[test]
    fn test_wait_for_halt_skips_heartbeats() {
        let (_status_tx, signal_tx, receiver) = telemetry_channels(4);
        signal_tx
            .send(SignalMessage::heartbeat(0.1, "still alive"))
            .unwrap();
        signal_tx.send(SignalMessage::halted(0.2, "halted")).unwrap();

        let halt = receiver.wait_for_halt(Duration::from_millis(200)).unwrap();
        assert!(halt.is_halt());
    }

    #[test]
    fn test_wait_for_halt_times_out() {
        let (_status_tx, _signal_tx, receiver) = telemetry_channels(4);
        let err = receiver.wait_for_halt(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, TelemetryError::Timeout(_)));
    }
}
