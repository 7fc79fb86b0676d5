//! Core data types for PidScope-RS
//!
//! This module contains the message model exchanged between telemetry sources
//! and the consumer, along with the source lifecycle state and the shared
//! counters every source maintains.
//!
//! # Main Types
//!
//! - [`StatusMessage`] - One control-loop sample (gains, error, output, timestamp)
//! - [`SignalMessage`] - One out-of-band lifecycle event (heartbeat, halt)
//! - [`SourceState`] - Lifecycle state of a telemetry source
//! - [`SourceStats`] - Cross-thread counters updated by producer threads
//!
//! # Message Discipline
//!
//! Both message types are created at parse/generation time, are immutable
//! after construction, and are consumed exactly once by the first receiver to
//! read them off their channel. Messages carry no identity beyond their
//! fields. Within one channel delivery is FIFO; no ordering is guaranteed
//! between the status channel and the signal channel.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Signal code: the source is alive and producing.
pub const SIGNAL_HEARTBEAT: i32 = 0;

/// Signal code: the source has halted. Exactly one of these is emitted on the
/// source's halt path; no further messages follow it.
pub const SIGNAL_HALT: i32 = -1;

/// Status tag for a nominally parsed or generated sample.
pub const STATUS_NORMAL: &str = "normal";

/// A single control-loop sample.
///
/// Produced once per protocol line or synthetic tick. A sample is either
/// fully populated and emitted, or dropped with a logged diagnostic - never
/// emitted half-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Seconds since the stream started (monotonic, per-source)
    pub time: f32,
    /// Free-text state tag, `"normal"` when nominal
    pub status: String,
    /// Free-text explanation, empty when nominal
    pub status_reason: String,
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Derivative gain
    pub kd: f32,
    /// Control error
    pub error: f32,
    /// Controller output
    pub output: f32,
}

impl StatusMessage {
    /// Build a nominal sample from the six wire-order values
    /// (`time, error, output, kp, ki, kd`).
    pub fn normal(time: f32, error: f32, output: f32, kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            time,
            status: STATUS_NORMAL.to_string(),
            status_reason: String::new(),
            kp,
            ki,
            kd,
            error,
            output,
        }
    }
}

/// An out-of-band lifecycle/control event.
///
/// Used for liveness and termination notification, not data. Codes other
/// than [`SIGNAL_HEARTBEAT`] and [`SIGNAL_HALT`] are reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Seconds since the stream started
    pub time: f32,
    /// Signal code
    pub signal: i32,
    /// Human-readable description
    pub message: String,
}

impl SignalMessage {
    /// Build a heartbeat signal.
    pub fn heartbeat(time: f32, message: impl Into<String>) -> Self {
        Self {
            time,
            signal: SIGNAL_HEARTBEAT,
            message: message.into(),
        }
    }

    /// Build the terminal halt signal.
    pub fn halted(time: f32, message: impl Into<String>) -> Self {
        Self {
            time,
            signal: SIGNAL_HALT,
            message: message.into(),
        }
    }

    /// Whether this is the terminal halt signal.
    pub fn is_halt(&self) -> bool {
        self.signal == SIGNAL_HALT
    }
}

/// Lifecycle state of a telemetry source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    /// No transport acquired yet
    #[default]
    Unopened,
    /// Transport acquired (or not needed), channels may be assigned
    Bound,
    /// Producer threads running
    Listening,
    /// Shutdown requested, threads winding down
    Halting,
    /// All producer threads exited, halt signal emitted
    Halted,
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceState::Unopened => write!(f, "unopened"),
            SourceState::Bound => write!(f, "bound"),
            SourceState::Listening => write!(f, "listening"),
            SourceState::Halting => write!(f, "halting"),
            SourceState::Halted => write!(f, "halted"),
        }
    }
}

/// Counters updated by a source's producer threads.
///
/// Shared behind an `Arc` between the source handle and its threads, so all
/// fields are atomics. Read via [`SourceStats::snapshot`].
#[derive(Debug, Default)]
pub struct SourceStats {
    /// Lines parsed into a status sample
    pub lines_parsed: AtomicU64,
    /// Lines discarded for a wrong token count
    pub lines_discarded: AtomicU64,
    /// Individual tokens zeroed because they failed to parse
    pub tokens_zeroed: AtomicU64,
    /// Status messages delivered to the consumer
    pub status_sent: AtomicU64,
    /// Signal messages delivered to the consumer
    pub signals_sent: AtomicU64,
    /// Messages abandoned because shutdown preempted a full channel
    pub messages_dropped: AtomicU64,
}

impl SourceStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line_parsed(&self) {
        self.lines_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_line_discarded(&self) {
        self.lines_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_token_zeroed(&self) {
        self.tokens_zeroed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_sent(&self) {
        self.status_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_signal_sent(&self) {
        self.signals_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy for display or assertions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_parsed: self.lines_parsed.load(Ordering::Relaxed),
            lines_discarded: self.lines_discarded.load(Ordering::Relaxed),
            tokens_zeroed: self.tokens_zeroed.load(Ordering::Relaxed),
            status_sent: self.status_sent.load(Ordering::Relaxed),
            signals_sent: self.signals_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SourceStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lines_parsed: u64,
    pub lines_discarded: u64,
    pub tokens_zeroed: u64,
    pub status_sent: u64,
    pub signals_sent: u64,
    pub messages_dropped: u64,
}

impl StatsSnapshot {
    /// Fraction of observed lines that parsed cleanly, as a percentage.
    pub fn parse_rate(&self) -> f64 {
        let total = self.lines_parsed + self.lines_discarded;
        if total == 0 {
            100.0
        } else {
            (self.lines_parsed as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_sample_field_order() {
        let msg = StatusMessage::normal(1.5, 0.2, 0.9, 2.0, 0.1, 0.05);
        assert_eq!(msg.time, 1.5);
        assert_eq!(msg.error, 0.2);
        assert_eq!(msg.output, 0.9);
        assert_eq!(msg.kp, 2.0);
        assert_eq!(msg.ki, 0.1);
        assert_eq!(msg.kd, 0.05);
        assert_eq!(msg.status, STATUS_NORMAL);
        assert!(msg.status_reason.is_empty());
    }

    #[test]
    fn test_halt_signal() {
        let sig = SignalMessage::halted(3.0, "source halted");
        assert!(sig.is_halt());
        assert_eq!(sig.signal, SIGNAL_HALT);

        let beat = SignalMessage::heartbeat(3.0, "still alive");
        assert!(!beat.is_halt());
        assert_eq!(beat.signal, SIGNAL_HEARTBEAT);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = SourceStats::new();
        stats.record_line_parsed();
        stats.record_line_parsed();
        stats.record_line_discarded();
        stats.record_token_zeroed();

        let snap = stats.snapshot();
        assert_eq!(snap.lines_parsed, 2);
        assert_eq!(snap.lines_discarded, 1);
        assert_eq!(snap.tokens_zeroed, 1);
        assert!((snap.parse_rate() - 66.666).abs() < 0.1);
    }

    #[test]
    fn test_parse_rate_with_no_lines() {
        assert_eq!(StatsSnapshot::default().parse_rate(), 100.0);
    }
}
