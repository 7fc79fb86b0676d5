//! Configuration sections for the telemetry pipeline
//!
//! Each section covers one concern: which source kind to run, how the serial
//! transport is framed, how the synthetic generator ticks, and how large the
//! output channels are. All sections have serde derives and sane defaults so
//! a partial TOML file fills in the rest.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    DEFAULT_BAUD_RATE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HALT_TIMEOUT_MS, DEFAULT_POLL_BACKOFF_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_SYNTH_TICK_MS,
};

/// Which telemetry source implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Physical source reading the line protocol off a serial port
    Serial,
    /// Synthetic fixed-cadence generator, no hardware required
    #[default]
    Synthetic,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Serial => write!(f, "serial"),
            SourceKind::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Serial transport configuration
///
/// Framing is fixed at 8 data bits, no parity, one stop bit, no flow control;
/// only the port name and baud rate are configuration inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default)]
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Read timeout on the transport; bounds how long a parked read can
    /// delay observation of the cancel flag
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// How long the byte-pump sleeps when a read returns zero bytes
    #[serde(default = "default_poll_backoff_ms")]
    pub poll_backoff_ms: u64,
}

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_poll_backoff_ms() -> u64 {
    DEFAULT_POLL_BACKOFF_MS
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            poll_backoff_ms: DEFAULT_POLL_BACKOFF_MS,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Poll backoff as a [`Duration`]
    pub fn poll_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_backoff_ms)
    }
}

/// Synthetic source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Generator tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    DEFAULT_SYNTH_TICK_MS
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_SYNTH_TICK_MS,
        }
    }
}

impl SynthConfig {
    /// Tick period as a [`Duration`]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Output channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity of the status and signal channels. A full channel blocks
    /// the producing thread; this is the pipeline's only backpressure.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// How long the supervisor waits for the terminal halt signal
    #[serde(default = "default_halt_timeout_ms")]
    pub halt_timeout_ms: u64,
}

fn default_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_halt_timeout_ms() -> u64 {
    DEFAULT_HALT_TIMEOUT_MS
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            halt_timeout_ms: DEFAULT_HALT_TIMEOUT_MS,
        }
    }
}

impl ChannelConfig {
    /// Halt wait budget as a [`Duration`]
    pub fn halt_timeout(&self) -> Duration {
        Duration::from_millis(self.halt_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let serial = SerialConfig::default();
        assert_eq!(serial.baud, DEFAULT_BAUD_RATE);
        assert!(serial.port.is_empty());

        let synth = SynthConfig::default();
        assert_eq!(synth.tick(), Duration::from_millis(DEFAULT_SYNTH_TICK_MS));

        let chan = ChannelConfig::default();
        assert_eq!(chan.capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_source_kind_serde_names() {
        #[derive(serde::Deserialize)]
        struct Wrap {
            kind: SourceKind,
        }
        let w: Wrap = toml::from_str("kind = \"serial\"").unwrap();
        assert_eq!(w.kind, SourceKind::Serial);

        let w: Wrap = toml::from_str("kind = \"synthetic\"").unwrap();
        assert_eq!(w.kind, SourceKind::Synthetic);
    }
}
