//! Pipeline supervisor
//!
//! The supervisor owns the lifecycle of exactly one telemetry source: it
//! selects the implementation from configuration, constructs the bounded
//! output channels, binds and starts the source, and is the exclusive owner
//! of the shutdown trigger. On shutdown it waits, with a bounded timeout,
//! for the terminal halt signal before releasing the source so no producer
//! threads or transport handles are leaked.

use crate::config::{AppConfig, SourceKind};
use crate::error::Result;
use crate::source::serial_source::SerialSource;
use crate::source::source_trait::TelemetrySource;
use crate::source::synth_source::SynthSource;
use crate::source::{telemetry_channels, TelemetryReceiver};
use crate::types::{SourceState, StatsSnapshot};
use std::time::Duration;

/// Owns one running telemetry source and its shutdown trigger
pub struct Supervisor {
    source: Box<dyn TelemetrySource>,
    halt_timeout: Duration,
}

impl Supervisor {
    /// Select, wire, and start the source described by `config`.
    ///
    /// Returns the supervisor and the consumer handle for the two output
    /// channels. Configuration problems (unknown port, zero capacity) and
    /// transport acquisition failures surface here, synchronously.
    pub fn start(config: &AppConfig) -> Result<(Self, TelemetryReceiver)> {
        config.validate()?;

        let source: Box<dyn TelemetrySource> = match config.source {
            SourceKind::Serial => Box::new(SerialSource::open(&config.serial)?),
            SourceKind::Synthetic => Box::new(SynthSource::new(&config.synth)),
        };
        tracing::info!(kind = %config.source, "starting telemetry source");

        Self::start_with_source(source, config.channel.capacity, config.channel.halt_timeout())
    }

    /// Wire and start an already-constructed source.
    ///
    /// Useful for plugging in source kinds the configuration does not know
    /// about; `start` goes through here.
    pub fn start_with_source(
        mut source: Box<dyn TelemetrySource>,
        capacity: usize,
        halt_timeout: Duration,
    ) -> Result<(Self, TelemetryReceiver)> {
        let (status_tx, signal_tx, receiver) = telemetry_channels(capacity);
        source.assign_channels(status_tx, signal_tx)?;
        source.listen()?;
        Ok((
            Self {
                source,
                halt_timeout,
            },
            receiver,
        ))
    }

    /// Stop the source and wait for its terminal halt signal.
    ///
    /// Secondary failures on the source's own shutdown path are logged and
    /// do not abort the wait; an error here means the halt signal was never
    /// observed within the configured budget.
    pub fn shutdown(&mut self, receiver: &TelemetryReceiver) -> Result<()> {
        tracing::info!("shutting down telemetry source");
        if let Err(e) = self.source.shutdown() {
            tracing::error!(error = %e, "source shutdown reported an error, continuing");
        }

        let halt = receiver.wait_for_halt(self.halt_timeout)?;
        tracing::info!(message = %halt.message, "source confirmed halted");
        Ok(())
    }

    /// Probe the source's liveness.
    pub fn health_check(&self) -> Result<()> {
        self.source.health_check()
    }

    /// Current lifecycle state of the owned source.
    pub fn state(&self) -> SourceState {
        self.source.state()
    }

    /// Counters accumulated by the owned source.
    pub fn stats(&self) -> StatsSnapshot {
        self.source.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    fn synth_config(tick_ms: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.source = SourceKind::Synthetic;
        config.synth.tick_ms = tick_ms;
        config
    }

    #[test]
    fn test_start_and_shutdown_round_trip() {
        let config = synth_config(20);
        let (mut supervisor, receiver) = Supervisor::start(&config).unwrap();
        assert_eq!(supervisor.state(), SourceState::Listening);
        supervisor.health_check().unwrap();

        std::thread::sleep(Duration::from_millis(50));
        supervisor.shutdown(&receiver).unwrap();
        assert_eq!(supervisor.state(), SourceState::Halted);

        assert!(!receiver.drain_status().is_empty());
        let snap = supervisor.stats();
        assert!(snap.status_sent >= 1);
        assert!(snap.signals_sent >= 1);
    }

    #[test]
    fn test_serial_without_port_fails_synchronously() {
        let mut config = AppConfig::default();
        config.source = SourceKind::Serial;
        assert!(Supervisor::start(&config).is_err());
    }

    #[test]
    fn test_invalid_channel_config_rejected() {
        let mut config = synth_config(20);
        config.channel = ChannelConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(Supervisor::start(&config).is_err());
    }

    #[test]
    fn test_start_with_custom_source() {
        let source = Box::new(SynthSource::default().with_tick(Duration::from_millis(20)));
        let (mut supervisor, receiver) =
            Supervisor::start_with_source(source, 10, Duration::from_secs(1)).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        supervisor.shutdown(&receiver).unwrap();
    }
}
