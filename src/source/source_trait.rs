//! TelemetrySource trait for the unified source interface
//!
//! This module provides a common trait for all telemetry source
//! implementations, enabling both the hardware-backed serial source and the
//! synthetic generator used for testing. It is a capability set, not a class
//! hierarchy: any type satisfying these operations is a valid source, and
//! new source kinds (a network transport, say) plug in without touching the
//! supervisor.

use crate::error::Result;
use crate::types::{SignalMessage, SourceState, StatsSnapshot, StatusMessage};
use crossbeam_channel::Sender;

/// Unified interface for telemetry sources
///
/// Implementations must be `Send` so the supervisor can own them across
/// threads. The lifecycle contract:
///
/// 1. [`assign_channels`] exactly once, before [`listen`]. A second call or a
///    call after listening is an error.
/// 2. [`listen`] returns immediately; all production happens on background
///    threads that poll a shared cancel flag once per loop iteration.
/// 3. [`shutdown`] is idempotent, never deadlocks even if the consumer has
///    stopped reading, and guarantees the terminal halt signal is eventually
///    delivered on the signal channel.
/// 4. [`health_check`] is cheap and non-blocking; it errors only when the
///    source is known to be unrecoverable.
///
/// [`assign_channels`]: TelemetrySource::assign_channels
/// [`listen`]: TelemetrySource::listen
/// [`shutdown`]: TelemetrySource::shutdown
/// [`health_check`]: TelemetrySource::health_check
pub trait TelemetrySource: Send {
    /// Bind the two send-only output channels the source will write to.
    fn assign_channels(
        &mut self,
        status: Sender<StatusMessage>,
        signals: Sender<SignalMessage>,
    ) -> Result<()>;

    /// Begin asynchronous production. Non-blocking; fails if channels were
    /// never assigned or the underlying transport is gone.
    fn listen(&mut self) -> Result<()>;

    /// Request production to stop, release underlying resources, and ensure
    /// the halt signal is emitted before the producer threads exit.
    fn shutdown(&mut self) -> Result<()>;

    /// Cheap liveness probe.
    fn health_check(&self) -> Result<()>;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;

    /// Counters accumulated by the producer threads.
    fn stats(&self) -> StatsSnapshot;
}
