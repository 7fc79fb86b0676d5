//! Synthetic Source Implementation for Testing
//!
//! This module provides a telemetry source that generates samples at a fixed
//! cadence without any hardware. It exercises the same interface and channel
//! discipline as the serial source, so consumers cannot tell the source kind
//! apart except by content.
//!
//! On each tick the generator emits one [`StatusMessage`] with generated
//! values in the gain/error/output fields plus one heartbeat
//! [`SignalMessage`], and checks for cancellation once. On cancellation it
//! emits the terminal halt signal and exits.
//!
//! # Data Patterns
//!
//! - [`SynthPattern::Random`] - Uniform values in `[0, 1)` (the default)
//! - [`SynthPattern::Constant`] - Fixed value, useful for static assertions
//! - [`SynthPattern::Sine`] - Phase-shifted sine per field, for plot smoke tests
//!
//! # Example
//!
//! ```ignore
//! use pidscope_rs::source::{SynthSource, TelemetrySource};
//! use std::time::Duration;
//!
//! let mut source = SynthSource::default().with_tick(Duration::from_millis(50));
//! source.assign_channels(status_tx, signal_tx)?;
//! source.listen()?;
//! // ... consume ...
//! source.shutdown()?;
//! ```

use crate::error::{Result, TelemetryError};
use crate::source::source_trait::TelemetrySource;
use crate::source::{send_cancellable, send_halt, SendOutcome};
use crate::types::{
    SignalMessage, SourceState, SourceStats, StatsSnapshot, StatusMessage, STATUS_NORMAL,
};
use crate::config::SynthConfig;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Pattern for generating synthetic telemetry values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SynthPattern {
    /// Uniform random values in `[0, 1)`
    #[default]
    Random,
    /// Constant value in every field
    Constant(f32),
    /// Sine wave, each field phase-shifted so the plots do not overlap
    Sine { frequency: f32, amplitude: f32 },
}

impl SynthPattern {
    /// Generate the value for field `index` at `elapsed` seconds.
    fn generate(&self, rng: &mut XorShift64, elapsed: f32, index: usize) -> f32 {
        match self {
            SynthPattern::Random => rng.next_f32(),
            SynthPattern::Constant(v) => *v,
            SynthPattern::Sine {
                frequency,
                amplitude,
            } => {
                let phase = index as f32 * std::f32::consts::FRAC_PI_3;
                amplitude * (2.0 * std::f32::consts::PI * frequency * elapsed + phase).sin()
            }
        }
    }
}

/// Simple xorshift pseudo-random number generator (no external dependency)
#[derive(Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next_f32(&mut self) -> f32 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.state = s;
        (s as f64 / u64::MAX as f64) as f32
    }
}

/// Default generator seed; fixed so test runs are reproducible
const DEFAULT_SEED: u64 = 12345;

/// Synthetic telemetry source
pub struct SynthSource {
    /// Output channels, set by `assign_channels`
    channels: Option<(Sender<StatusMessage>, Sender<SignalMessage>)>,
    /// Cancel flag shared with the generator thread (true while producing)
    running: Arc<AtomicBool>,
    /// Counters shared with the generator thread
    stats: Arc<SourceStats>,
    /// Lifecycle state, driven by the interface calls
    state: SourceState,
    /// Generator tick period
    tick: Duration,
    /// Value generation pattern
    pattern: SynthPattern,
    /// RNG seed for the Random pattern
    seed: u64,
    /// Generator thread handle
    handle: Option<JoinHandle<()>>,
}

impl SynthSource {
    /// Create a synthetic source from configuration.
    pub fn new(config: &SynthConfig) -> Self {
        Self {
            channels: None,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SourceStats::new()),
            // No transport to acquire; the source is born bound
            state: SourceState::Bound,
            tick: config.tick(),
            pattern: SynthPattern::default(),
            seed: DEFAULT_SEED,
            handle: None,
        }
    }

    /// Set the tick period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the value generation pattern.
    pub fn with_pattern(mut self, pattern: SynthPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The generator loop, run on its own thread.
    fn generate_loop(
        status_tx: Sender<StatusMessage>,
        signal_tx: Sender<SignalMessage>,
        running: Arc<AtomicBool>,
        stats: Arc<SourceStats>,
        tick: Duration,
        pattern: SynthPattern,
        seed: u64,
    ) {
        let start = Instant::now();
        let mut rng = XorShift64::new(seed);

        loop {
            let elapsed = start.elapsed().as_secs_f32();

            if !running.load(Ordering::SeqCst) {
                if send_halt(&signal_tx, SignalMessage::halted(elapsed, "source halted"))
                    == SendOutcome::Sent
                {
                    stats.record_signal_sent();
                }
                tracing::info!("synthetic source halted");
                return;
            }

            let sample = StatusMessage {
                time: elapsed,
                status: STATUS_NORMAL.to_string(),
                status_reason: "synthetic source".to_string(),
                kp: pattern.generate(&mut rng, elapsed, 0),
                ki: pattern.generate(&mut rng, elapsed, 1),
                kd: pattern.generate(&mut rng, elapsed, 2),
                error: pattern.generate(&mut rng, elapsed, 3),
                output: pattern.generate(&mut rng, elapsed, 4),
            };
            match send_cancellable(&status_tx, sample, &running) {
                SendOutcome::Sent => stats.record_status_sent(),
                SendOutcome::Cancelled => stats.record_message_dropped(),
                SendOutcome::Disconnected => {
                    tracing::warn!("status channel disconnected, stopping generator");
                    running.store(false, Ordering::SeqCst);
                    continue;
                }
            }

            let beat = SignalMessage::heartbeat(elapsed, "source still alive");
            match send_cancellable(&signal_tx, beat, &running) {
                SendOutcome::Sent => stats.record_signal_sent(),
                SendOutcome::Cancelled => stats.record_message_dropped(),
                SendOutcome::Disconnected => {
                    tracing::warn!("signal channel disconnected, stopping generator");
                    running.store(false, Ordering::SeqCst);
                    continue;
                }
            }

            std::thread::sleep(tick);
        }
    }
}

impl Default for SynthSource {
    fn default() -> Self {
        Self::new(&SynthConfig::default())
    }
}

impl TelemetrySource for SynthSource {
    fn assign_channels(
        &mut self,
        status: Sender<StatusMessage>,
        signals: Sender<SignalMessage>,
    ) -> Result<()> {
        if self.channels.is_some() || self.state != SourceState::Bound {
            return Err(TelemetryError::SourceState {
                state: self.state,
                message: "channels may be assigned exactly once, before listen".to_string(),
            });
        }
        self.channels = Some((status, signals));
        Ok(())
    }

    fn listen(&mut self) -> Result<()> {
        let (status_tx, signal_tx) = self.channels.take().ok_or(TelemetryError::SourceState {
            state: self.state,
            message: "channels must be assigned before listen".to_string(),
        })?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let stats = self.stats.clone();
        let tick = self.tick;
        let pattern = self.pattern;
        let seed = self.seed;

        self.handle = Some(std::thread::spawn(move || {
            Self::generate_loop(status_tx, signal_tx, running, stats, tick, pattern, seed);
        }));
        self.state = SourceState::Listening;
        tracing::info!(tick_ms = tick.as_millis() as u64, "synthetic source listening");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.state != SourceState::Listening {
            return Ok(());
        }
        self.state = SourceState::Halting;
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("synthetic generator thread panicked during shutdown");
            }
        }
        self.state = SourceState::Halted;
        Ok(())
    }

    fn health_check(&self) -> Result<()> {
        if self.state == SourceState::Listening {
            if let Some(handle) = &self.handle {
                if handle.is_finished() && self.running.load(Ordering::SeqCst) {
                    return Err(TelemetryError::SourceState {
                        state: self.state,
                        message: "generator thread exited unexpectedly".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
