//! # PidScope-RS: Serial PID Telemetry Receiver
//!
//! A telemetry ingestion pipeline for control-loop tuning: it reads live
//! PID telemetry (gains, error, output, timestamp) from one of several
//! interchangeable sources and hands it to a visualization consumer through
//! two bounded channels with liveness guarantees.
//!
//! ## Architecture
//!
//! - **Sources**: A serial-port source speaking a line-oriented wire
//!   protocol, and a synthetic generator for hardware-free runs. Both
//!   implement the same [`TelemetrySource`] capability trait; new source
//!   kinds plug in without touching the rest of the pipeline.
//! - **Pipeline**: Each source runs one thread per responsibility (byte-pump,
//!   line-reader, or generator tick-loop), cooperating through crossbeam
//!   channels and a shared cancel flag checked once per loop iteration.
//! - **Boundary**: The consumer sees exactly two bounded channels - status
//!   samples and lifecycle signals. A full channel blocks the producer;
//!   that is the only backpressure. Every source emits exactly one terminal
//!   halt signal before its producer threads exit.
//!
//! ## Example
//!
//! ```ignore
//! use pidscope_rs::config::AppConfig;
//! use pidscope_rs::source::Supervisor;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let (mut supervisor, receiver) = Supervisor::start(&config)?;
//!
//!     loop {
//!         for sample in receiver.drain_status() {
//!             println!("t={:.3} error={:.3} output={:.3}", sample.time, sample.error, sample.output);
//!         }
//!         if receiver.drain_signals().iter().any(|s| s.is_halt()) {
//!             break;
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//!
//!     supervisor.shutdown(&receiver)?;
//!     Ok(())
//! }
//! ```
//!
//! [`TelemetrySource`]: source::TelemetrySource

pub mod config;
pub mod error;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Result, TelemetryError};
pub use source::{SerialSource, Supervisor, SynthSource, TelemetryReceiver, TelemetrySource};
pub use types::{SignalMessage, StatusMessage, SIGNAL_HALT, SIGNAL_HEARTBEAT};
