//! Serial-backed telemetry source
//!
//! Reads raw bytes off a serial port, reframes them into newline-delimited
//! lines, and drives the line protocol parser. Framing is fixed at 8 data
//! bits, no parity, one stop bit, no flow control; port name and baud rate
//! come from [`SerialConfig`].
//!
//! # Threads
//!
//! `listen` spawns two cooperating threads connected by an internal bounded
//! byte channel:
//!
//! - the **byte-pump** polls the transport in a tight loop, sleeping briefly
//!   when a read returns no data, and forwards raw chunks downstream. It
//!   exclusively owns the transport handle and drops (closes) it on exit.
//! - the **line-reader** consumes the chunks, reassembles complete lines
//!   with [`LineFramer`], parses each one, and emits the resulting
//!   [`StatusMessage`] on the status channel. It emits the terminal halt
//!   signal before exiting.
//!
//! Both threads poll the shared cancel flag once per loop iteration. The
//! transport is opened with a short read timeout, so a parked read wakes at
//! bounded intervals and observes cancellation; nothing has to close the
//! port out from under a blocked reader.
//!
//! Transport read errors are logged and treated as transient; the loop
//! continues. Only an explicit shutdown stops production.
//!
//! [`SerialConfig`]: crate::config::SerialConfig

use crate::config::SerialConfig;
use crate::error::{Result, TelemetryError};
use crate::source::protocol::{parse_status_line, LineFramer};
use crate::source::source_trait::TelemetrySource;
use crate::source::{send_cancellable, send_halt, SendOutcome};
use crate::types::{SignalMessage, SourceState, SourceStats, StatsSnapshot, StatusMessage};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Size of the byte-pump's read buffer
const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Capacity of the internal byte channel between pump and line-reader
const BYTE_CHANNEL_CAPACITY: usize = 64;

/// How often the line-reader wakes to recheck the cancel flag when idle
const LINE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Byte-stream seam between the source and the physical port.
///
/// The real implementation wraps a [`serialport`] handle; tests substitute a
/// scripted transport. `Ok(0)` means no data available right now, not end of
/// stream.
pub trait SerialTransport: Send {
    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// [`SerialTransport`] over a real serial port
struct PortTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport for PortTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // A timeout is the port's way of saying "nothing yet"
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Telemetry source reading the line protocol off a serial port
pub struct SerialSource {
    /// Transport handle, moved into the byte-pump thread on listen
    transport: Option<Box<dyn SerialTransport>>,
    /// Output channels, set by `assign_channels`
    channels: Option<(Sender<StatusMessage>, Sender<SignalMessage>)>,
    /// Cancel flag shared with both threads (true while producing)
    running: Arc<AtomicBool>,
    /// Counters shared with the line-reader thread
    stats: Arc<SourceStats>,
    /// Lifecycle state, driven by the interface calls
    state: SourceState,
    /// Byte-pump backoff when a read returns no data
    poll_backoff: Duration,
    /// Byte-pump thread handle
    pump_handle: Option<JoinHandle<()>>,
    /// Line-reader thread handle
    reader_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSource")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SerialSource {
    /// Acquire the serial port described by `config`.
    ///
    /// Fails synchronously if the port name is empty or the port cannot be
    /// opened; the source then never leaves `Unopened`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.port.is_empty() {
            return Err(TelemetryError::Config(
                "no serial port name configured".to_string(),
            ));
        }

        let port = serialport::new(&config.port, config.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.read_timeout())
            .open()?;

        tracing::info!(port = %config.port, baud = config.baud, "serial port opened");
        Ok(Self::from_transport(
            Box::new(PortTransport { port }),
            config.poll_backoff(),
        ))
    }

    /// Build a source over an already-acquired transport.
    ///
    /// This is the seam integration tests use to feed scripted bytes through
    /// the full pump/reader pipeline.
    pub fn from_transport(transport: Box<dyn SerialTransport>, poll_backoff: Duration) -> Self {
        Self {
            transport: Some(transport),
            channels: None,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SourceStats::new()),
            state: SourceState::Bound,
            poll_backoff,
            pump_handle: None,
            reader_handle: None,
        }
    }

    /// Byte-pump loop: transport to internal byte channel.
    fn pump_loop(
        mut transport: Box<dyn SerialTransport>,
        bytes_tx: Sender<Vec<u8>>,
        running: Arc<AtomicBool>,
        backoff: Duration,
    ) {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        while running.load(Ordering::SeqCst) {
            match transport.read_chunk(&mut buf) {
                Ok(0) => std::thread::sleep(backoff),
                Ok(n) => {
                    if send_cancellable(&bytes_tx, buf[..n].to_vec(), &running)
                        == SendOutcome::Disconnected
                    {
                        tracing::warn!("byte channel disconnected, stopping pump");
                        break;
                    }
                }
                Err(e) => {
                    // Transient: log and keep polling
                    tracing::error!(error = %e, "failed to read serial buffer");
                    std::thread::sleep(backoff);
                }
            }
        }
        // Dropping the transport here closes the port
        tracing::debug!("byte-pump exited");
    }

    /// Line-reader loop: byte channel to parsed status messages.
    fn reader_loop(
        bytes_rx: Receiver<Vec<u8>>,
        status_tx: Sender<StatusMessage>,
        signal_tx: Sender<SignalMessage>,
        running: Arc<AtomicBool>,
        stats: Arc<SourceStats>,
    ) {
        let start = Instant::now();
        let mut framer = LineFramer::new();

        loop {
            if !running.load(Ordering::SeqCst) {
                let elapsed = start.elapsed().as_secs_f32();
                if send_halt(&signal_tx, SignalMessage::halted(elapsed, "source halted"))
                    == SendOutcome::Sent
                {
                    stats.record_signal_sent();
                }
                tracing::info!("serial source halted");
                return;
            }

            let chunk = match bytes_rx.recv_timeout(LINE_POLL_INTERVAL) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    // Pump exited; wind down through the halt path
                    tracing::warn!("byte-pump gone, stopping line-reader");
                    running.store(false, Ordering::SeqCst);
                    continue;
                }
            };

            for line in framer.push(&chunk) {
                match parse_status_line(&line, &stats) {
                    Ok(msg) => match send_cancellable(&status_tx, msg, &running) {
                        SendOutcome::Sent => stats.record_status_sent(),
                        SendOutcome::Cancelled => stats.record_message_dropped(),
                        SendOutcome::Disconnected => {
                            tracing::warn!("status channel disconnected, stopping line-reader");
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::error!(line = %line, error = %e, "discarding malformed line");
                    }
                }
            }
        }
    }
}

impl TelemetrySource for SerialSource {
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
        let transport = self.transport.take().ok_or(TelemetryError::SourceState {
            state: self.state,
            message: "transport is gone, source cannot listen again".to_string(),
        })?;

        self.running.store(true, Ordering::SeqCst);
        let (bytes_tx, bytes_rx) = bounded(BYTE_CHANNEL_CAPACITY);

        let pump_running = self.running.clone();
        let backoff = self.poll_backoff;
        self.pump_handle = Some(std::thread::spawn(move || {
            Self::pump_loop(transport, bytes_tx, pump_running, backoff);
        }));

        let reader_running = self.running.clone();
        let stats = self.stats.clone();
        self.reader_handle = Some(std::thread::spawn(move || {
            Self::reader_loop(bytes_rx, status_tx, signal_tx, reader_running, stats);
        }));

        self.state = SourceState::Listening;
        tracing::info!("serial source listening");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.state != SourceState::Listening {
            return Ok(());
        }
        self.state = SourceState::Halting;
        self.running.store(false, Ordering::SeqCst);

        for handle in [self.pump_handle.take(), self.reader_handle.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                tracing::error!("serial source thread panicked during shutdown");
            }
        }
        self.state = SourceState::Halted;
        Ok(())
    }

    fn health_check(&self) -> Result<()> {
        if self.state == SourceState::Listening && self.running.load(Ordering::SeqCst) {
            let pump_dead = self
                .pump_handle
                .as_ref()
                .is_some_and(|h| h.is_finished());
            let reader_dead = self
                .reader_handle
                .as_ref()
                .is_some_and(|h| h.is_finished());
            if pump_dead || reader_dead {
                return Err(TelemetryError::SourceState {
                    state: self.state,
                    message: "producer thread exited unexpectedly".to_string(),
                });
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
