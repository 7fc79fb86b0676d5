//! PID Telemetry Receiver - Demo Consumer
//!
//! Thin binary that stands in for the visualization component: it starts the
//! configured telemetry source and logs every sample and signal it receives
//! until the source halts.

use pidscope_rs::config::AppConfig;
use pidscope_rs::source::Supervisor;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pidscope_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PID telemetry receiver");

    let config = AppConfig::load_or_default();
    let (mut supervisor, receiver) = Supervisor::start(&config)?;

    let halted = 'consume: loop {
        for sample in receiver.drain_status() {
            tracing::info!(
                time = sample.time,
                error = sample.error,
                output = sample.output,
                kp = sample.kp,
                ki = sample.ki,
                kd = sample.kd,
                status = %sample.status,
                "sample"
            );
        }
        for signal in receiver.drain_signals() {
            tracing::debug!(code = signal.signal, message = %signal.message, "signal");
            if signal.is_halt() {
                break 'consume true;
            }
        }

        if let Err(e) = supervisor.health_check() {
            tracing::error!(error = %e, "source unhealthy, shutting down");
            break 'consume false;
        }

        std::thread::sleep(Duration::from_millis(50));
    };

    if !halted {
        supervisor.shutdown(&receiver)?;
    }
    let stats = supervisor.stats();
    tracing::info!(
        status_sent = stats.status_sent,
        signals_sent = stats.signals_sent,
        lines_discarded = stats.lines_discarded,
        tokens_zeroed = stats.tokens_zeroed,
        "receiver stopped"
    );

    Ok(())
}
