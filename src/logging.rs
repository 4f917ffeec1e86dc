use crate::config;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "nse-chain-analyzer.log";

/// Console plus daily-rotated JSON file under `NSE_LOG_DIR` (default ./logs).
/// Level comes from RUST_LOG, default info.
pub fn init_logging() -> std::io::Result<()> {
    init_logging_in(config::get_log_dir())
}

pub fn init_logging_in(log_dir: impl AsRef<Path>) -> std::io::Result<()> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);

    // A second call keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_line_number(true)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_thread_ids(true)
                .with_ansi(false)
                .json(),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    Ok(())
}
