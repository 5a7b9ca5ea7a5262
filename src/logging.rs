use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "scraper.log";
const DEFAULT_FILTER: &str = "uerj_scraper=debug,info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes console output plus a daily-rotated JSON log file.
///
/// `RUST_LOG` overrides the default filter. Keep the returned guard alive
/// until exit so buffered file lines are flushed.
pub fn init_logging() -> Option<WorkerGuard> {
    // Without a writable log directory, log to the console only.
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
            .try_init()
            .ok();
        tracing::warn!("Could not create '{}', file logging disabled: {}", LOG_DIR, e);
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(non_blocking_writer))
        .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
        .try_init()
        .ok();
    Some(guard)
}
