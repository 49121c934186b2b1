use std::path::Path;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,service=debug,remote_session=info";

pub const LOG_FILE_NAME: &str = "remote-store.log";

/// `RUST_LOG` when set and valid, `DEFAULT_LOG_FILTER` otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber.
///
/// Console output is compact and human readable. With a `log_dir`, the same events are
/// also written as JSON to a daily rotated file in that directory; the returned guard
/// flushes that file and must be kept alive as long as logging is wanted.
///
/// Override the level with RUST_LOG, e.g. `RUST_LOG=service=trace,remote_session=debug`.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, TryInitError> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_level(true)
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!(
                    "Warning: Failed to create log directory at {}: {}",
                    dir.display(),
                    e
                );
            }
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
