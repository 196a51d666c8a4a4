//! Tracing subscriber setup for the binary

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Log file name prefix; tracing-appender appends the date
pub const LOG_FILE_PREFIX: &str = "update-resolver.log";

/// Install the global subscriber.
///
/// Events go to a daily rolling JSON log under `log_dir`, and additionally to
/// stderr when `verbose` is set. The filter is read from `RUST_LOG` and
/// defaults to `info`. Keep the returned guard alive until exit so buffered
/// lines are flushed.
pub fn init(log_dir: &Path, verbose: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}
