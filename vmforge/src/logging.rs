//! Process-wide logging setup.

use crate::runtime::FilesystemLayout;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use vmforge_shared::errors::{VmforgeError, VmforgeResult};

const LOG_FILE_PREFIX: &str = "vmforge.log";
const DEFAULT_FILTER: &str = "vmforge=info";

/// Keeps the non-blocking writer flushing for the life of the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Send `tracing` output to a daily-rolling file under `<home>/logs`.
///
/// `RUST_LOG` overrides the default `vmforge=info` filter. Only the first
/// call installs anything; if the host application already installed a
/// global subscriber, that one is left in place.
pub fn init_logging_for(layout: &FilesystemLayout) -> VmforgeResult<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        VmforgeError::Storage(format!(
            "Failed to create log directory {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .is_ok();

    if LOG_GUARD.set(guard).is_ok() && installed {
        tracing::debug!(dir = %logs_dir.display(), "logging initialized");
    }
    Ok(())
}
