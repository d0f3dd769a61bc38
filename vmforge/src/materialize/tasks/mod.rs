//! Materialization tasks, one per step.

mod boot_assets;
mod boot_media;
mod default_disk;
mod existing_image;
mod shared_directory;

pub use boot_assets::BootAssetsTask;
pub use boot_media::BootMediaTask;
pub use default_disk::DefaultDiskTask;
pub use existing_image::ExistingImageTask;
pub use shared_directory::SharedDirectoryTask;

use super::types::MaterializeCtx;
use crate::disk::ScopedAccess;
use std::path::Path;
use vmforge_shared::errors::{MaterializationError, VmforgeError, VmforgeResult};

/// Log task start and return the VM name for later log lines.
pub(super) async fn task_start(ctx: &MaterializeCtx, task_name: &str) -> String {
    let ctx = ctx.lock().await;
    let vm = ctx.config.name().to_string();
    tracing::debug!(vm = %vm, task = task_name, "Task started");
    vm
}

pub(super) fn log_task_error(vm: &str, task_name: &str, error: &VmforgeError) {
    tracing::error!(vm = %vm, task = task_name, error = %error, "Task failed");
}

/// Copy `source` to `destination` verbatim while holding scoped access to
/// the source.
pub(super) async fn copy_asset(
    access: &dyn ScopedAccess,
    source: &Path,
    destination: &Path,
) -> VmforgeResult<()> {
    let _guard = access.acquire(source)?;
    tokio::fs::copy(source, destination)
        .await
        .map_err(|e| MaterializationError::Copy {
            source_path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        "Copied asset"
    );
    Ok(())
}
