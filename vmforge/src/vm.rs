//! Live VM object the materializer configures after creation.

use crate::compiler::ImageType;
use async_trait::async_trait;
use std::path::Path;
use vmforge_shared::errors::VmforgeResult;

/// A drive as the created VM reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmDrive {
    pub id: String,
    pub image_type: ImageType,
    pub removable: bool,
}

/// Operations on a VM that already exists in the backend's own schema.
///
/// Both change operations are safe to repeat.
#[async_trait]
pub trait LiveVm: Send + Sync {
    /// Drives in configuration order.
    fn drives(&self) -> Vec<VmDrive>;

    async fn change_shared_directory(&self, path: &Path, read_only: bool) -> VmforgeResult<()>;

    /// Insert `path` as the medium of removable drive `drive_id`.
    async fn change_medium(&self, drive_id: &str, path: &Path) -> VmforgeResult<()>;
}
