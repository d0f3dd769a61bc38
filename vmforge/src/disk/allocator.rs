//! Empty disk allocation.

use super::constants::{BYTES_IN_MIB, QCOW2_EXTENSION, qcow2};
use async_trait::async_trait;
use qcow2_rs::meta::Qcow2Header;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use vmforge_shared::errors::{MaterializationError, VmforgeError, VmforgeResult};

/// Creates a new, empty virtual disk image file.
#[async_trait]
pub trait DiskAllocator: Send + Sync {
    async fn allocate(&self, path: &Path, size_mib: u64) -> VmforgeResult<()>;
}

/// Writes qcow2 metadata for `.qcow2` paths and a sparse raw file otherwise.
///
/// Existing files are never overwritten.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDiskAllocator;

#[async_trait]
impl DiskAllocator for DefaultDiskAllocator {
    async fn allocate(&self, path: &Path, size_mib: u64) -> VmforgeResult<()> {
        let path_buf = path.to_path_buf();
        let size_bytes = size_mib.checked_mul(BYTES_IN_MIB).ok_or_else(|| {
            MaterializationError::FatalDiskCreation {
                path: path_buf.clone(),
                reason: format!("size of {} MiB overflows", size_mib),
            }
        })?;

        let is_qcow2 = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(QCOW2_EXTENSION));

        tokio::task::spawn_blocking(move || {
            if is_qcow2 {
                write_qcow2(&path_buf, size_bytes)
            } else {
                write_sparse_raw(&path_buf, size_bytes)
            }
        })
        .await
        .map_err(|e| VmforgeError::Internal(format!("Disk creation task failed: {}", e)))??;

        tracing::info!(
            path = %path.display(),
            size_mib,
            format = if is_qcow2 { "qcow2" } else { "raw" },
            "Allocated disk image"
        );
        Ok(())
    }
}

fn creation_error(path: &Path, reason: impl ToString) -> VmforgeError {
    MaterializationError::FatalDiskCreation {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
    .into()
}

fn write_qcow2(path: &Path, size_bytes: u64) -> VmforgeResult<()> {
    let (refcount_table, refcount_block, _) = Qcow2Header::calculate_meta_params(
        size_bytes,
        qcow2::CLUSTER_BITS,
        qcow2::REFCOUNT_ORDER,
        qcow2::BLOCK_SIZE,
    );
    let clusters = 1 + refcount_table.1 + refcount_block.1;
    let header_len = ((clusters as usize) << qcow2::CLUSTER_BITS) + qcow2::BLOCK_SIZE;

    let mut buf = vec![0u8; header_len];
    Qcow2Header::format_qcow2(
        &mut buf,
        size_bytes,
        qcow2::CLUSTER_BITS,
        qcow2::REFCOUNT_ORDER,
        qcow2::BLOCK_SIZE,
    )
    .map_err(|e| creation_error(path, format!("{:?}", e)))?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| creation_error(path, e))?;
    file.write_all(&buf).map_err(|e| creation_error(path, e))?;
    file.sync_all().map_err(|e| creation_error(path, e))?;
    Ok(())
}

fn write_sparse_raw(path: &Path, size_bytes: u64) -> VmforgeResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| creation_error(path, e))?;
    file.set_len(size_bytes).map_err(|e| creation_error(path, e))?;
    Ok(())
}
