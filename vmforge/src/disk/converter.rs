//! Existing-image format conversion.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use vmforge_shared::errors::{MaterializationError, VmforgeResult};

/// Converts an existing disk image into a qcow2 image at `destination`.
#[async_trait]
pub trait ImageConverter: Send + Sync {
    async fn convert(&self, source: &Path, destination: &Path) -> VmforgeResult<()>;
}

/// Converter backed by the `qemu-img` tool.
#[derive(Debug, Clone)]
pub struct QemuImgConverter {
    binary: PathBuf,
}

impl Default for QemuImgConverter {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("qemu-img"),
        }
    }
}

impl QemuImgConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ImageConverter for QemuImgConverter {
    async fn convert(&self, source: &Path, destination: &Path) -> VmforgeResult<()> {
        let conversion_error = |reason: String| MaterializationError::Conversion {
            source_path: source.to_path_buf(),
            reason,
        };

        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Converting image to qcow2"
        );

        let output = Command::new(&self.binary)
            .arg("convert")
            .arg("-O")
            .arg("qcow2")
            .arg(source)
            .arg(destination)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                conversion_error(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_error(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            ))
            .into());
        }

        Ok(())
    }
}
