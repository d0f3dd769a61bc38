//! macOS platform and recovery-image resolution.
//!
//! Resolution is a background fetch. Its outcome is sent to the owning
//! session as a [`SessionUpdate`] message; only the session mutates its
//! selection state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use vmforge_shared::errors::VmforgeResult;

/// Hardware model the native runtime needs to boot a macOS guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacPlatform {
    pub hardware_model: Vec<u8>,
    pub machine_identifier: Option<Vec<u8>>,
}

/// Reference to a macOS recovery (restore) image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreImage {
    pub path: PathBuf,
    pub build_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRestoreImage {
    pub platform: MacPlatform,
    pub image: RestoreImage,
}

/// External service producing a platform descriptor and recovery image.
#[async_trait]
pub trait RestoreImageResolver: Send + Sync {
    async fn resolve(&self) -> VmforgeResult<ResolvedRestoreImage>;
}

/// Background results delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    RestoreImageResolved(ResolvedRestoreImage),
    RestoreImageFailed(String),
}

/// Handle to an in-flight resolution. Dropping it aborts the fetch.
pub struct ResolverTask {
    handle: JoinHandle<()>,
}

impl ResolverTask {
    /// Start resolving on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime; the session then stays
    /// unresolved and compilation reports the missing platform.
    pub fn spawn(
        resolver: Arc<dyn RestoreImageResolver>,
        updates: UnboundedSender<SessionUpdate>,
    ) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available, skipping restore image resolution");
                return None;
            }
        };

        let handle = runtime.spawn(async move {
            tracing::debug!("Resolving macOS restore image");
            let update = match resolver.resolve().await {
                Ok(resolved) => {
                    tracing::info!(
                        image = %resolved.image.path.display(),
                        "Resolved macOS restore image"
                    );
                    SessionUpdate::RestoreImageResolved(resolved)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Restore image resolution failed");
                    SessionUpdate::RestoreImageFailed(e.to_string())
                }
            };
            // Receiver gone means the session was abandoned.
            let _ = updates.send(update);
        });

        Some(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ResolverTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("Aborting restore image resolution");
            self.handle.abort();
        }
    }
}
