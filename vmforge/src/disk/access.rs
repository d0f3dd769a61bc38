//! Scoped access to user-selected files.
//!
//! Some hosts only grant read access to a user-picked file between an
//! explicit start and stop call. [`AccessGuard`] ties the stop call to a
//! scope so it runs on every exit path.

use std::path::{Path, PathBuf};
use vmforge_shared::errors::VmforgeResult;

type ReleaseFn = Box<dyn FnOnce(&Path) + Send>;

/// Grants temporary access to a path.
pub trait ScopedAccess: Send + Sync {
    fn acquire(&self, path: &Path) -> VmforgeResult<AccessGuard>;
}

/// Held access to a path; released on drop.
pub struct AccessGuard {
    path: PathBuf,
    release: Option<ReleaseFn>,
}

impl AccessGuard {
    pub fn new(path: impl Into<PathBuf>, release: impl FnOnce(&Path) + Send + 'static) -> Self {
        Self {
            path: path.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Guard for a path that needs no release.
    pub fn unmanaged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            release: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::trace!(path = %self.path.display(), "Releasing scoped access");
            release(&self.path);
        }
    }
}

/// Access model for hosts without scoped permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScopedAccess;

impl ScopedAccess for NoopScopedAccess {
    fn acquire(&self, path: &Path) -> VmforgeResult<AccessGuard> {
        Ok(AccessGuard::unmanaged(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_guard_releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        {
            let guard = AccessGuard::new("/tmp/image.iso", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(guard.path(), Path::new("/tmp/image.iso"));
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_released_on_early_return() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        let read = || -> Result<(), &'static str> {
            let _guard = AccessGuard::new("/tmp/image.iso", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            Err("copy failed")
        };

        assert!(read().is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
