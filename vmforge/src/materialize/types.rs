//! Type definitions for the materialization pipeline.

use crate::compiler::CompiledConfiguration;
use crate::disk::{
    DefaultDiskAllocator, DiskAllocator, ImageConverter, NoopScopedAccess, QemuImgConverter,
    ScopedAccess,
};
use crate::pipeline::PipelineMetrics;
use crate::selection::SelectionState;
use crate::vm::LiveVm;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use vmforge_shared::errors::{VmforgeError, VmforgeResult};

/// External services the pipeline delegates I/O to.
#[derive(Clone)]
pub struct MaterializerServices {
    pub allocator: Arc<dyn DiskAllocator>,
    pub converter: Arc<dyn ImageConverter>,
    pub access: Arc<dyn ScopedAccess>,
}

impl Default for MaterializerServices {
    fn default() -> Self {
        Self {
            allocator: Arc::new(DefaultDiskAllocator),
            converter: Arc::new(QemuImgConverter::default()),
            access: Arc::new(NoopScopedAccess),
        }
    }
}

/// Everything one materialization run needs.
pub struct MaterializeRequest {
    pub config: CompiledConfiguration,
    pub selection: SelectionState,
    /// VM data directory; created if missing.
    pub data_dir: PathBuf,
    pub vm: Arc<dyn LiveVm>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct MaterializeReport {
    pub metrics: PipelineMetrics,
    /// Files created in the data directory, in creation order.
    pub written: Vec<PathBuf>,
}

/// Shared pipeline context.
pub struct MaterializeContext {
    pub config: CompiledConfiguration,
    pub selection: SelectionState,
    pub data_dir: PathBuf,
    pub vm: Arc<dyn LiveVm>,
    pub services: MaterializerServices,
    /// Imported images are converted rather than copied.
    pub conversion: bool,
    /// Image chosen by the boot-assets task for import, if any.
    pub existing_image: Option<PathBuf>,
    pub written: Vec<PathBuf>,
}

impl MaterializeContext {
    pub fn new(request: MaterializeRequest, services: MaterializerServices, conversion: bool) -> Self {
        Self {
            config: request.config,
            selection: request.selection,
            data_dir: request.data_dir,
            vm: request.vm,
            services,
            conversion,
            existing_image: None,
            written: Vec::new(),
        }
    }
}

pub type MaterializeCtx = Arc<Mutex<MaterializeContext>>;

/// Marks an operation as in progress for as long as it is held.
///
/// The flag is cleared on drop, so success, failure and cancellation all
/// leave it `false`.
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    pub fn acquire(flag: &Arc<AtomicBool>) -> VmforgeResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VmforgeError::Internal(
                "another operation is already in progress".into(),
            ));
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
