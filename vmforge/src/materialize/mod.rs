//! Post-creation asset materialization.
//!
//! ## Architecture
//!
//! Materialization is table-driven with one execution plan per backend:
//!
//! ```text
//! Emulation:
//!   1. SharedDirectory   (attach share to the live VM)
//!   2. BootMedia         (insert boot image into the removable CD drive)
//!   3. BootAssets        (copy kernel/initrd, pick the image to import)
//!   4. ExistingImage     (convert or copy the picked image)
//!   5. DefaultDisk       (allocate data.qcow2 when a drive refers to it)
//!
//! Native:
//!   1. SharedDirectory
//!   2. BootAssets
//!   3. ExistingImage     (always copied verbatim)
//!   4. DefaultDisk       (allocate data.img when nothing was imported)
//! ```
//!
//! The first failing task stops the run. Completed tasks are not rolled
//! back; a partially written file must be removed before retrying.

mod tasks;
mod types;

pub use types::{
    BusyGuard, MaterializeContext, MaterializeCtx, MaterializeReport, MaterializeRequest,
    MaterializerServices,
};

use crate::capability::{Backend, CapabilityMatrix};
use crate::pipeline::{BoxedTask, CancelToken, PipelineExecutor};
use std::sync::Arc;
use tokio::sync::Mutex;
use vmforge_shared::errors::{VmforgeError, VmforgeResult};

use tasks::{BootAssetsTask, BootMediaTask, DefaultDiskTask, ExistingImageTask, SharedDirectoryTask};

/// Get execution plan for a backend.
fn get_execution_plan(backend: Backend) -> Vec<BoxedTask<MaterializeCtx>> {
    match backend {
        Backend::Emulation => vec![
            Box::new(SharedDirectoryTask),
            Box::new(BootMediaTask),
            Box::new(BootAssetsTask),
            Box::new(ExistingImageTask),
            Box::new(DefaultDiskTask),
        ],
        // Native boot media is an external disk entry in the config itself.
        Backend::Native => vec![
            Box::new(SharedDirectoryTask),
            Box::new(BootAssetsTask),
            Box::new(ExistingImageTask),
            Box::new(DefaultDiskTask),
        ],
    }
}

/// Runs the side effects a compiled configuration implies.
#[derive(Clone)]
pub struct Materializer {
    matrix: CapabilityMatrix,
    services: MaterializerServices,
}

impl Materializer {
    pub fn new(matrix: CapabilityMatrix, services: MaterializerServices) -> Self {
        Self { matrix, services }
    }

    /// Materialize `request` into its data directory.
    ///
    /// Returns the files written and per-task timings. Cancelling `cancel`
    /// stops the run before the next task.
    pub async fn run(
        &self,
        request: MaterializeRequest,
        cancel: &CancelToken,
    ) -> VmforgeResult<MaterializeReport> {
        let backend = request.config.backend();
        let vm_name = request.config.name().to_string();
        let conversion = self.matrix.supports_conversion(backend);

        tokio::fs::create_dir_all(&request.data_dir)
            .await
            .map_err(|e| {
                VmforgeError::Storage(format!(
                    "Failed to create data directory {}: {}",
                    request.data_dir.display(),
                    e
                ))
            })?;

        tracing::info!(
            vm = %vm_name,
            ?backend,
            conversion,
            data_dir = %request.data_dir.display(),
            "Materializing VM assets"
        );

        let ctx: MaterializeCtx = Arc::new(Mutex::new(MaterializeContext::new(
            request,
            self.services.clone(),
            conversion,
        )));

        let metrics =
            PipelineExecutor::execute(get_execution_plan(backend), Arc::clone(&ctx), cancel)
                .await
                .inspect_err(|e| {
                    tracing::warn!(vm = %vm_name, error = %e, "Materialization stopped");
                })?;

        tracing::debug!(
            vm = %vm_name,
            total_ms = metrics.total_duration_ms as u64,
            completed = ?metrics.completed(),
            import_ms = ?metrics.task_duration_ms("existing_image_import"),
            disk_ms = ?metrics.task_duration_ms("default_disk_create"),
            "Materialization metrics"
        );

        let written = std::mem::take(&mut ctx.lock().await.written);
        tracing::info!(vm = %vm_name, files = written.len(), "VM assets materialized");

        Ok(MaterializeReport { metrics, written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Architecture, HostCapabilities, OsFamily};
    use crate::compiler::{
        BOOT_MEDIA_DRIVE_ID, ConfigCompiler, DEFAULT_EMULATION_DISK, DEFAULT_NATIVE_DISK,
        ImageType,
    };
    use crate::disk::{DiskAllocator, ImageConverter, NoopScopedAccess};
    use crate::pipeline::TaskOutcome;
    use crate::selection::SelectionState;
    use crate::vm::{LiveVm, VmDrive};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use vmforge_shared::errors::MaterializationError;

    #[derive(Default)]
    struct FakeVm {
        drives: Vec<VmDrive>,
        fail_share: bool,
        shares: SyncMutex<Vec<(PathBuf, bool)>>,
        media: SyncMutex<Vec<(String, PathBuf)>>,
    }

    impl FakeVm {
        fn with_cd() -> Self {
            Self {
                drives: vec![VmDrive {
                    id: BOOT_MEDIA_DRIVE_ID.to_string(),
                    image_type: ImageType::Cd,
                    removable: true,
                }],
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl LiveVm for FakeVm {
        fn drives(&self) -> Vec<VmDrive> {
            self.drives.clone()
        }

        async fn change_shared_directory(&self, path: &Path, read_only: bool) -> VmforgeResult<()> {
            if self.fail_share {
                return Err(VmforgeError::Internal("share refused".into()));
            }
            self.shares.lock().push((path.to_path_buf(), read_only));
            Ok(())
        }

        async fn change_medium(&self, drive_id: &str, path: &Path) -> VmforgeResult<()> {
            self.media
                .lock()
                .push((drive_id.to_string(), path.to_path_buf()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAllocator {
        fail: bool,
        calls: SyncMutex<Vec<(PathBuf, u64)>>,
    }

    #[async_trait]
    impl DiskAllocator for RecordingAllocator {
        async fn allocate(&self, path: &Path, size_mib: u64) -> VmforgeResult<()> {
            self.calls.lock().push((path.to_path_buf(), size_mib));
            if self.fail {
                return Err(VmforgeError::Internal("disk full".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingConverter {
        calls: SyncMutex<Vec<(PathBuf, PathBuf)>>,
    }

    #[async_trait]
    impl ImageConverter for RecordingConverter {
        async fn convert(&self, source: &Path, destination: &Path) -> VmforgeResult<()> {
            self.calls
                .lock()
                .push((source.to_path_buf(), destination.to_path_buf()));
            Ok(())
        }
    }

    struct Harness {
        dir: TempDir,
        allocator: Arc<RecordingAllocator>,
        converter: Arc<RecordingConverter>,
        materializer: Materializer,
        compiler: ConfigCompiler,
    }

    fn harness(conversion: bool, allocator: RecordingAllocator) -> Harness {
        let matrix = CapabilityMatrix::new(HostCapabilities {
            native_architecture: Architecture::Aarch64,
            native_backend_available: true,
            modern_native: true,
            conversion_available: conversion,
        });
        let allocator = Arc::new(allocator);
        let converter = Arc::new(RecordingConverter::default());
        let services = MaterializerServices {
            allocator: allocator.clone(),
            converter: converter.clone(),
            access: Arc::new(NoopScopedAccess),
        };
        Harness {
            dir: TempDir::new().unwrap(),
            allocator,
            converter,
            materializer: Materializer::new(matrix.clone(), services),
            compiler: ConfigCompiler::with_builtin_defaults(matrix),
        }
    }

    impl Harness {
        fn data_dir(&self) -> PathBuf {
            self.dir.path().join("vm.vmforge").join("Data")
        }

        fn source(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, name.as_bytes()).unwrap();
            path
        }

        async fn run(
            &self,
            selection: SelectionState,
            vm: Arc<dyn LiveVm>,
        ) -> VmforgeResult<MaterializeReport> {
            let config = self.compiler.compile(&selection).unwrap();
            let request = MaterializeRequest {
                config,
                selection,
                data_dir: self.data_dir(),
                vm,
            };
            self.materializer.run(request, &CancelToken::new()).await
        }
    }

    fn emulated(os: OsFamily) -> SelectionState {
        let mut s = SelectionState::new();
        s.set_name("test-vm");
        s.set_operating_system(os);
        s.set_architecture(Some(Architecture::Aarch64));
        s.set_target(Some("virt".into()));
        s
    }

    #[tokio::test]
    async fn test_default_disk_allocated_when_nothing_imported() {
        let h = harness(true, RecordingAllocator::default());
        let s = emulated(OsFamily::Other);
        let gib = s.storage_size_gib();

        let report = h.run(s, Arc::new(FakeVm::default())).await.unwrap();

        let expected = h.data_dir().join(DEFAULT_EMULATION_DISK);
        assert_eq!(*h.allocator.calls.lock(), vec![(expected.clone(), gib * 1024)]);
        assert_eq!(report.written, vec![expected]);
        assert!(h.data_dir().is_dir());
        assert!(report.metrics.task_duration_ms("default_disk_create").is_some());
        assert!(report.metrics.task_duration_ms("unknown_task").is_none());
        assert_eq!(
            report.metrics.task("boot_media_attach").unwrap().outcome,
            TaskOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_shared_directory_and_boot_media_attached() {
        let h = harness(true, RecordingAllocator::default());
        let iso = h.source("installer.iso");
        let mut s = emulated(OsFamily::Other);
        s.set_boot_image(Some(iso.clone()));
        s.set_shared_directory(Some(PathBuf::from("/home/user/share")));
        s.set_shared_directory_read_only(true);
        let vm = Arc::new(FakeVm::with_cd());

        h.run(s, vm.clone()).await.unwrap();

        assert_eq!(
            *vm.shares.lock(),
            vec![(PathBuf::from("/home/user/share"), true)]
        );
        assert_eq!(
            *vm.media.lock(),
            vec![(BOOT_MEDIA_DRIVE_ID.to_string(), iso)]
        );
    }

    #[tokio::test]
    async fn test_boot_media_skipped_without_cd_drive() {
        let h = harness(true, RecordingAllocator::default());
        let mut s = emulated(OsFamily::Other);
        s.set_boot_image(Some(h.source("installer.iso")));
        let vm = Arc::new(FakeVm::default());

        let report = h.run(s, vm.clone()).await.unwrap();

        assert!(vm.media.lock().is_empty());
        assert_eq!(
            report.metrics.task("boot_media_attach").unwrap().outcome,
            TaskOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_kernel_assets_copied_and_root_image_converted() {
        let h = harness(true, RecordingAllocator::default());
        let kernel = h.source("vmlinuz");
        let initrd = h.source("initrd.img");
        let root = h.source("root.img");
        let mut s = emulated(OsFamily::Linux);
        s.set_use_kernel_boot(true);
        s.set_kernel(Some(kernel));
        s.set_initial_ramdisk(Some(initrd));
        s.set_root_image(Some(root.clone()));

        let report = h.run(s, Arc::new(FakeVm::default())).await.unwrap();

        let data = h.data_dir();
        assert_eq!(std::fs::read(data.join("vmlinuz")).unwrap(), b"vmlinuz");
        assert_eq!(std::fs::read(data.join("initrd.img")).unwrap(), b"initrd.img");
        assert_eq!(
            *h.converter.calls.lock(),
            vec![(root, data.join("root.qcow2"))]
        );
        assert_eq!(h.allocator.calls.lock()[0].0, data.join(DEFAULT_EMULATION_DISK));
        assert_eq!(
            report.written,
            vec![
                data.join("vmlinuz"),
                data.join("initrd.img"),
                data.join("root.qcow2"),
                data.join(DEFAULT_EMULATION_DISK),
            ]
        );
    }

    #[tokio::test]
    async fn test_windows_disk_copied_verbatim_without_conversion() {
        let h = harness(false, RecordingAllocator::default());
        let disk = h.source("windows.vhdx");
        let mut s = emulated(OsFamily::Windows);
        s.set_windows_disk(Some(disk));

        let report = h.run(s, Arc::new(FakeVm::default())).await.unwrap();

        let copied = h.data_dir().join("windows.vhdx");
        assert_eq!(std::fs::read(&copied).unwrap(), b"windows.vhdx");
        assert!(h.converter.calls.lock().is_empty());
        assert!(h.allocator.calls.lock().is_empty());
        assert_eq!(report.written, vec![copied]);
    }

    #[tokio::test]
    async fn test_native_linux_allocates_raw_disk_and_never_converts() {
        let h = harness(true, RecordingAllocator::default());
        let mut s = SelectionState::new();
        s.set_name("native-vm");
        s.set_operating_system(OsFamily::Linux);
        s.set_use_native_backend(true);
        s.set_boot_image(Some(h.source("installer.iso")));
        let vm = Arc::new(FakeVm::with_cd());

        let report = h.run(s, vm.clone()).await.unwrap();

        assert!(vm.media.lock().is_empty());
        assert!(report.metrics.task("boot_media_attach").is_none());
        assert_eq!(
            h.allocator.calls.lock()[0].0,
            h.data_dir().join(DEFAULT_NATIVE_DISK)
        );
    }

    #[tokio::test]
    async fn test_allocation_failure_is_fatal_disk_creation() {
        let h = harness(
            true,
            RecordingAllocator {
                fail: true,
                ..RecordingAllocator::default()
            },
        );

        let err = h
            .run(emulated(OsFamily::Other), Arc::new(FakeVm::default()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::FatalDiskCreation { .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_default_disk_is_fatal_disk_creation() {
        let h = harness(true, RecordingAllocator::default());
        let mut s = emulated(OsFamily::Other);
        s.set_storage_size_gib(u64::MAX / 2);

        let err = h.run(s, Arc::new(FakeVm::default())).await.unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::FatalDiskCreation { .. })
        ));
        assert!(h.allocator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_stops_later_tasks() {
        let h = harness(true, RecordingAllocator::default());
        let mut s = emulated(OsFamily::Other);
        s.set_shared_directory(Some(PathBuf::from("/share")));
        let vm = Arc::new(FakeVm {
            fail_share: true,
            ..FakeVm::default()
        });

        let err = h.run(s, vm).await.unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::SharedDirectory { .. })
        ));
        assert!(h.allocator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_asset_reports_copy_error() {
        let h = harness(true, RecordingAllocator::default());
        let mut s = emulated(OsFamily::Linux);
        s.set_use_kernel_boot(true);
        s.set_kernel(Some(h.dir.path().join("missing-vmlinuz")));

        let err = h.run(s, Arc::new(FakeVm::default())).await.unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::Copy { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_touches_nothing() {
        let h = harness(true, RecordingAllocator::default());
        let s = emulated(OsFamily::Other);
        let config = h.compiler.compile(&s).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = h
            .materializer
            .run(
                MaterializeRequest {
                    config,
                    selection: s,
                    data_dir: h.data_dir(),
                    vm: Arc::new(FakeVm::default()),
                },
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VmforgeError::Materialization(MaterializationError::Cancelled)
        ));
        assert!(h.allocator.calls.lock().is_empty());
    }
}
