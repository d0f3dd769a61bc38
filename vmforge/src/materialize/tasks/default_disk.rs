//! Task: allocate the empty disk the compiled configuration refers to.
//!
//! - Emulation: `data.qcow2` whenever a drive names it.
//! - Native: the `New` disk entry, if any.

use super::{log_task_error, task_start};
use crate::compiler::{CompiledConfiguration, DEFAULT_EMULATION_DISK, NativeDisk};
use crate::materialize::types::MaterializeCtx;
use crate::pipeline::{PipelineTask, TaskOutcome};
use async_trait::async_trait;
use vmforge_shared::errors::{MaterializationError, VmforgeError, VmforgeResult};

pub struct DefaultDiskTask;

#[async_trait]
impl PipelineTask<MaterializeCtx> for DefaultDiskTask {
    async fn run(self: Box<Self>, ctx: MaterializeCtx) -> VmforgeResult<TaskOutcome> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (planned, allocator) = {
            let ctx = ctx.lock().await;
            let planned = match &ctx.config {
                CompiledConfiguration::Emulation(emu) => emu
                    .drives
                    .iter()
                    .any(|d| d.image_name.as_deref() == Some(DEFAULT_EMULATION_DISK))
                    .then(|| {
                        let gib = ctx.selection.storage_size_gib();
                        (DEFAULT_EMULATION_DISK.to_string(), gib.checked_mul(1024))
                    }),
                CompiledConfiguration::Native(native) => {
                    native.disks.iter().find_map(|disk| match disk {
                        NativeDisk::New {
                            image_name,
                            size_mib,
                        } => Some((image_name.clone(), Some(*size_mib))),
                        _ => None,
                    })
                }
            };
            (
                planned.map(|(name, size)| (ctx.data_dir.join(name), size)),
                ctx.services.allocator.clone(),
            )
        };

        let Some((path, size_mib)) = planned else {
            return Ok(TaskOutcome::Skipped);
        };
        let size_mib = size_mib
            .ok_or_else(|| {
                VmforgeError::from(MaterializationError::FatalDiskCreation {
                    path: path.clone(),
                    reason: "disk size overflows".into(),
                })
            })
            .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;

        allocator
            .allocate(&path, size_mib)
            .await
            .map_err(|e| match e {
                e @ VmforgeError::Materialization(MaterializationError::FatalDiskCreation {
                    ..
                }) => e,
                other => MaterializationError::FatalDiskCreation {
                    path: path.clone(),
                    reason: other.to_string(),
                }
                .into(),
            })
            .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;

        ctx.lock().await.written.push(path);
        Ok(TaskOutcome::Completed)
    }

    fn name(&self) -> &str {
        "default_disk_create"
    }
}
