//! Task: insert the boot image into the removable boot-media drive.

use super::{log_task_error, task_start};
use crate::compiler::{BOOT_MEDIA_DRIVE_ID, ImageType};
use crate::materialize::types::MaterializeCtx;
use crate::pipeline::{PipelineTask, TaskOutcome};
use async_trait::async_trait;
use vmforge_shared::errors::{MaterializationError, VmforgeError, VmforgeResult};

pub struct BootMediaTask;

#[async_trait]
impl PipelineTask<MaterializeCtx> for BootMediaTask {
    async fn run(self: Box<Self>, ctx: MaterializeCtx) -> VmforgeResult<TaskOutcome> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (vm, image) = {
            let ctx = ctx.lock().await;
            let image = if ctx.selection.skip_boot_image() {
                None
            } else {
                ctx.selection.boot_image().map(|p| p.to_path_buf())
            };
            (ctx.vm.clone(), image)
        };

        let Some(image) = image else {
            return Ok(TaskOutcome::Skipped);
        };

        let drive = vm.drives().into_iter().find(|drive| {
            drive.id == BOOT_MEDIA_DRIVE_ID && drive.removable && drive.image_type == ImageType::Cd
        });
        let Some(drive) = drive else {
            tracing::debug!(vm = %vm_name, "No boot media drive on created VM");
            return Ok(TaskOutcome::Skipped);
        };

        vm.change_medium(&drive.id, &image)
            .await
            .map_err(|e| {
                VmforgeError::from(MaterializationError::ChangeMedium {
                    drive: drive.id.clone(),
                    reason: e.to_string(),
                })
            })
            .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;

        tracing::info!(
            vm = %vm_name,
            drive = %drive.id,
            image = %image.display(),
            "Attached boot media"
        );
        Ok(TaskOutcome::Completed)
    }

    fn name(&self) -> &str {
        "boot_media_attach"
    }
}
