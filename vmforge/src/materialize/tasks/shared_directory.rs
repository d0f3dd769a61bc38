//! Task: attach the selected shared directory to the created VM.

use super::{log_task_error, task_start};
use crate::compiler::CompiledConfiguration;
use crate::materialize::types::MaterializeCtx;
use crate::pipeline::{PipelineTask, TaskOutcome};
use async_trait::async_trait;
use vmforge_shared::errors::{MaterializationError, VmforgeError, VmforgeResult};

pub struct SharedDirectoryTask;

#[async_trait]
impl PipelineTask<MaterializeCtx> for SharedDirectoryTask {
    async fn run(self: Box<Self>, ctx: MaterializeCtx) -> VmforgeResult<TaskOutcome> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (vm, share) = {
            let ctx = ctx.lock().await;
            // The native backend only carries shares the host can honour.
            let share = match &ctx.config {
                CompiledConfiguration::Emulation(_) => ctx
                    .selection
                    .shared_directory()
                    .map(|path| (path.to_path_buf(), ctx.selection.shared_directory_read_only())),
                CompiledConfiguration::Native(native) => native
                    .shared_directories
                    .first()
                    .map(|share| (share.path.clone(), share.read_only)),
            };
            (ctx.vm.clone(), share)
        };

        let Some((path, read_only)) = share else {
            return Ok(TaskOutcome::Skipped);
        };

        vm.change_shared_directory(&path, read_only)
            .await
            .map_err(|e| {
                VmforgeError::from(MaterializationError::SharedDirectory {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            })
            .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;

        tracing::info!(
            vm = %vm_name,
            path = %path.display(),
            read_only,
            "Attached shared directory"
        );
        Ok(TaskOutcome::Completed)
    }

    fn name(&self) -> &str {
        "shared_directory_attach"
    }
}
