//! Task: bring the selected existing image into the data directory.
//!
//! Converted to qcow2 where the host can convert, copied verbatim otherwise.

use super::{copy_asset, log_task_error, task_start};
use crate::compiler::destination_filename;
use crate::materialize::types::MaterializeCtx;
use crate::pipeline::{PipelineTask, TaskOutcome};
use async_trait::async_trait;
use vmforge_shared::errors::VmforgeResult;

pub struct ExistingImageTask;

#[async_trait]
impl PipelineTask<MaterializeCtx> for ExistingImageTask {
    async fn run(self: Box<Self>, ctx: MaterializeCtx) -> VmforgeResult<TaskOutcome> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (source, data_dir, conversion, services) = {
            let ctx = ctx.lock().await;
            (
                ctx.existing_image.clone(),
                ctx.data_dir.clone(),
                ctx.conversion,
                ctx.services.clone(),
            )
        };

        let Some(source) = source else {
            return Ok(TaskOutcome::Skipped);
        };

        let destination = data_dir.join(destination_filename(&source, conversion));
        if conversion {
            let _guard = services.access.acquire(&source)?;
            services
                .converter
                .convert(&source, &destination)
                .await
                .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;
        } else {
            copy_asset(services.access.as_ref(), &source, &destination)
                .await
                .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;
        }

        tracing::info!(
            vm = %vm_name,
            source = %source.display(),
            destination = %destination.display(),
            converted = conversion,
            "Imported existing image"
        );

        ctx.lock().await.written.push(destination);
        Ok(TaskOutcome::Completed)
    }

    fn name(&self) -> &str {
        "existing_image_import"
    }
}
