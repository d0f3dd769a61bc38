//! Task: copy kernel boot assets and pick the image to import.
//!
//! - Linux with kernel boot: kernel and initrd are copied verbatim; the root
//!   image (if any) is imported next.
//! - Windows: the existing Windows disk (if any) is imported next.

use super::{copy_asset, log_task_error, task_start};
use crate::capability::OsFamily;
use crate::compiler::asset_filename;
use crate::materialize::types::MaterializeCtx;
use crate::pipeline::{PipelineTask, TaskOutcome};
use async_trait::async_trait;
use vmforge_shared::errors::VmforgeResult;

pub struct BootAssetsTask;

#[async_trait]
impl PipelineTask<MaterializeCtx> for BootAssetsTask {
    async fn run(self: Box<Self>, ctx: MaterializeCtx) -> VmforgeResult<TaskOutcome> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (assets, existing_image, data_dir, access) = {
            let ctx = ctx.lock().await;
            let selection = &ctx.selection;
            let (assets, existing_image) = match selection.operating_system() {
                OsFamily::Linux if selection.use_kernel_boot() => {
                    let assets: Vec<_> = selection
                        .kernel()
                        .into_iter()
                        .chain(selection.initial_ramdisk())
                        .map(|p| p.to_path_buf())
                        .collect();
                    (assets, selection.root_image().map(|p| p.to_path_buf()))
                }
                OsFamily::Windows => (Vec::new(), selection.windows_disk().map(|p| p.to_path_buf())),
                _ => (Vec::new(), None),
            };
            (
                assets,
                existing_image,
                ctx.data_dir.clone(),
                ctx.services.access.clone(),
            )
        };

        let mut copied = Vec::with_capacity(assets.len());
        for source in &assets {
            let destination = data_dir.join(asset_filename(source));
            copy_asset(access.as_ref(), source, &destination)
                .await
                .inspect_err(|e| log_task_error(&vm_name, task_name, e))?;
            copied.push(destination);
        }

        let did_work = !copied.is_empty() || existing_image.is_some();
        let mut ctx = ctx.lock().await;
        ctx.written.extend(copied);
        ctx.existing_image = existing_image;

        Ok(if did_work {
            TaskOutcome::Completed
        } else {
            TaskOutcome::Skipped
        })
    }

    fn name(&self) -> &str {
        "boot_assets_import"
    }
}
