//! Sequential pipeline executor.

use super::cancel::CancelToken;
use super::metrics::{PipelineMetrics, TaskMetrics};
use super::task::BoxedTask;
use std::time::Instant;
use vmforge_shared::errors::{MaterializationError, VmforgeResult};

pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run `tasks` in order against `ctx`.
    ///
    /// Stops at the first failing task and returns its error. A cancelled
    /// token stops the pipeline before the next task with
    /// [`MaterializationError::Cancelled`].
    pub async fn execute<Ctx>(
        tasks: Vec<BoxedTask<Ctx>>,
        ctx: Ctx,
        cancel: &CancelToken,
    ) -> VmforgeResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut task_metrics = Vec::with_capacity(tasks.len());

        for task in tasks {
            let name = task.name().to_string();
            if cancel.is_cancelled() {
                tracing::info!(task = %name, "Pipeline cancelled before task");
                return Err(MaterializationError::Cancelled.into());
            }

            let task_start = Instant::now();
            let outcome = task.run(ctx.clone()).await?;
            let duration_ms = task_start.elapsed().as_millis();
            tracing::debug!(task = %name, ?outcome, duration_ms = duration_ms as u64, "Task finished");

            task_metrics.push(TaskMetrics {
                name,
                outcome,
                duration_ms,
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            tasks: task_metrics,
        })
    }
}
