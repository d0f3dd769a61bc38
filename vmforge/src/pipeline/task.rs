//! Task trait for pipeline execution.

use async_trait::async_trait;
use vmforge_shared::errors::VmforgeResult;

/// What a task did when it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// Preconditions for the task were absent; nothing was touched.
    Skipped,
}

/// A unit of work run against a shared context.
///
/// The context is cloned per task; use interior mutability for outputs
/// later tasks consume.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    async fn run(self: Box<Self>, ctx: Ctx) -> VmforgeResult<TaskOutcome>;

    /// Stable name used in logs and metrics.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
