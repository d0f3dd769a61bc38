//! Ordered, cancellable task execution.
//!
//! ```text
//! Pipeline → Tasks (run one after another against a shared context)
//! ```
//!
//! A task either completes, reports that it had nothing to do, or fails.
//! The first failure stops the pipeline; tasks that already ran are not
//! undone. Cancellation is checked before each task starts.
//!
//! ```ignore
//! let tasks: Vec<BoxedTask<Ctx>> = vec![Box::new(TaskA), Box::new(TaskB)];
//! let metrics = PipelineExecutor::execute(tasks, ctx, &CancelToken::new()).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod cancel;
mod executor;
mod metrics;
mod task;

pub use cancel::CancelToken;
pub use executor::PipelineExecutor;
pub use metrics::{PipelineMetrics, TaskMetrics};
pub use task::{BoxedTask, PipelineTask, TaskOutcome};
