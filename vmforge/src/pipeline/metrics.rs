use super::task::TaskOutcome;

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub outcome: TaskOutcome,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

impl PipelineMetrics {
    pub fn task_duration_ms(&self, name: &str) -> Option<u128> {
        self.task(name).map(|task| task.duration_ms)
    }

    pub fn task(&self, name: &str) -> Option<&TaskMetrics> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Names of tasks that did work, in execution order.
    pub fn completed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|task| task.outcome == TaskOutcome::Completed)
            .map(|task| task.name.as_str())
            .collect()
    }
}
