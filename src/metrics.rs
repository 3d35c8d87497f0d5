use std::time::Duration;

use tokio::time::Instant;

/// The four timed phases of a scheduling call, matching the step names the
/// original scheduler threads through `metrics.ScheduleStep(...)` calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleStep {
    Filter,
    Score,
    Select,
    AssignReplicas,
}

impl ScheduleStep {
    fn label(self) -> &'static str {
        match self {
            ScheduleStep::Filter => "filter",
            ScheduleStep::Score => "score",
            ScheduleStep::Select => "select",
            ScheduleStep::AssignReplicas => "assign_replicas",
        }
    }
}

/// Where step durations go. The default just logs them; a production
/// deployment would swap in a real metrics backend.
pub trait MetricsSink: Send + Sync {
    fn observe_step(&self, step: ScheduleStep, duration: Duration);
}

#[derive(Default)]
pub struct LoggingMetricsSink;

impl MetricsSink for LoggingMetricsSink {
    fn observe_step(&self, step: ScheduleStep, duration: Duration) {
        log::debug!("schedule step {} took {:?}", step.label(), duration);
    }
}

/// Times a step via RAII, the idiomatic stand-in for the teacher's
/// Go-flavored `defer metrics.ScheduleStep(...)(err)` pattern.
pub struct StepTimer<'a> {
    sink: &'a dyn MetricsSink,
    step: ScheduleStep,
    start: Instant,
}

impl<'a> StepTimer<'a> {
    pub fn start(sink: &'a dyn MetricsSink, step: ScheduleStep) -> Self {
        Self {
            sink,
            step,
            start: Instant::now(),
        }
    }
}

impl Drop for StepTimer<'_> {
    fn drop(&mut self) {
        self.sink.observe_step(self.step, self.start.elapsed());
    }
}
