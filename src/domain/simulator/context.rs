use std::collections::BTreeMap;

use crate::domain::simulator::clock::{Clock, SimTime};
use crate::domain::simulator::event::{Event, TraceEntry};
use crate::domain::sim_model::metrics::statistics::Metrics;
use crate::domain::sim_model::task::task::Task;
use crate::domain::sim_model::topology::topology::Topology;
use crate::domain::sim_model::utils::id::{NodeId, TaskId};
use crate::error::SimError;

/// Everything one run mutates, passed explicitly into every component.
///
/// Two contexts share nothing, so independent runs can live side by side in one process.
#[derive(Debug)]
pub struct SimContext {
    pub clock: Clock<Event>,
    pub topology: Topology,
    /// Every task known to the run, ordered by id.
    pub tasks: BTreeMap<TaskId, Task>,
    pub metrics: Metrics,
    /// Processed events, when trace recording is on.
    pub trace: Option<Vec<TraceEntry>>,
    pub enable_logging: bool,
}

impl SimContext {
    pub fn new(topology: Topology, record_trace: bool, enable_logging: bool) -> Self {
        Self {
            clock: Clock::new(),
            topology,
            tasks: BTreeMap::new(),
            metrics: Metrics::new(),
            trace: record_trace.then(Vec::new),
            enable_logging,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn task(&self, id: TaskId) -> Result<&Task, SimError> {
        self.tasks.get(&id).ok_or_else(|| SimError::Ordering(format!("event for unknown task {}", id)))
    }

    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, SimError> {
        self.tasks.get_mut(&id).ok_or_else(|| SimError::Ordering(format!("event for unknown task {}", id)))
    }

    /// Name of a node for log lines.
    pub fn node_name(&self, id: NodeId) -> String {
        self.topology.node(id).map(|n| n.name.to_string()).unwrap_or_default()
    }

    pub fn record(&mut self, time: SimTime, event: &Event) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEntry { time, task: event.task(), kind: event.kind() });
        }
    }

    /// Logs a lifecycle line prefixed with the simulated time.
    pub fn log(&self, level: log::Level, args: std::fmt::Arguments<'_>) {
        if self.enable_logging {
            log::log!(level, "[{:.2}]: {}", self.clock.now(), args);
        }
    }

    pub fn reset(&mut self) {
        self.clock.reset();
        self.topology.reset();
        self.tasks.clear();
        self.metrics.reset();
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
    }
}
