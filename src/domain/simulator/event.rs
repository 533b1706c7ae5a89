use std::fmt;

use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::utils::id::TaskId;

/// One step of a task's lifecycle, scheduled on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The task is generated at its source node and starts transmitting (or queues locally).
    Dispatch(TaskId),
    /// The last bit of the task reached the destination node.
    TransmissionDone(TaskId),
    /// The destination node finished executing the task.
    ExecutionDone(TaskId),
    /// `generation_time + ddl` has been reached.
    Deadline(TaskId),
}

impl Event {
    pub fn task(&self) -> TaskId {
        match self {
            Event::Dispatch(id) | Event::TransmissionDone(id) | Event::ExecutionDone(id) | Event::Deadline(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Dispatch(_) => "Dispatch",
            Event::TransmissionDone(_) => "TransmissionDone",
            Event::ExecutionDone(_) => "ExecutionDone",
            Event::Deadline(_) => "Deadline",
        }
    }
}

/// A processed event, kept when trace recording is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub time: SimTime,
    pub task: TaskId,
    pub kind: &'static str,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}] {} {}", self.time, self.kind, self.task)
    }
}
