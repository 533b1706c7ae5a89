use std::fmt;

use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::topology::router::Path;
use crate::domain::sim_model::utils::id::{NodeId, TaskId, TaskName};
use crate::error::{SimError, TaskFailure};

/// What a caller submits: the work itself, independent of where it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub name: TaskName,
    /// Size in bits, both transmitted and processed.
    pub size: f64,
    pub cycles_per_bit: f64,
    /// Requested bit rate on every link of the path.
    pub trans_bit_rate: f64,
    /// Longest tolerable wait from generation until execution starts.
    pub ddl: f64,
}

impl TaskDescriptor {
    pub fn new(id: u64, size: f64, cycles_per_bit: f64, trans_bit_rate: f64, ddl: f64) -> Self {
        Self { id: TaskId(id), name: TaskName::new(format!("t{}", id)), size, cycles_per_bit, trans_bit_rate, ddl }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = TaskName::new(name);
        self
    }

    /// Rejects descriptors that could never be simulated: sizes, cycle counts and rates must be positive and
    /// finite, the deadline must be a number.
    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [("size", self.size), ("cyclesPerBit", self.cycles_per_bit), ("transBitRate", self.trans_bit_rate)];
        if let Some((field, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(SimError::InvalidTask(self.id, format!("needs a positive finite {}, got {}", field, value)));
        }
        if self.ddl.is_nan() {
            return Err(SimError::InvalidTask(self.id, "has a NaN deadline".to_string()));
        }
        Ok(())
    }

    /// CPU cycles needed to process the whole task.
    pub fn cycles(&self) -> f64 {
        self.size * self.cycles_per_bit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Generated,
    Transmitting,
    Queued,
    Executing,
    Completed,
    FailedTimeout,
    FailedResource,
    /// Rejected at submission because the destination is unreachable.
    FailedNoPath,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::FailedTimeout | TaskState::FailedResource | TaskState::FailedNoPath)
    }

    /// Allowed edges of the lifecycle state machine.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        match (self, next) {
            (Generated, Transmitting | Queued | FailedResource | FailedTimeout) => true,
            (Transmitting, Queued | FailedResource | FailedTimeout) => true,
            (Queued, Executing | FailedTimeout) => true,
            (Executing, Completed) => true,
            _ => false,
        }
    }

    pub fn failed(failure: TaskFailure) -> TaskState {
        match failure {
            TaskFailure::Timeout => TaskState::FailedTimeout,
            TaskFailure::NoPath => TaskState::FailedNoPath,
            TaskFailure::NetCongestion | TaskFailure::InsufficientBuffer | TaskFailure::NodeExhausted => TaskState::FailedResource,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A submitted task and everything measured about it.
#[derive(Debug, Clone)]
pub struct Task {
    pub descriptor: TaskDescriptor,
    pub src: NodeId,
    pub dst: NodeId,
    pub path: Path,
    state: TaskState,
    pub failure: Option<TaskFailure>,

    pub generation_time: SimTime,
    pub settle_time: Option<SimTime>,
    /// Granted while executing.
    pub cpu_freq: Option<f64>,
    pub trans_time: f64,
    /// Transmission plus queueing, measured from generation to execution start.
    pub wait_time: f64,
    pub exe_time: f64,
}

impl Task {
    pub fn new(descriptor: TaskDescriptor, src: NodeId, dst: NodeId, path: Path, generation_time: SimTime) -> Self {
        Self {
            descriptor,
            src,
            dst,
            path,
            state: TaskState::Generated,
            failure: None,
            generation_time,
            settle_time: None,
            cpu_freq: None,
            trans_time: 0.0,
            wait_time: 0.0,
            exe_time: 0.0,
        }
    }

    pub fn id(&self) -> TaskId {
        self.descriptor.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_terminal()
    }

    /// Instant at which the deadline fires.
    pub fn deadline(&self) -> SimTime {
        self.generation_time + self.descriptor.ddl
    }

    /// Transmission time over the path: every hop sends the whole task at the requested rate, plus each link's base latency.
    pub fn transmission_time(&self, base_latencies: impl Iterator<Item = f64>) -> f64 {
        let per_hop = self.descriptor.size / self.descriptor.trans_bit_rate;
        per_hop * self.path.hops() as f64 + base_latencies.sum::<f64>()
    }

    /// Moves the task along the lifecycle. Terminal states are final.
    pub fn transition(&mut self, next: TaskState) -> Result<(), SimError> {
        if !self.state.can_transition_to(next) {
            return Err(SimError::Ordering(format!("task {} cannot move from {} to {}", self.id(), self.state, next)));
        }
        self.state = next;
        Ok(())
    }

    /// Sets the terminal state of a task. Called exactly once per task.
    pub fn settle(&mut self, state: TaskState, failure: Option<TaskFailure>, now: SimTime) -> Result<(), SimError> {
        if !state.is_terminal() {
            return Err(SimError::Ordering(format!("task {} cannot settle in non-terminal state {}", self.id(), state)));
        }
        if state == TaskState::FailedNoPath && self.state == TaskState::Generated {
            self.state = state;
        } else {
            self.transition(state)?;
        }
        self.failure = failure;
        self.settle_time = Some(now);
        Ok(())
    }
}
