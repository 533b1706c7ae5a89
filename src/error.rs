use thiserror::Error;

use crate::domain::sim_model::utils::id::TaskId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to read task dataset: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to build internal simulation model: {0}")]
    ModelConstructionError(String),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the simulation engine itself.
///
/// `NoPath`, `UnknownNode`, `DuplicateTaskId` and `InvalidTask` reject a single submission and leave the run intact.
/// `Ordering` signals a broken engine invariant and aborts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("NoPathError: Node {{{dst}}} is inaccessible from Node {{{src}}}")]
    NoPath { src: String, dst: String },

    #[error("UnknownNodeError: Node {{{0}}} does not exist in the topology")]
    UnknownNode(String),

    #[error("DuplicateTaskIdError: Task {{{0}}} was already submitted")]
    DuplicateTaskId(TaskId),

    #[error("InvalidTaskError: Task {{{0}}} {1}")]
    InvalidTask(TaskId, String),

    #[error("OrderingError: {0}")]
    Ordering(String),
}

/// Reason a task failed. Recorded on the task and surfaced through the metrics, never aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskFailure {
    /// No route between source and destination at submission.
    NoPath,
    /// A link on the path had less free bandwidth than the requested bit rate.
    NetCongestion,
    /// The destination buffer could not hold the task.
    InsufficientBuffer,
    /// The destination node has spent its energy budget.
    NodeExhausted,
    /// The deadline fired before execution started.
    Timeout,
}

impl TaskFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFailure::NoPath => "NoPathError",
            TaskFailure::NetCongestion => "NetCongestionError",
            TaskFailure::InsufficientBuffer => "InsufficientBufferError",
            TaskFailure::NodeExhausted => "NodeExhaustedError",
            TaskFailure::Timeout => "TimeoutError",
        }
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
