use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;

use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::task::task::{Task, TaskState};
use crate::domain::sim_model::topology::topology::Topology;
use crate::error::{Result, TaskFailure};

/// Target of the structured settlement events.
pub const ANALYTICS_TARGET: &str = "offload_sim::analytics";

/// Settled task as reported to external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRecord {
    #[serde(rename = "TaskID")]
    pub id: u64,
    pub task_name: String,
    pub src_name: String,
    pub dst_name: String,
    pub status: String,
    pub failure: Option<String>,
    pub generation_time: SimTime,
    pub settle_time: SimTime,
    pub trans_time: f64,
    pub wait_time: f64,
    pub exe_time: f64,
}

impl TaskRecord {
    pub fn from_task(task: &Task, topology: &Topology) -> Self {
        let name = |id| topology.node(id).map(|n| n.name.to_string()).unwrap_or_default();

        Self {
            id: task.id().0,
            task_name: task.descriptor.name.to_string(),
            src_name: name(task.src),
            dst_name: name(task.dst),
            status: task.state().to_string(),
            failure: task.failure.map(|f| f.to_string()),
            generation_time: task.generation_time,
            settle_time: task.settle_time.unwrap_or(task.generation_time),
            trans_time: task.trans_time,
            wait_time: task.wait_time,
            exe_time: task.exe_time,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskState::Completed.to_string()
    }

    /// Generation to completion: waiting (transmission included) plus execution.
    pub fn latency(&self) -> f64 {
        self.wait_time + self.exe_time
    }
}

/// Per-node summary produced when a run is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeRecord {
    pub node_name: String,
    pub energy: f64,
    pub busy_time: f64,
    pub idle_time: f64,
    /// Busy share of the observed time.
    pub utilization: f64,
    pub exhausted: bool,
}

/// Accumulates settled tasks and closing node summaries. Produces nothing by itself beyond accumulation.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    tasks: Vec<TaskRecord>,
    failures: BTreeMap<TaskFailure, usize>,
    nodes: Vec<NodeRecord>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_task(&mut self, task: &Task, topology: &Topology) {
        if let Some(failure) = task.failure {
            *self.failures.entry(failure).or_insert(0) += 1;
        }
        self.tasks.push(TaskRecord::from_task(task, topology));
    }

    pub fn record_nodes(&mut self, topology: &Topology) {
        self.nodes = topology
            .nodes()
            .map(|(_, node)| {
                let observed = node.energy.busy_time() + node.energy.idle_time();
                NodeRecord {
                    node_name: node.name.to_string(),
                    energy: node.energy.consumed(),
                    busy_time: node.energy.busy_time(),
                    idle_time: node.energy.idle_time(),
                    utilization: if observed > 0.0 { node.energy.busy_time() / observed } else { 0.0 },
                    exhausted: node.is_exhausted(),
                }
            })
            .collect();
    }

    /// Settled tasks in settlement order.
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn task(&self, id: u64) -> Option<&TaskRecord> {
        self.tasks.iter().find(|r| r.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.is_completed()).count()
    }

    pub fn failure_count(&self, failure: TaskFailure) -> usize {
        self.failures.get(&failure).copied().unwrap_or(0)
    }

    pub fn failure_counts(&self) -> &BTreeMap<TaskFailure, usize> {
        &self.failures
    }

    /// Completed tasks over all settled tasks. Zero when nothing settled.
    pub fn success_rate(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.tasks.len() as f64
    }

    /// Mean latency of completed tasks, `None` if no task completed.
    pub fn avg_latency(&self) -> Option<f64> {
        let latencies: Vec<f64> = self.tasks.iter().filter(|r| r.is_completed()).map(|r| r.latency()).collect();

        if latencies.is_empty() {
            return None;
        }
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    }

    /// Writes the per-task records as CSV.
    pub fn write_csv(&self, file_path: &str) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(file_path)?);

        for record in &self.tasks {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(())
    }

    pub fn reset(&mut self) {
        self.tasks.clear();
        self.failures.clear();
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sim_model::resource::node::Node;
    use crate::domain::sim_model::task::task::TaskDescriptor;
    use crate::domain::sim_model::topology::router::Path;
    use crate::domain::sim_model::utils::id::NodeName;
    use crate::domain::sim_model::utils::location::DistanceMetric;

    fn settled(topology: &Topology, id: u64, state: TaskState, failure: Option<TaskFailure>, wait: f64, exe: f64) -> Task {
        let n0 = topology.node_id("n0").unwrap();
        let mut task = Task::new(TaskDescriptor::new(id, 1.0, 1.0, 1.0, 10.0), n0, n0, Path::new(), 0.0);
        task.transition(TaskState::Queued).unwrap();
        if state == TaskState::Completed {
            task.transition(TaskState::Executing).unwrap();
        }
        task.wait_time = wait;
        task.exe_time = exe;
        task.settle(state, failure, wait + exe).unwrap();
        task
    }

    #[test]
    fn test_aggregates() {
        let mut topology = Topology::new(DistanceMetric::Euclidean);
        topology.add_node(Node::new(0, NodeName::new("n0"), 1.0)).unwrap();
        let mut metrics = Metrics::new();

        assert_eq!(metrics.success_rate(), 0.0);
        assert_eq!(metrics.avg_latency(), None);

        metrics.record_task(&settled(&topology, 0, TaskState::Completed, None, 1.0, 2.0), &topology);
        metrics.record_task(&settled(&topology, 1, TaskState::Completed, None, 3.0, 4.0), &topology);
        metrics.record_task(&settled(&topology, 2, TaskState::FailedTimeout, Some(TaskFailure::Timeout), 10.0, 0.0), &topology);

        assert!((metrics.success_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.avg_latency(), Some(5.0));
        assert_eq!(metrics.failure_count(TaskFailure::Timeout), 1);
        assert_eq!(metrics.task(1).map(|r| r.src_name.as_str()), Some("n0"));
    }
}
