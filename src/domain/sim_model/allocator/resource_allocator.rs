use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::resource::link::DataFlow;
use crate::domain::sim_model::resource::node::{BufferedTask, Execution};
use crate::domain::sim_model::topology::router::Path;
use crate::domain::sim_model::topology::topology::Topology;
use crate::domain::sim_model::utils::id::{NodeId, TaskId};
use crate::error::{SimError, TaskFailure};

/// Outcome of asking for a resource on behalf of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The resource is held by the task now.
    Granted,
    /// The task waits in the node's FIFO buffer.
    Buffered,
    /// The task cannot be served; it fails with the given reason.
    Refused(TaskFailure),
}

/// Reserves and releases link bandwidth and node CPU.
///
/// Every mutation of a bandwidth pool, CPU pool or task buffer goes through here.
pub struct ResourceAllocator;

impl ResourceAllocator {
    /// Grants `bit_rate` on every link of the path, hop by hop.
    ///
    /// If a hop lacks free bandwidth the hops already granted are released again and the task is refused
    /// with `NetCongestion`. There is no waiting for bandwidth.
    pub fn grant_bandwidth(topology: &mut Topology, path: &Path, task: TaskId, bit_rate: f64, bits: f64, now: SimTime) -> Result<Admission, SimError> {
        let mut granted = Vec::with_capacity(path.hops());

        for link_id in &path.links {
            let link = topology.link_mut(*link_id).ok_or_else(|| SimError::Ordering(format!("path of task {} uses an unknown link", task)))?;

            if link.add_flow(DataFlow { task, bit_rate, bits, started_at: now })? {
                granted.push(*link_id);
                continue;
            }

            for granted_id in granted {
                if let Some(link) = topology.link_mut(granted_id) {
                    link.remove_flow(task)?;
                }
            }
            return Ok(Admission::Refused(TaskFailure::NetCongestion));
        }

        Ok(Admission::Granted)
    }

    /// Gives back the bandwidth held by the task on every link of the path, exactly once.
    ///
    /// Returns the bits still unsent at `now`, zero for a finished transfer.
    pub fn release_bandwidth(topology: &mut Topology, path: &Path, task: TaskId, now: SimTime) -> Result<f64, SimError> {
        let mut unsent: f64 = 0.0;
        for link_id in &path.links {
            let link = topology.link_mut(*link_id).ok_or_else(|| SimError::Ordering(format!("path of task {} uses an unknown link", task)))?;
            unsent = unsent.max(link.remove_flow(task)?.remaining_bits(now));
        }
        Ok(unsent)
    }

    /// Admits a task arriving at `node_id`.
    ///
    /// An idle node is left for the caller to start immediately (`Granted`); a busy node buffers the task if it fits.
    /// Exhausted nodes refuse every new task.
    pub fn admit(topology: &mut Topology, node_id: NodeId, entry: BufferedTask) -> Result<Admission, SimError> {
        let node = topology.node_mut(node_id).ok_or_else(|| SimError::Ordering(format!("task {} targets an unknown node", entry.task)))?;

        if node.is_exhausted() {
            return Ok(Admission::Refused(TaskFailure::NodeExhausted));
        }
        if !node.is_busy() && node.buffer.is_empty() {
            return Ok(Admission::Granted);
        }
        if node.buffer.append(entry) {
            Ok(Admission::Buffered)
        } else {
            Ok(Admission::Refused(TaskFailure::InsufficientBuffer))
        }
    }

    /// Hands the node's CPU to the task.
    pub fn reserve_cpu(topology: &mut Topology, node_id: NodeId, task: TaskId, cycles: f64, now: SimTime) -> Result<Execution, SimError> {
        let node = topology.node_mut(node_id).ok_or_else(|| SimError::Ordering(format!("task {} targets an unknown node", task)))?;
        node.reserve_cpu(task, cycles, now)
    }

    /// Releases the task's CPU and returns the next buffered task, which must be started by the caller.
    pub fn release_cpu(topology: &mut Topology, node_id: NodeId, task: TaskId) -> Result<Option<BufferedTask>, SimError> {
        let node = topology.node_mut(node_id).ok_or_else(|| SimError::Ordering(format!("task {} targets an unknown node", task)))?;
        node.release_cpu(task)?;
        Ok(node.buffer.pop())
    }

    /// Removes a waiting task from the node's buffer. Returns `false` if it was not buffered there.
    pub fn withdraw(topology: &mut Topology, node_id: NodeId, task: TaskId) -> bool {
        topology.node_mut(node_id).and_then(|node| node.buffer.remove(task)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sim_model::resource::node::Node;
    use crate::domain::sim_model::topology::router::{Router, RoutingWeight};
    use crate::domain::sim_model::utils::id::NodeName;
    use crate::domain::sim_model::utils::location::DistanceMetric;

    /// n0 -> n1 -> n2 where the second hop is the bottleneck.
    fn line() -> (Topology, Path) {
        let mut topology = Topology::new(DistanceMetric::Euclidean);
        for (i, name) in ["n0", "n1", "n2"].iter().enumerate() {
            topology.add_node(Node::new(i as u32, NodeName::new(*name), 10.0).with_buffer_size(Some(30.0))).unwrap();
        }
        topology.add_link("n0", "n1", 100.0, 0.0).unwrap();
        topology.add_link("n1", "n2", 50.0, 0.0).unwrap();

        let mut router = Router::new(RoutingWeight::Hops, false);
        let path = router.route(&topology, topology.node_id("n0").unwrap(), topology.node_id("n2").unwrap()).unwrap();
        (topology, path)
    }

    fn free_bandwidth(topology: &Topology, path: &Path) -> Vec<f64> {
        path.links.iter().map(|id| topology.link(*id).unwrap().free_bandwidth()).collect()
    }

    #[test]
    fn test_grant_and_release_along_path() {
        let (mut topology, path) = line();

        let admission = ResourceAllocator::grant_bandwidth(&mut topology, &path, TaskId(1), 40.0, 10.0, 0.0).unwrap();
        assert_eq!(admission, Admission::Granted);
        assert_eq!(free_bandwidth(&topology, &path), vec![60.0, 10.0]);

        assert_eq!(ResourceAllocator::release_bandwidth(&mut topology, &path, TaskId(1), 0.125).unwrap(), 5.0);
        assert_eq!(free_bandwidth(&topology, &path), vec![100.0, 50.0]);
        assert!(ResourceAllocator::release_bandwidth(&mut topology, &path, TaskId(1), 0.125).is_err());
    }

    #[test]
    fn test_refused_grant_rolls_back_earlier_hops() {
        let (mut topology, path) = line();

        let admission = ResourceAllocator::grant_bandwidth(&mut topology, &path, TaskId(1), 60.0, 10.0, 0.0).unwrap();

        assert_eq!(admission, Admission::Refused(TaskFailure::NetCongestion));
        assert_eq!(free_bandwidth(&topology, &path), vec![100.0, 50.0]);
        assert!(path.links.iter().all(|id| topology.link(*id).unwrap().flows().is_empty()));
    }

    #[test]
    fn test_admission_buffers_behind_a_busy_cpu() {
        let (mut topology, _) = line();
        let n2 = topology.node_id("n2").unwrap();
        let entry = |id: u64| BufferedTask { task: TaskId(id), bits: 20.0, cycles: 200.0 };

        assert_eq!(ResourceAllocator::admit(&mut topology, n2, entry(1)).unwrap(), Admission::Granted);
        ResourceAllocator::reserve_cpu(&mut topology, n2, TaskId(1), 200.0, 0.0).unwrap();

        assert_eq!(ResourceAllocator::admit(&mut topology, n2, entry(2)).unwrap(), Admission::Buffered);
        assert_eq!(ResourceAllocator::admit(&mut topology, n2, entry(3)).unwrap(), Admission::Refused(TaskFailure::InsufficientBuffer));

        let next = ResourceAllocator::release_cpu(&mut topology, n2, TaskId(1)).unwrap();
        assert_eq!(next.map(|e| e.task), Some(TaskId(2)));
        assert_eq!(topology.node(n2).unwrap().free_cpu_freq(), 10.0);
    }
}
