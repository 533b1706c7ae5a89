use crate::domain::simulator::env::Env;
use crate::domain::sim_model::policy::OffloadPolicy;
use crate::domain::sim_model::task::task::TaskDescriptor;
use crate::domain::sim_model::topology::router::{Router, RoutingWeight};
use crate::domain::sim_model::utils::id::NodeName;

/// Picks the node with the smallest estimated transmission, queueing and execution time.
///
/// Unreachable and exhausted nodes are skipped. Ties go to the node that comes first in the topology.
#[derive(Debug, Clone)]
pub struct GreedyPolicy {
    router: Router,
}

impl GreedyPolicy {
    pub fn new(weight: RoutingWeight) -> Self {
        Self { router: Router::new(weight, true) }
    }

    /// Seconds until `task` would be done on `dst`, or `None` if it cannot get there.
    pub fn estimate(&mut self, env: &Env, task: &TaskDescriptor, src: &str, dst: &str) -> Option<f64> {
        task.validate().ok()?;
        let topology = env.topology();
        let src_id = topology.node_id(src).ok()?;
        let dst_id = topology.node_id(dst).ok()?;
        let node = topology.node(dst_id)?;

        if node.is_exhausted() {
            return None;
        }

        let path = self.router.route(topology, src_id, dst_id).ok()?;
        let per_hop = task.size / task.trans_bit_rate;
        let latency: f64 = path.links.iter().filter_map(|l| topology.link(*l)).map(|l| l.base_latency).sum();

        let transmission = per_hop * path.hops() as f64 + latency;
        let execution = task.cycles() / node.max_cpu_freq();

        Some(transmission + node.estimated_wait(env.now()) + execution)
    }
}

impl Default for GreedyPolicy {
    fn default() -> Self {
        Self::new(RoutingWeight::Hops)
    }
}

impl OffloadPolicy for GreedyPolicy {
    fn act(&mut self, env: &Env, task: &TaskDescriptor, src: &str) -> Option<NodeName> {
        let mut best: Option<(f64, NodeName)> = None;

        for name in env.topology().node_names() {
            let Some(estimate) = self.estimate(env, task, src, name.as_str()) else { continue };

            if best.as_ref().is_none_or(|(b, _)| estimate < *b) {
                best = Some((estimate, name));
            }
        }

        best.map(|(_, name)| name)
    }
}
