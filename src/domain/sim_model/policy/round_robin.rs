use crate::domain::simulator::env::Env;
use crate::domain::sim_model::policy::OffloadPolicy;
use crate::domain::sim_model::task::task::TaskDescriptor;
use crate::domain::sim_model::utils::id::NodeName;

/// Cycles through the nodes in topology order.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinPolicy {
    idx: usize,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OffloadPolicy for RoundRobinPolicy {
    fn act(&mut self, env: &Env, _task: &TaskDescriptor, _src: &str) -> Option<NodeName> {
        let count = env.topology().node_count();
        if count == 0 {
            return None;
        }

        let (_, node) = env.topology().nodes().nth(self.idx % count)?;
        self.idx = (self.idx + 1) % count;
        Some(node.name.clone())
    }
}
