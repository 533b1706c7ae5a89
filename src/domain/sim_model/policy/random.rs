use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::simulator::env::Env;
use crate::domain::sim_model::policy::OffloadPolicy;
use crate::domain::sim_model::task::task::TaskDescriptor;
use crate::domain::sim_model::utils::id::NodeName;

/// Uniformly random destination. Seeded so that runs are repeatable.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl OffloadPolicy for RandomPolicy {
    fn act(&mut self, env: &Env, _task: &TaskDescriptor, _src: &str) -> Option<NodeName> {
        let count = env.topology().node_count();
        if count == 0 {
            return None;
        }

        let idx = self.rng.random_range(0..count);
        env.topology().nodes().nth(idx).map(|(_, node)| node.name.clone())
    }
}
