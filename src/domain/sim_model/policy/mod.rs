use crate::domain::simulator::env::Env;
use crate::domain::sim_model::task::task::TaskDescriptor;
use crate::domain::sim_model::utils::id::NodeName;

pub mod greedy;
pub mod random;
pub mod round_robin;

/// Picks the destination node of a task before it is submitted.
///
/// Policies sit above the engine and only read its state; returning `None` means no node is acceptable.
pub trait OffloadPolicy {
    fn act(&mut self, env: &Env, task: &TaskDescriptor, src: &str) -> Option<NodeName>;
}
