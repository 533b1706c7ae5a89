use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::resource::node::Node;
use crate::domain::sim_model::topology::topology::Topology;
use crate::error::SimError;

/// Per-node energy state, integrated lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyMeter {
    consumed: f64,
    last_update: SimTime,
    budget: Option<f64>,
    exhausted: bool,
    busy_time: f64,
    idle_time: f64,
}

impl EnergyMeter {
    pub fn new(budget: Option<f64>) -> Self {
        Self { consumed: 0.0, last_update: 0.0, budget, exhausted: false, busy_time: 0.0, idle_time: 0.0 }
    }

    pub fn consumed(&self) -> f64 {
        self.consumed
    }

    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn busy_time(&self) -> f64 {
        self.busy_time
    }

    pub fn idle_time(&self) -> f64 {
        self.idle_time
    }

    pub fn reset(&mut self) {
        *self = EnergyMeter::new(self.budget);
    }
}

/// Integrates idle and execution power over simulated time.
///
/// A node is touched at every transition that changes its power state. Between two touches the draw is
/// constant, so each touch adds `power * dt` for the interval since the previous one.
pub struct EnergyAccountant;

impl EnergyAccountant {
    /// Brings the node's meter up to `now`.
    pub fn accrue(node: &mut Node, now: SimTime) -> Result<(), SimError> {
        let last = node.energy.last_update;
        if now < last {
            return Err(SimError::Ordering(format!("energy of Node {{{}}} last updated at {}, cannot accrue at {}", node.name, last, now)));
        }

        let dt = now - last;
        if dt > 0.0 {
            let power = node.power_draw();
            let busy = node.is_busy();
            let meter = &mut node.energy;

            meter.consumed += power * dt;
            if busy {
                meter.busy_time += dt;
            } else {
                meter.idle_time += dt;
            }
        }
        node.energy.last_update = now;

        if let Some(budget) = node.energy.budget {
            if !node.energy.exhausted && node.energy.consumed >= budget {
                node.energy.exhausted = true;
                log::warn!("Node {{{}}} exhausted its energy budget of {} at {:.2}", node.name, budget, now);
            }
        }

        Ok(())
    }

    /// Accrues every node up to `now`, used when a run stops.
    pub fn settle_all(topology: &mut Topology, now: SimTime) -> Result<(), SimError> {
        for (_, node) in topology.nodes_mut() {
            Self::accrue(node, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sim_model::utils::id::{NodeName, TaskId};

    fn node() -> Node {
        Node::new(0, NodeName::new("n0"), 2.0).with_power(0.5, 0.25)
    }

    #[test]
    fn test_idle_and_busy_intervals() {
        let mut node = node();

        EnergyAccountant::accrue(&mut node, 4.0).unwrap();
        node.reserve_cpu(TaskId(1), 6.0, 4.0).unwrap();
        EnergyAccountant::accrue(&mut node, 7.0).unwrap();
        node.release_cpu(TaskId(1)).unwrap();
        EnergyAccountant::accrue(&mut node, 10.0).unwrap();

        // alpha * 7 idle seconds + beta * 2^3 * 3 busy seconds
        assert!((node.energy.consumed() - (0.5 * 7.0 + 0.25 * 8.0 * 3.0)).abs() < 1e-9);
        assert_eq!(node.energy.idle_time(), 7.0);
        assert_eq!(node.energy.busy_time(), 3.0);
    }

    #[test]
    fn test_accruing_backwards_fails() {
        let mut node = node();
        EnergyAccountant::accrue(&mut node, 3.0).unwrap();

        assert!(EnergyAccountant::accrue(&mut node, 2.0).is_err());
    }

    #[test]
    fn test_budget_marks_node_exhausted() {
        let mut node = node().with_energy_budget(Some(1.0));

        EnergyAccountant::accrue(&mut node, 1.0).unwrap();
        assert!(!node.is_exhausted());
        EnergyAccountant::accrue(&mut node, 2.0).unwrap();
        assert!(node.is_exhausted());
    }
}
