use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::utils::id::{NodeId, TaskId};
use crate::error::SimError;

/// Bandwidth held by one task's transmission on one link.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFlow {
    pub task: TaskId,
    pub bit_rate: f64,
    pub bits: f64,
    pub started_at: SimTime,
}

impl DataFlow {
    /// Bits not yet pushed through this link at `now`.
    pub fn remaining_bits(&self, now: SimTime) -> f64 {
        (self.bits - self.bit_rate * (now - self.started_at).max(0.0)).max(0.0)
    }
}

/// A directed network edge with a bandwidth pool.
///
/// Endpoints are referenced by arena key; the link never owns the nodes.
#[derive(Debug, Clone)]
pub struct Link {
    pub src: NodeId,
    pub dst: NodeId,
    max_bandwidth: f64,
    free_bandwidth: f64,
    pub distance: f64,
    pub base_latency: f64,
    flows: Vec<DataFlow>,
}

impl Link {
    pub fn new(src: NodeId, dst: NodeId, max_bandwidth: f64, base_latency: f64, distance: f64) -> Self {
        Self { src, dst, max_bandwidth, free_bandwidth: max_bandwidth, distance, base_latency, flows: Vec::new() }
    }

    pub fn max_bandwidth(&self) -> f64 {
        self.max_bandwidth
    }

    pub fn free_bandwidth(&self) -> f64 {
        self.free_bandwidth
    }

    pub fn flows(&self) -> &[DataFlow] {
        &self.flows
    }

    pub fn can_carry(&self, bit_rate: f64) -> bool {
        self.free_bandwidth >= bit_rate
    }

    /// Admits the flow if enough bandwidth is free. Returns `false` otherwise and leaves the link untouched.
    pub fn add_flow(&mut self, flow: DataFlow) -> Result<bool, SimError> {
        if self.flows.iter().any(|f| f.task == flow.task) {
            return Err(SimError::Ordering(format!("task {} already holds a flow on this link", flow.task)));
        }
        if !self.can_carry(flow.bit_rate) {
            return Ok(false);
        }

        self.flows.push(flow);
        self.recompute_free_bandwidth();
        Ok(true)
    }

    /// Removes the task's flow and gives its bandwidth back. Removing twice is an ordering error.
    pub fn remove_flow(&mut self, task: TaskId) -> Result<DataFlow, SimError> {
        let position = self
            .flows
            .iter()
            .position(|f| f.task == task)
            .ok_or_else(|| SimError::Ordering(format!("task {} holds no flow on this link, bandwidth released twice", task)))?;

        let flow = self.flows.remove(position);
        self.recompute_free_bandwidth();
        Ok(flow)
    }

    // Derived from the active flows so the pool returns exactly to its maximum once they are gone.
    fn recompute_free_bandwidth(&mut self) {
        let allocated: f64 = self.flows.iter().map(|f| f.bit_rate).sum();
        self.free_bandwidth = (self.max_bandwidth - allocated).max(0.0);
    }

    pub fn bandwidth_utilization(&self) -> f64 {
        if self.max_bandwidth == 0.0 {
            return 0.0;
        }
        (self.max_bandwidth - self.free_bandwidth) / self.max_bandwidth
    }

    pub fn reset(&mut self) {
        self.flows.clear();
        self.free_bandwidth = self.max_bandwidth;
    }
}
