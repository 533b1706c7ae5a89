use std::collections::VecDeque;

use crate::domain::simulator::clock::SimTime;
use crate::domain::sim_model::energy::energy_accountant::EnergyMeter;
use crate::domain::sim_model::utils::id::{NodeName, TaskId};
use crate::domain::sim_model::utils::location::Location;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuStatus {
    pub free_cpu_freq: f64,
    pub max_cpu_freq: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStatus {
    /// `None` for an unbounded buffer.
    pub free_size: Option<f64>,
    pub max_size: Option<f64>,
}

/// A task waiting in a node's buffer together with what it costs.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedTask {
    pub task: TaskId,
    pub bits: f64,
    pub cycles: f64,
}

/// FIFO of tasks waiting for the CPU. Occupancy is measured in bits.
#[derive(Debug, Clone)]
pub struct TaskBuffer {
    max_size: Option<f64>,
    used: f64,
    queue: VecDeque<BufferedTask>,
}

impl TaskBuffer {
    pub fn new(max_size: Option<f64>) -> Self {
        Self { max_size, used: 0.0, queue: VecDeque::new() }
    }

    /// Appends the task if it fits. Returns `false` when the buffer is too full.
    pub fn append(&mut self, entry: BufferedTask) -> bool {
        if let Some(max) = self.max_size {
            if self.used + entry.bits > max {
                return false;
            }
        }

        self.used += entry.bits;
        self.queue.push_back(entry);
        true
    }

    pub fn pop(&mut self) -> Option<BufferedTask> {
        let entry = self.queue.pop_front()?;
        self.release_bits(entry.bits);
        Some(entry)
    }

    /// Removes a task from anywhere in the buffer.
    pub fn remove(&mut self, task: TaskId) -> Option<BufferedTask> {
        let position = self.queue.iter().position(|e| e.task == task)?;
        let entry = self.queue.remove(position)?;
        self.release_bits(entry.bits);
        Some(entry)
    }

    fn release_bits(&mut self, bits: f64) {
        // Recomputed from the remaining entries so an empty buffer is exactly empty.
        self.used = if self.queue.is_empty() { 0.0 } else { (self.used - bits).max(0.0) };
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.queue.iter().map(|e| e.task).collect()
    }

    /// Total cycles of every buffered task.
    pub fn pending_cycles(&self) -> f64 {
        self.queue.iter().map(|e| e.cycles).sum()
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus { free_size: self.max_size.map(|max| max - self.used), max_size: self.max_size }
    }

    pub fn utilization(&self) -> f64 {
        match self.max_size {
            Some(max) if max > 0.0 => self.used / max,
            _ => 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.used = 0.0;
    }
}

/// The task currently holding a node's CPU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Execution {
    pub task: TaskId,
    pub cpu_freq: f64,
    pub started_at: SimTime,
    pub finishes_at: SimTime,
}

/// A compute resource: one CPU served in FIFO order and an energy meter.
#[derive(Debug, Clone)]
pub struct Node {
    /// Numeric identifier from the scenario, unique within the topology.
    pub id: u32,
    pub name: NodeName,
    pub location: Option<Location>,

    max_cpu_freq: f64,
    free_cpu_freq: f64,
    executing: Option<Execution>,

    pub buffer: TaskBuffer,

    /// Idle power coefficient (alpha).
    pub idle_power: f64,
    /// Execution power coefficient (beta), scaled by the cube of the granted frequency.
    pub exe_power: f64,
    pub energy: EnergyMeter,
}

impl Node {
    pub fn new(id: u32, name: NodeName, max_cpu_freq: f64) -> Self {
        Self {
            id,
            name,
            location: None,
            max_cpu_freq,
            free_cpu_freq: max_cpu_freq,
            executing: None,
            buffer: TaskBuffer::new(None),
            idle_power: 0.0,
            exe_power: 0.0,
            energy: EnergyMeter::new(None),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_buffer_size(mut self, max_size: Option<f64>) -> Self {
        self.buffer = TaskBuffer::new(max_size);
        self
    }

    pub fn with_power(mut self, idle_power: f64, exe_power: f64) -> Self {
        self.idle_power = idle_power;
        self.exe_power = exe_power;
        self
    }

    pub fn with_energy_budget(mut self, budget: Option<f64>) -> Self {
        self.energy = EnergyMeter::new(budget);
        self
    }

    pub fn max_cpu_freq(&self) -> f64 {
        self.max_cpu_freq
    }

    pub fn free_cpu_freq(&self) -> f64 {
        self.free_cpu_freq
    }

    pub fn executing(&self) -> Option<&Execution> {
        self.executing.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.executing.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.energy.is_exhausted()
    }

    /// Current power draw: `beta * f^3` while executing, `alpha` otherwise.
    pub fn power_draw(&self) -> f64 {
        match &self.executing {
            Some(execution) => self.exe_power * execution.cpu_freq.powi(3),
            None => self.idle_power,
        }
    }

    /// Hands the whole CPU to `task`. The base model serves one task at a time.
    pub fn reserve_cpu(&mut self, task: TaskId, cycles: f64, now: SimTime) -> Result<Execution, SimError> {
        if let Some(current) = &self.executing {
            return Err(SimError::Ordering(format!("Node {{{}}} cannot serve task {} while task {} is executing", self.name, task, current.task)));
        }
        if self.max_cpu_freq <= 0.0 {
            return Err(SimError::Ordering(format!("Node {{{}}} has no CPU frequency to grant", self.name)));
        }

        let cpu_freq = self.free_cpu_freq;
        let execution = Execution { task, cpu_freq, started_at: now, finishes_at: now + cycles / cpu_freq };

        self.free_cpu_freq = 0.0;
        self.executing = Some(execution);

        Ok(execution)
    }

    pub fn release_cpu(&mut self, task: TaskId) -> Result<Execution, SimError> {
        match self.executing {
            Some(execution) if execution.task == task => {
                self.executing = None;
                self.free_cpu_freq = self.max_cpu_freq;
                Ok(execution)
            }
            Some(execution) => Err(SimError::Ordering(format!(
                "Node {{{}}} cannot release the CPU for task {}, it is held by task {}",
                self.name, task, execution.task
            ))),
            None => Err(SimError::Ordering(format!("Node {{{}}} cannot release the CPU for task {}, it is idle", self.name, task))),
        }
    }

    /// Seconds until every task already on this node is done, assuming the full CPU frequency.
    pub fn estimated_wait(&self, now: SimTime) -> f64 {
        let remaining = self.executing.map(|e| (e.finishes_at - now).max(0.0)).unwrap_or(0.0);

        if self.max_cpu_freq <= 0.0 {
            return f64::INFINITY;
        }

        remaining + self.buffer.pending_cycles() / self.max_cpu_freq
    }

    pub fn status(&self) -> (CpuStatus, BufferStatus) {
        (CpuStatus { free_cpu_freq: self.free_cpu_freq, max_cpu_freq: self.max_cpu_freq }, self.buffer.status())
    }

    pub fn cpu_utilization(&self) -> f64 {
        if self.max_cpu_freq <= 0.0 {
            return 0.0;
        }
        (self.max_cpu_freq - self.free_cpu_freq) / self.max_cpu_freq
    }

    pub fn buffer_utilization(&self) -> f64 {
        self.buffer.utilization()
    }

    pub fn reset(&mut self) {
        self.free_cpu_freq = self.max_cpu_freq;
        self.executing = None;
        self.buffer.clear();
        self.energy.reset();
    }
}
