use crate::api::env_config_dto::EnvConfig;
use crate::api::scenario_dto::ScenarioDto;
use crate::domain::simulator::clock::SimTime;
use crate::domain::simulator::context::SimContext;
use crate::domain::simulator::event::{Event, TraceEntry};
use crate::domain::sim_model::energy::energy_accountant::EnergyAccountant;
use crate::domain::sim_model::metrics::statistics::{Metrics, NodeRecord};
use crate::domain::sim_model::resource::node::{BufferStatus, CpuStatus, Node};
use crate::domain::sim_model::task::lifecycle::LifecycleController;
use crate::domain::sim_model::task::task::{Task, TaskDescriptor, TaskState};
use crate::domain::sim_model::topology::router::{Path, Router};
use crate::domain::sim_model::topology::topology::Topology;
use crate::domain::sim_model::utils::id::TaskId;
use crate::error::{Result, SimError, TaskFailure};

/// Returned by a successful submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub generation_time: SimTime,
    /// Links on the resolved path, zero for a local task.
    pub hops: usize,
}

/// The simulation driver: accepts submissions, runs the event queue, exposes the metrics.
#[derive(Debug)]
pub struct Env {
    ctx: SimContext,
    router: Router,
    config: EnvConfig,
}

impl Env {
    pub fn new(topology: Topology, config: EnvConfig) -> Self {
        let ctx = SimContext::new(topology, config.record_trace, config.enable_logging);
        let router = Router::new(config.routing_weight, config.cache_paths);

        Self { ctx, router, config }
    }

    pub fn from_scenario(dto: ScenarioDto, config: EnvConfig) -> Result<Self> {
        let topology = Topology::try_from((dto, config.distance_metric))?;
        Ok(Self::new(topology, config))
    }

    pub fn now(&self) -> SimTime {
        self.ctx.now()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Submits a task generated at the current instant.
    pub fn submit(&mut self, descriptor: TaskDescriptor, src: &str, dst: &str) -> std::result::Result<TaskHandle, SimError> {
        let now = self.now();
        self.submit_at(now, descriptor, src, dst)
    }

    /// Submits a task generated at `time`, which must not lie in the past.
    ///
    /// Malformed descriptors are rejected with `SimError::InvalidTask` before anything is recorded. The path is resolved immediately. An unreachable destination is recorded as a `FailedNoPath` task and
    /// reported as `SimError::NoPath`; nothing is scheduled for it.
    pub fn submit_at(&mut self, time: SimTime, descriptor: TaskDescriptor, src: &str, dst: &str) -> std::result::Result<TaskHandle, SimError> {
        if time.is_nan() || time < self.now() {
            return Err(SimError::Ordering(format!("task {} generated at {} before the current time {}", descriptor.id, time, self.now())));
        }
        descriptor.validate()?;
        let id = descriptor.id;
        if self.ctx.tasks.contains_key(&id) {
            return Err(SimError::DuplicateTaskId(id));
        }

        let src = self.ctx.topology.node_id(src)?;
        let dst = self.ctx.topology.node_id(dst)?;

        let path = match self.router.route(&self.ctx.topology, src, dst) {
            Ok(path) => path,
            Err(err @ SimError::NoPath { .. }) => {
                self.ctx.tasks.insert(id, Task::new(descriptor, src, dst, Path::new(), time));
                LifecycleController::settle(&mut self.ctx, id, TaskState::FailedNoPath, Some(TaskFailure::NoPath), time)?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let hops = path.hops();
        self.ctx.tasks.insert(id, Task::new(descriptor, src, dst, path, time));
        self.ctx.clock.schedule(time, Event::Dispatch(id))?;

        Ok(TaskHandle { id, generation_time: time, hops })
    }

    /// Processes every event due at or before `until`, then moves the clock to `until`.
    ///
    /// `until` must be finite, use `run_to_completion` to drain the queue. An `Ordering` error leaves the run in
    /// an undefined state and must not be resumed.
    pub fn run(&mut self, until: SimTime) -> std::result::Result<(), SimError> {
        if !until.is_finite() || until < self.now() {
            return Err(SimError::Ordering(format!("cannot run until {} from the current time {}", until, self.now())));
        }

        while let Some((time, event)) = self.ctx.clock.pop_until(until) {
            self.ctx.record(time, &event);
            LifecycleController::handle(&mut self.ctx, event)?;
        }

        self.ctx.clock.advance_to(until)?;
        EnergyAccountant::settle_all(&mut self.ctx.topology, until)
    }

    /// Runs until no event is pending and leaves the clock at the last processed event.
    pub fn run_to_completion(&mut self) -> std::result::Result<(), SimError> {
        while let Some((time, event)) = self.ctx.clock.pop_until(f64::INFINITY) {
            self.ctx.record(time, &event);
            LifecycleController::handle(&mut self.ctx, event)?;
        }

        let now = self.now();
        EnergyAccountant::settle_all(&mut self.ctx.topology, now)
    }

    /// Ends the run and summarises every node. Pending events stay queued.
    pub fn close(&mut self) -> std::result::Result<Vec<NodeRecord>, SimError> {
        let now = self.now();
        EnergyAccountant::settle_all(&mut self.ctx.topology, now)?;
        self.ctx.metrics.record_nodes(&self.ctx.topology);

        if self.config.enable_logging {
            log::info!(
                "Run closed at {:.2}: {} of {} settled tasks completed.",
                now,
                self.ctx.metrics.completed_count(),
                self.ctx.metrics.tasks().len()
            );
        }

        Ok(self.ctx.metrics.nodes().to_vec())
    }

    /// Back to the pristine topology at time zero. Configuration and topology layout are kept.
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.router.clear_cache();
    }

    pub fn metrics(&self) -> &Metrics {
        &self.ctx.metrics
    }

    pub fn topology(&self) -> &Topology {
        &self.ctx.topology
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.ctx.tasks.get(&id)
    }

    /// Every known task ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.ctx.tasks.values()
    }

    /// Tasks submitted but not yet settled.
    pub fn n_active_tasks(&self) -> usize {
        self.ctx.tasks.values().filter(|t| !t.is_settled()).count()
    }

    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.ctx.trace.as_deref()
    }

    pub fn node_status(&self, name: &str) -> std::result::Result<(CpuStatus, BufferStatus), SimError> {
        Ok(self.node(name)?.status())
    }

    /// Energy consumed by a node up to the last accrual.
    pub fn node_energy(&self, name: &str) -> std::result::Result<f64, SimError> {
        Ok(self.node(name)?.energy.consumed())
    }

    /// Mean energy over the given nodes, or over all nodes with `None`.
    pub fn avg_node_energy(&self, names: Option<&[&str]>) -> std::result::Result<f64, SimError> {
        let energies: Vec<f64> = match names {
            Some(names) => names.iter().map(|n| self.node_energy(n)).collect::<std::result::Result<_, _>>()?,
            None => self.ctx.topology.nodes().map(|(_, n)| n.energy.consumed()).collect(),
        };

        if energies.is_empty() {
            return Ok(0.0);
        }
        Ok(energies.iter().sum::<f64>() / energies.len() as f64)
    }

    fn node(&self, name: &str) -> std::result::Result<&Node, SimError> {
        self.ctx.topology.node_by_name(name).ok_or_else(|| SimError::UnknownNode(name.to_string()))
    }
}
