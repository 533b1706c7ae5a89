use log::Level;

use crate::domain::simulator::clock::SimTime;
use crate::domain::simulator::context::SimContext;
use crate::domain::simulator::event::Event;
use crate::domain::sim_model::allocator::resource_allocator::{Admission, ResourceAllocator};
use crate::domain::sim_model::energy::energy_accountant::EnergyAccountant;
use crate::domain::sim_model::metrics::statistics::ANALYTICS_TARGET;
use crate::domain::sim_model::resource::node::BufferedTask;
use crate::domain::sim_model::task::task::TaskState;
use crate::domain::sim_model::utils::id::{NodeId, TaskId};
use crate::error::{SimError, TaskFailure};

/// Drives tasks through `Generated -> Transmitting -> Queued -> Executing -> settled`.
///
/// Each handler runs inside one event and mutates the context atomically. Events that reach a task in a state
/// where they no longer apply are dropped, so a settled task never changes again.
pub struct LifecycleController;

impl LifecycleController {
    pub fn handle(ctx: &mut SimContext, event: Event) -> Result<(), SimError> {
        match event {
            Event::Dispatch(id) => Self::dispatch(ctx, id),
            Event::TransmissionDone(id) => Self::transmission_done(ctx, id),
            Event::ExecutionDone(id) => Self::execution_done(ctx, id),
            Event::Deadline(id) => Self::deadline(ctx, id),
        }
    }

    /// Generation instant: arms the deadline and either starts the transfer or arrives locally.
    fn dispatch(ctx: &mut SimContext, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let task = ctx.task(id)?;
        if task.state() != TaskState::Generated {
            return Ok(());
        }

        let deadline = task.deadline().max(now);
        let path = task.path.clone();
        let (bit_rate, bits) = (task.descriptor.trans_bit_rate, task.descriptor.size);
        let src = ctx.node_name(task.src);

        ctx.clock.schedule_late(deadline, Event::Deadline(id))?;
        ctx.log(Level::Debug, format_args!("Task {{{}}} generated in Node {{{}}}", id, src));

        if path.is_local() {
            return Self::arrive(ctx, id);
        }

        if let Admission::Refused(failure) = ResourceAllocator::grant_bandwidth(&mut ctx.topology, &path, id, bit_rate, bits, now)? {
            return Self::settle(ctx, id, TaskState::failed(failure), Some(failure), now);
        }

        let latencies: Vec<f64> = path.links.iter().filter_map(|l| ctx.topology.link(*l)).map(|l| l.base_latency).collect();
        let task = ctx.task_mut(id)?;
        let trans_time = task.transmission_time(latencies.into_iter());
        task.trans_time = trans_time;
        task.transition(TaskState::Transmitting)?;

        ctx.clock.schedule(now + trans_time, Event::TransmissionDone(id))?;
        ctx.log(Level::Debug, format_args!("Task {{{}}} transmitting over {} link(s) for {{{:.2}}}s", id, path.hops(), trans_time));

        Ok(())
    }

    fn transmission_done(ctx: &mut SimContext, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let task = ctx.task(id)?;
        if task.state() != TaskState::Transmitting {
            return Ok(());
        }

        let path = task.path.clone();
        ResourceAllocator::release_bandwidth(&mut ctx.topology, &path, id, now)?;

        Self::arrive(ctx, id)
    }

    /// The task reached its destination node and asks for admission.
    fn arrive(ctx: &mut SimContext, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let task = ctx.task(id)?;
        let dst = task.dst;
        let entry = BufferedTask { task: id, bits: task.descriptor.size, cycles: task.descriptor.cycles() };
        let trans_time = task.trans_time;

        Self::accrue(ctx, dst, now)?;

        match ResourceAllocator::admit(&mut ctx.topology, dst, entry)? {
            Admission::Refused(failure) => Self::settle(ctx, id, TaskState::failed(failure), Some(failure), now),
            Admission::Granted => {
                ctx.task_mut(id)?.transition(TaskState::Queued)?;
                ctx.log(Level::Debug, format_args!("Task {{{}}} arrived Node {{{}}} with {{{:.2}}}s", id, ctx.node_name(dst), trans_time));
                Self::start_execution(ctx, dst, id)
            }
            Admission::Buffered => {
                ctx.task_mut(id)?.transition(TaskState::Queued)?;
                ctx.log(Level::Debug, format_args!("Task {{{}}} arrived Node {{{}}} with {{{:.2}}}s and waits in the buffer", id, ctx.node_name(dst), trans_time));
                Ok(())
            }
        }
    }

    fn start_execution(ctx: &mut SimContext, node: NodeId, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let cycles = ctx.task(id)?.descriptor.cycles();

        // Power state changes with the reservation, so the idle interval is closed first.
        Self::accrue(ctx, node, now)?;
        let execution = ResourceAllocator::reserve_cpu(&mut ctx.topology, node, id, cycles, now)?;

        let task = ctx.task_mut(id)?;
        task.wait_time = now - task.generation_time;
        task.exe_time = execution.finishes_at - now;
        task.cpu_freq = Some(execution.cpu_freq);
        task.transition(TaskState::Executing)?;
        let exe_time = task.exe_time;

        ctx.clock.schedule(execution.finishes_at, Event::ExecutionDone(id))?;
        ctx.log(Level::Debug, format_args!("Task {{{}}} executing in Node {{{}}} for {{{:.2}}}s", id, ctx.node_name(node), exe_time));

        Ok(())
    }

    fn execution_done(ctx: &mut SimContext, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let task = ctx.task(id)?;
        if task.state() != TaskState::Executing {
            return Ok(());
        }
        let node = task.dst;

        Self::accrue(ctx, node, now)?;
        let next = ResourceAllocator::release_cpu(&mut ctx.topology, node, id)?;
        Self::settle(ctx, id, TaskState::Completed, None, now)?;

        match next {
            Some(entry) => Self::start_execution(ctx, node, entry.task),
            None => Ok(()),
        }
    }

    /// `generation_time + ddl` reached. Only tasks that have not started executing are affected.
    fn deadline(ctx: &mut SimContext, id: TaskId) -> Result<(), SimError> {
        let now = ctx.now();
        let task = ctx.task(id)?;
        let (state, dst, path) = (task.state(), task.dst, task.path.clone());

        match state {
            TaskState::Transmitting => {
                let unsent = ResourceAllocator::release_bandwidth(&mut ctx.topology, &path, id, now)?;
                ctx.log(Level::Debug, format_args!("Task {{{}}} transmission aborted with {{{:.2}}} bits unsent", id, unsent));
            }
            TaskState::Queued => {
                if !ResourceAllocator::withdraw(&mut ctx.topology, dst, id) {
                    return Err(SimError::Ordering(format!("queued task {} is missing from the buffer of Node {{{}}}", id, ctx.node_name(dst))));
                }
            }
            TaskState::Generated => {}
            _ => return Ok(()),
        }

        Self::settle(ctx, id, TaskState::FailedTimeout, Some(TaskFailure::Timeout), now)
    }

    fn accrue(ctx: &mut SimContext, node: NodeId, now: SimTime) -> Result<(), SimError> {
        let node = ctx.topology.node_mut(node).ok_or_else(|| SimError::Ordering("accrual on an unknown node".to_string()))?;
        EnergyAccountant::accrue(node, now)
    }

    /// Sets the terminal state, then reports the task to the log, the analytics target and the metrics.
    pub fn settle(ctx: &mut SimContext, id: TaskId, state: TaskState, failure: Option<TaskFailure>, time: SimTime) -> Result<(), SimError> {
        ctx.task_mut(id)?.settle(state, failure, time)?;

        let task = ctx.task(id)?;
        let dst = ctx.node_name(task.dst);
        match failure {
            None => ctx.log(Level::Info, format_args!("Task {{{}}} accomplished in Node {{{}}} with {{{:.2}}}s", id, dst, task.exe_time)),
            Some(reason) => ctx.log(Level::Info, format_args!("Task {{{}}} failed with {} towards Node {{{}}}", id, reason, dst)),
        }

        if ctx.enable_logging {
            tracing::info!(
                target: ANALYTICS_TARGET,
                Time = time,
                TaskId = id.0,
                TaskName = %task.descriptor.name,
                DstName = %dst,
                Status = %state,
                Failure = failure.map(|f| f.as_str()).unwrap_or("None"),
                TransTime = task.trans_time,
                WaitTime = task.wait_time,
                ExeTime = task.exe_time,
            );
        }

        let task = &ctx.tasks[&id];
        ctx.metrics.record_task(task, &ctx.topology);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sim_model::resource::node::Node;
    use crate::domain::sim_model::task::task::{Task, TaskDescriptor};
    use crate::domain::sim_model::topology::router::{Router, RoutingWeight};
    use crate::domain::sim_model::topology::topology::Topology;
    use crate::domain::sim_model::utils::id::NodeName;
    use crate::domain::sim_model::utils::location::DistanceMetric;
    use tracing_test::traced_test;

    fn context() -> SimContext {
        let mut topology = Topology::new(DistanceMetric::Euclidean);
        topology.add_node(Node::new(0, NodeName::new("n0"), 10.0)).unwrap();
        topology.add_node(Node::new(1, NodeName::new("n1"), 10.0)).unwrap();
        topology.add_link("n0", "n1", 20.0, 0.0).unwrap();
        SimContext::new(topology, true, true)
    }

    fn submit(ctx: &mut SimContext, descriptor: TaskDescriptor, src: &str, dst: &str) {
        let (src, dst) = (ctx.topology.node_id(src).unwrap(), ctx.topology.node_id(dst).unwrap());
        let path = Router::new(RoutingWeight::Hops, false).route(&ctx.topology, src, dst).unwrap();
        let id = descriptor.id;
        ctx.tasks.insert(id, Task::new(descriptor, src, dst, path, ctx.now()));
        ctx.clock.schedule(ctx.now(), Event::Dispatch(id)).unwrap();
    }

    fn drain(ctx: &mut SimContext) {
        while let Some((time, event)) = ctx.clock.pop_until(f64::INFINITY) {
            ctx.record(time, &event);
            LifecycleController::handle(ctx, event).unwrap();
        }
    }

    #[test]
    fn test_remote_task_goes_through_every_phase() {
        let mut ctx = context();
        submit(&mut ctx, TaskDescriptor::new(0, 20.0, 10.0, 20.0, 100.0), "n0", "n1");

        drain(&mut ctx);

        let kinds: Vec<&str> = ctx.trace.as_ref().unwrap().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["Dispatch", "TransmissionDone", "ExecutionDone", "Deadline"]);

        let task = &ctx.tasks[&TaskId(0)];
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.settle_time, Some(21.0));
        assert_eq!(task.cpu_freq, Some(10.0));
    }

    #[test]
    fn test_events_for_settled_tasks_are_dropped() {
        let mut ctx = context();
        submit(&mut ctx, TaskDescriptor::new(0, 20.0, 10.0, 20.0, 0.5), "n0", "n1");

        drain(&mut ctx);

        let task = &ctx.tasks[&TaskId(0)];
        assert_eq!(task.state(), TaskState::FailedTimeout);
        assert_eq!(task.settle_time, Some(0.5));
        assert_eq!(ctx.metrics.tasks().len(), 1);

        let link = ctx.topology.links().next().unwrap().1;
        assert_eq!(link.free_bandwidth(), link.max_bandwidth());
    }

    #[traced_test]
    #[test]
    fn test_settlement_is_reported_to_analytics() {
        let mut ctx = context();
        submit(&mut ctx, TaskDescriptor::new(7, 10.0, 1.0, 10.0, 10.0), "n1", "n1");

        drain(&mut ctx);

        assert!(logs_contain("TaskId=7"));
        assert!(logs_contain("Status=Completed"));
    }
}
