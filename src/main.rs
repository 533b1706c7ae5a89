use anyhow::Context;
use clap::{Parser, ValueEnum};

use offload_sim::domain::sim_model::policy::OffloadPolicy;
use offload_sim::domain::sim_model::policy::greedy::GreedyPolicy;
use offload_sim::domain::sim_model::policy::random::RandomPolicy;
use offload_sim::domain::sim_model::policy::round_robin::RoundRobinPolicy;
use offload_sim::domain::sim_model::task::task::TaskDescriptor;
use offload_sim::error::SimError;
use offload_sim::{generate_env, load_tasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Destination taken from the dataset.
    Dataset,
    RoundRobin,
    Random,
    Greedy,
}

/// Replays a task dataset on a simulated network of compute nodes.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Scenario JSON describing nodes and links.
    #[arg(long)]
    scenario: String,

    /// Task dataset CSV.
    #[arg(long)]
    tasks: String,

    /// Optional engine configuration JSON.
    #[arg(long)]
    config: Option<String>,

    /// Stop time. Without it the run continues until every task has settled.
    #[arg(long)]
    until: Option<f64>,

    #[arg(long, value_enum, default_value_t = PolicyArg::Dataset)]
    policy: PolicyArg,

    /// Seed of the random policy.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Where to write the per-task records.
    #[arg(long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut env = generate_env(&args.scenario, args.config.as_deref()).with_context(|| format!("loading scenario '{}'", args.scenario))?;
    let tasks = load_tasks(&args.tasks).with_context(|| format!("loading tasks '{}'", args.tasks))?;

    let mut policy: Option<Box<dyn OffloadPolicy>> = match args.policy {
        PolicyArg::Dataset => None,
        PolicyArg::RoundRobin => Some(Box::new(RoundRobinPolicy::new())),
        PolicyArg::Random => Some(Box::new(RandomPolicy::new(args.seed))),
        PolicyArg::Greedy => Some(Box::new(GreedyPolicy::new(env.config().routing_weight))),
    };

    for record in &tasks {
        if args.until.is_some_and(|until| record.generation_time > until) {
            break;
        }
        env.run(record.generation_time)?;

        let descriptor = TaskDescriptor::from(record);
        let dst = match policy.as_mut() {
            Some(policy) => match policy.act(&env, &descriptor, &record.src_name) {
                Some(name) => name.to_string(),
                None => {
                    log::warn!("No destination for task {{{}}}, skipped.", descriptor.id);
                    continue;
                }
            },
            None => record.dst_name.clone(),
        };

        match env.submit(descriptor, &record.src_name, &dst) {
            Ok(_) => {}
            Err(err @ SimError::Ordering(_)) => return Err(err.into()),
            Err(err) => log::warn!("{}", err),
        }
    }

    match args.until {
        Some(until) => env.run(until)?,
        None => env.run_to_completion()?,
    }

    let nodes = env.close()?;
    let metrics = env.metrics();

    log::info!("Success rate: {:.2}% of {} tasks.", metrics.success_rate() * 100.0, metrics.tasks().len());
    if let Some(latency) = metrics.avg_latency() {
        log::info!("Average latency: {:.4}s", latency);
    }
    for (failure, count) in metrics.failure_counts() {
        log::info!("{}: {}", failure, count);
    }
    for node in &nodes {
        log::info!("Node {{{}}}: energy {:.4}, utilization {:.2}%", node.node_name, node.energy, node.utilization * 100.0);
    }

    if let Some(output) = args.output {
        metrics.write_csv(&output).with_context(|| format!("writing metrics to '{}'", output))?;
        log::info!("Task records written to '{}'.", output);
    }

    Ok(())
}
