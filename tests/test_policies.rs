use offload_sim::api::env_config_dto::EnvConfig;
use offload_sim::api::scenario_dto::{LinkDto, NodeDto, ScenarioDto};
use offload_sim::domain::simulator::env::Env;
use offload_sim::domain::sim_model::policy::OffloadPolicy;
use offload_sim::domain::sim_model::policy::greedy::GreedyPolicy;
use offload_sim::domain::sim_model::policy::random::RandomPolicy;
use offload_sim::domain::sim_model::policy::round_robin::RoundRobinPolicy;
use offload_sim::domain::sim_model::task::task::TaskDescriptor;

fn node(id: u32, name: &str, max_cpu_freq: f64, energy_budget: Option<f64>) -> NodeDto {
    NodeDto {
        id,
        name: name.to_string(),
        max_cpu_freq,
        max_buffer_size: None,
        location: None,
        idle_power: 1.0,
        exe_power: 0.0,
        energy_budget,
    }
}

/// `edge` reaches a slow neighbour and a fast cloud; `island` is unreachable.
fn create_env(cloud_budget: Option<f64>) -> Env {
    let dto = ScenarioDto {
        nodes: vec![node(0, "edge", 2.0, None), node(1, "neighbour", 4.0, None), node(2, "cloud", 100.0, cloud_budget), node(3, "island", 1000.0, None)],
        links: vec![
            LinkDto { src: "edge".to_string(), dst: "neighbour".to_string(), bandwidth: 100.0, base_latency: 0.0, bidirectional: true },
            LinkDto { src: "edge".to_string(), dst: "cloud".to_string(), bandwidth: 100.0, base_latency: 1.0, bidirectional: true },
        ],
    };
    Env::from_scenario(dto, EnvConfig { enable_logging: false, ..EnvConfig::default() }).unwrap()
}

fn task(id: u64) -> TaskDescriptor {
    TaskDescriptor::new(id, 10.0, 10.0, 10.0, 100.0)
}

#[test]
fn test_round_robin_cycles_through_nodes() {
    let env = create_env(None);
    let mut policy = RoundRobinPolicy::new();

    let picks: Vec<String> = (0..5).map(|i| policy.act(&env, &task(i), "edge").unwrap().to_string()).collect();

    assert_eq!(picks, vec!["edge", "neighbour", "cloud", "island", "edge"]);
}

#[test]
fn test_random_policy_is_seeded() {
    let env = create_env(None);
    let mut a = RandomPolicy::new(42);
    let mut b = RandomPolicy::new(42);

    let picks_a: Vec<String> = (0..20).map(|i| a.act(&env, &task(i), "edge").unwrap().to_string()).collect();
    let picks_b: Vec<String> = (0..20).map(|i| b.act(&env, &task(i), "edge").unwrap().to_string()).collect();

    assert_eq!(picks_a, picks_b);
    assert!(picks_a.iter().all(|p| env.topology().node_by_name(p).is_some()));
}

#[test]
fn test_greedy_prefers_the_fastest_reachable_node() {
    let env = create_env(None);
    let mut policy = GreedyPolicy::default();

    // local: 50s, neighbour: 1 + 25s, cloud: 1 + 1 + 1s, island: unreachable
    assert_eq!(policy.act(&env, &task(0), "edge").unwrap().as_str(), "cloud");
    assert_eq!(policy.estimate(&env, &task(0), "edge", "island"), None);
}

#[test]
fn test_greedy_accounts_for_queued_work() {
    let mut env = create_env(None);
    for i in 0..10 {
        env.submit(TaskDescriptor::new(i, 100.0, 10.0, 10.0, 1000.0), "edge", "cloud").unwrap();
    }
    // All ten arrive at t=11, one executes and nine wait in the buffer.
    env.run(12.0).unwrap();

    let mut policy = GreedyPolicy::default();

    assert_eq!(policy.act(&env, &task(99), "edge").unwrap().as_str(), "neighbour");
}

#[test]
fn test_greedy_skips_exhausted_nodes() {
    let mut env = create_env(Some(1.0));
    env.run(5.0).unwrap();

    let mut policy = GreedyPolicy::default();

    assert_eq!(policy.act(&env, &task(0), "edge").unwrap().as_str(), "neighbour");
}
