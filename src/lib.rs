use crate::api::env_config_dto::EnvConfig;
use crate::api::scenario_dto::ScenarioDto;
use crate::api::task_dto::TaskRecordDto;
use crate::domain::simulator::env::Env;
use crate::error::Result;
use crate::loader::parser::{parse_csv_file, parse_json_file};

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Builds a simulation environment from a scenario file and an optional configuration file.
pub fn generate_env(scenario_path: &str, config_path: Option<&str>) -> Result<Env> {
    logger::init();
    log::info!("Logger initialized. Starting Env construction.");

    let config = match config_path {
        Some(path) => parse_json_file::<EnvConfig>(path)?,
        None => EnvConfig::default(),
    };

    let scenario: ScenarioDto = parse_json_file::<ScenarioDto>(scenario_path)?;
    log::info!("Scenario file parsed successfully.");

    let env = Env::from_scenario(scenario, config)?;
    log::info!("Simulation environment constructed successfully.");

    Ok(env)
}

/// Reads a task dataset, sorted by generation time. Rows with equal times keep their file order.
pub fn load_tasks(file_path: &str) -> Result<Vec<TaskRecordDto>> {
    let mut tasks: Vec<TaskRecordDto> = parse_csv_file(file_path)?;
    tasks.sort_by(|a, b| a.generation_time.total_cmp(&b.generation_time));

    log::info!("Loaded {} tasks from '{}'.", tasks.len(), file_path);
    Ok(tasks)
}
