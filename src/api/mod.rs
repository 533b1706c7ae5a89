pub mod env_config_dto;
pub mod scenario_dto;
pub mod task_dto;
