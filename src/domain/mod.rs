pub mod sim_model;
pub mod simulator;
