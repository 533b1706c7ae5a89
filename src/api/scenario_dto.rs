use serde::Deserialize;

/// Topology description as supplied by a scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    pub nodes: Vec<NodeDto>,
    #[serde(default)]
    pub links: Vec<LinkDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto {
    pub id: u32,
    pub name: String,
    pub max_cpu_freq: f64,
    /// Buffer capacity in bits; absent means unbounded.
    #[serde(default)]
    pub max_buffer_size: Option<f64>,
    #[serde(default)]
    pub location: Option<LocationDto>,
    #[serde(default)]
    pub idle_power: f64,
    #[serde(default)]
    pub exe_power: f64,
    #[serde(default)]
    pub energy_budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationDto {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDto {
    pub src: String,
    pub dst: String,
    pub bandwidth: f64,
    #[serde(default)]
    pub base_latency: f64,
    /// Adds the reverse link with the same attributes.
    #[serde(default)]
    pub bidirectional: bool,
}
