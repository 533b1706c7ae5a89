use serde::Deserialize;

use crate::domain::sim_model::topology::router::RoutingWeight;
use crate::domain::sim_model::utils::location::DistanceMetric;

/// Engine settings; every field has a default so an empty JSON object is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvConfig {
    pub routing_weight: RoutingWeight,
    pub distance_metric: DistanceMetric,
    /// Per-transition log lines. Disabling them shortens long runs.
    pub enable_logging: bool,
    /// Keep every processed event for later comparison.
    pub record_trace: bool,
    pub cache_paths: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            routing_weight: RoutingWeight::default(),
            distance_metric: DistanceMetric::default(),
            enable_logging: true,
            record_trace: true,
            cache_paths: true,
        }
    }
}
