pub mod allocator;
pub mod energy;
pub mod metrics;
pub mod policy;
pub mod resource;
pub mod task;
pub mod topology;
pub mod utils;
