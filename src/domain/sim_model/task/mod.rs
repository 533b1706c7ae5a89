pub mod lifecycle;
pub mod task;
