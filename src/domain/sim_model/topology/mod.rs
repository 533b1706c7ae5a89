pub mod router;
pub mod topology;
