pub mod id;
pub mod location;
