pub mod clock;
pub mod context;
pub mod env;
pub mod event;
