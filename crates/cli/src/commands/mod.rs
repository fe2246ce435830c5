pub mod actions;
pub mod costs;
pub mod metrics;
pub mod recommendations;
