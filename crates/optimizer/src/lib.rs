//! Kubernetes cost optimizer service
//!
//! Runs the refresh scheduler in the background and serves the latest
//! published cycle over HTTP.

pub mod api;
pub mod config;
