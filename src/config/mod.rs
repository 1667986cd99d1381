//! Configuration models for the service inventory and timing.

pub mod service;

pub use service::{ServiceConfig, UnitConfig};
