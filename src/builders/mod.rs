//! Builders to construct the service from configuration.

pub mod service_builder;

pub use service_builder::ServiceBuilder;
