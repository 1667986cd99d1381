//! Invocation ID generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Injectable generator of opaque invocation IDs.
pub trait IdSource: Send + Sync {
    /// Produce a new unique ID.
    fn generate(&self) -> String;
}

/// UUIDv4-based ID source used in production.
#[derive(Debug, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Monotonically counting ID source for tests ("1", "2", ...).
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    counter: AtomicU64,
}

impl IdSource for SequentialIdSource {
    fn generate(&self) -> String {
        let next = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        next.to_string()
    }
}
