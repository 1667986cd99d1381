//! Core allocation domain: queue, units, matching, queries, coordinator.

pub mod audit;
pub mod error;
pub mod invocation;
pub mod matchmaker;
pub mod query;
pub mod queue;
pub mod service;
pub mod unit;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AllocatorError, AppResult, QueryError};
pub use invocation::{Invocation, Position, QueueId, Topology};
pub use matchmaker::{MatchMode, Matchmaker, NameEquality, QueryFilter, StructuralMatch};
pub use queue::InvocationQueue;
pub use service::{Phase, QueueComparator, Service};
pub use unit::{AllocationState, Health, Unit, UnitStats};
