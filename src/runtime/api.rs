//! Plain request/response records for the service boundary.
//!
//! Transport and encoding are an embedder concern; these are the shapes the
//! coordinator consumes and produces.

use serde::{Deserialize, Serialize};

use crate::core::invocation::{Position, Topology};
use crate::core::unit::UnitStats;
use crate::util::clock::TimestampMs;

/// Client-supplied invocation fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationDraft {
    /// Server-issued ID; empty on first contact.
    #[serde(default)]
    pub id: String,
    /// Requesting owner.
    pub owner: String,
    /// Purpose of the request (CI systems send the test target).
    #[serde(default)]
    pub purpose: String,
    /// Requested topologies. Exactly one by the current contract.
    pub topologies: Vec<Topology>,
}

/// Request a unit, or poll an existing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateRequest {
    /// The invocation being requested or polled.
    pub invocation: InvocationDraft,
}

/// Successful allocation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocated {
    /// Stable invocation ID.
    pub id: String,
    /// Topologies of the units now held.
    pub topologies: Vec<Topology>,
    /// Refresh before this deadline or lose the allocation.
    pub refresh_deadline_ms: TimestampMs,
}

/// Queued outcome; a success response, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queued {
    /// Stable invocation ID.
    pub id: String,
    /// 1-based position in the queue.
    pub queue_position: Position,
    /// Poll again at this time to keep the queue spot.
    pub next_poll_time_ms: TimestampMs,
}

/// Outcome of an Allocate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocateResponse {
    /// The invocation holds its unit.
    Allocated(Allocated),
    /// The invocation is waiting in the queue.
    Queued(Queued),
}

/// Keepalive for an allocation the client believes it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// The invocation refreshing its allocation; ID must be set.
    pub invocation: InvocationDraft,
    /// Topologies the client believes it has allocated. Exactly one by the
    /// current contract.
    pub allocated: Vec<Topology>,
}

/// Refresh outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Stable invocation ID.
    pub id: String,
    /// Refresh again before this deadline.
    pub refresh_deadline_ms: TimestampMs,
}

/// Release an allocation and/or queue spot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// The invocation ID to release.
    pub id: String,
}

/// Release outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseResponse {}

/// Per-unit status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// One entry per unit, in topology-name order.
    pub units: Vec<UnitStats>,
}
