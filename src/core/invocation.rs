//! Invocation and topology records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::clock::TimestampMs;

/// Monotonically increasing virtual sequence number representing the
/// absolute position of an entry since the queue was last emptied.
///
/// `0` is the sentinel for "not queued". If an entry is reordered, its
/// `QueueId` moves with it, so position arithmetic stays valid.
pub type QueueId = u64;

/// 1-based relative position within the queue. `0` means "not queued".
pub type Position = u64;

/// A named resource descriptor that a request matches against and a unit
/// advertises. The attribute map is the capability payload; the service
/// core treats it as opaque except for query evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Unique topology name.
    pub name: String,
    /// Capability attributes (e.g. `numGpus: "2"`, `ram: "8M"`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Topology {
    /// Convenience constructor for a name-only topology.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// A client's resource request/allocation record.
///
/// Created by the first Allocate call that omits an ID; the ID stays stable
/// across Allocate, Refresh, Release, and a server restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Server-generated opaque token.
    pub id: String,
    /// Client-provided owner.
    pub owner: String,
    /// Client-provided purpose (CI systems send the test target).
    pub purpose: String,
    /// Time the invocation last had its queue position or allocation
    /// refreshed.
    pub last_checkin: TimestampMs,
    /// Virtual queue sequence number; 0 when not queued.
    pub queue_id: QueueId,
    /// Requested topologies. Exactly one by the current contract.
    pub topologies: Vec<Topology>,
}
