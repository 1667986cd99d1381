//! A single allocatable resource slot.

use serde::{Deserialize, Serialize};

use crate::core::invocation::{Invocation, Topology};
use crate::util::clock::TimestampMs;

/// Health status of the hardware behind a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Not yet verified; the janitor must mark the machine as clean.
    Unknown,
    /// Verified healthy.
    Ready,
    /// Known broken.
    Broken,
    /// Taken out of rotation by an operator.
    Sidelined,
    /// Never initialized.
    Uninitialized,
}

impl Health {
    /// Lowercase name used by the query evaluator and status snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ready => "ready",
            Self::Broken => "broken",
            Self::Sidelined => "sidelined",
            Self::Uninitialized => "uninitialized",
        }
    }
}

/// Occupancy of a unit as reported by Status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationState {
    /// No current occupant.
    Available,
    /// Occupied by an invocation.
    Allocated,
}

/// Per-unit status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitStats {
    /// The topology this unit advertises.
    pub topology: Topology,
    /// Current health.
    pub health: Health,
    /// Current occupancy.
    pub allocation: AllocationState,
    /// Snapshot time, milliseconds since epoch.
    pub timestamp_ms: TimestampMs,
}

/// One allocatable resource slot: health, advertised topology, and at most
/// one occupant. Units are created once at startup and never destroyed
/// while the process runs.
#[derive(Debug)]
pub struct Unit {
    /// Health status of the hardware.
    pub health: Health,
    /// Actual hardware configuration.
    pub topology: Topology,
    /// The single owning occupant, if any.
    pub invocation: Option<Invocation>,
}

impl Unit {
    /// Create an unoccupied unit for `topology` with unverified health.
    pub fn new(topology: Topology) -> Self {
        Self {
            health: Health::Unknown,
            topology,
            invocation: None,
        }
    }

    /// Associate `inv` with this unit.
    ///
    /// A no-op returning `false` if the same ID already occupies the slot;
    /// otherwise the occupant is assigned unconditionally. Callers are
    /// responsible for only allocating verified-free units, except during
    /// adoption.
    pub fn allocate(&mut self, inv: Invocation) -> bool {
        if let Some(current) = &self.invocation {
            if current.id == inv.id {
                return false;
            }
        }
        tracing::info!(unit = %self.topology.name, invocation = %inv.id, "unit allocated");
        self.invocation = Some(inv);
        true
    }

    /// Whether the unit currently has an occupant.
    pub fn is_allocated(&self) -> bool {
        self.invocation.is_some()
    }

    /// Whether the unit may be handed out at all.
    pub fn is_healthy(&self) -> bool {
        matches!(self.health, Health::Unknown | Health::Ready)
    }

    /// The occupant, if its ID matches.
    pub fn get_invocation(&self, inv_id: &str) -> Option<&Invocation> {
        self.invocation.as_ref().filter(|inv| inv.id == inv_id)
    }

    /// Mutable access to the occupant, if its ID matches.
    pub fn get_invocation_mut(&mut self, inv_id: &str) -> Option<&mut Invocation> {
        self.invocation.as_mut().filter(|inv| inv.id == inv_id)
    }

    /// Clear the occupant if its heartbeat is at or before `cutoff`,
    /// returning the expired invocation.
    pub fn expire_allocations(&mut self, cutoff: TimestampMs) -> Option<Invocation> {
        if self
            .invocation
            .as_ref()
            .is_some_and(|inv| inv.last_checkin <= cutoff)
        {
            let expired = self.invocation.take();
            if let Some(inv) = &expired {
                tracing::info!(unit = %self.topology.name, invocation = %inv.id, "allocation expired");
            }
            return expired;
        }
        None
    }

    /// Clear the occupant on an ID match. Returns the number released (0 or 1).
    pub fn forget(&mut self, inv_id: &str) -> usize {
        if self
            .invocation
            .as_ref()
            .is_some_and(|inv| inv.id == inv_id)
        {
            tracing::info!(unit = %self.topology.name, invocation = %inv_id, "unit released");
            self.invocation = None;
            return 1;
        }
        0
    }

    /// Health/occupancy/topology snapshot for Status.
    pub fn stats(&self, now_ms: TimestampMs) -> UnitStats {
        UnitStats {
            topology: self.topology.clone(),
            health: self.health,
            allocation: if self.invocation.is_some() {
                AllocationState::Allocated
            } else {
                AllocationState::Available
            },
            timestamp_ms: now_ms,
        }
    }
}
