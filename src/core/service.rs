//! Service coordinator: owns the unit inventory and the invocation queue,
//! runs the Starting→Running state machine, and serves Allocate, Refresh,
//! Release, and Status.
//!
//! One coarse mutex guards the inventory, the queue, and the lifecycle
//! phase; every operation and janitor tick holds it for its full duration,
//! so all callers observe a consistent, non-interleaved state. Nothing
//! suspends while holding the lock.
//!
//! While `Starting`, unrecognized client-asserted IDs are trusted at face
//! value ("adoption") so queue and allocation state lost to a restart is
//! rebuilt from client heartbeats within roughly two refresh cycles.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::audit::{AuditAction, AuditEvent, AuditSink};
use crate::core::error::AllocatorError;
use crate::core::invocation::Invocation;
use crate::core::matchmaker::{MatchMode, Matchmaker};
use crate::core::queue::InvocationQueue;
use crate::core::unit::Unit;
use crate::runtime::api::{
    Allocated, AllocateRequest, AllocateResponse, Queued, RefreshRequest, RefreshResponse,
    ReleaseRequest, ReleaseResponse, StatusResponse,
};
use crate::util::clock::{Clock, TimestampMs};
use crate::util::id::IdSource;

/// Lifecycle phase of the server.
///
/// `Starting` is a relatively short period (roughly twice a refresh cycle)
/// during which the janitor neither expires nor promotes anything and
/// unknown IDs are adopted instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Startup grace period during which the server adopts unknown
    /// allocations.
    Starting,
    /// Normal operating state.
    Running,
}

/// Injectable prioritization policy: a comparator over two invocations,
/// applied to the queue via a stable sort after each enqueue. `None` means
/// plain FIFO.
pub type QueueComparator = Box<dyn Fn(&Invocation, &Invocation) -> Ordering + Send + Sync>;

/// Mutable state behind the service mutex.
struct ServiceState {
    phase: Phase,
    units: BTreeMap<String, Unit>,
    queue: InvocationQueue,
}

/// The allocation service.
///
/// Construct through [`crate::builders::ServiceBuilder`]; callers hold an
/// explicit handle (usually an `Arc`) and pass it to the background tasks
/// in [`crate::runtime::tasks`].
pub struct Service {
    state: Mutex<ServiceState>,
    queue_refresh_ms: TimestampMs,
    allocation_refresh_ms: TimestampMs,
    janitor_interval: Duration,
    adoption_duration: Duration,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    matchmaker: Matchmaker,
    priority: Option<QueueComparator>,
    audit: Option<Arc<Mutex<dyn AuditSink>>>,
}

/// Construction arguments handed over by the builder.
pub(crate) struct ServiceParts {
    pub units: BTreeMap<String, Unit>,
    pub queue_refresh: Duration,
    pub allocation_refresh: Duration,
    pub janitor_interval: Duration,
    pub adoption_duration: Duration,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdSource>,
    pub matchmaker: Matchmaker,
    pub priority: Option<QueueComparator>,
    pub audit: Option<Arc<Mutex<dyn AuditSink>>>,
}

impl Service {
    pub(crate) fn from_parts(parts: ServiceParts) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                phase: Phase::Starting,
                units: parts.units,
                queue: InvocationQueue::new(),
            }),
            queue_refresh_ms: parts.queue_refresh.as_millis(),
            allocation_refresh_ms: parts.allocation_refresh.as_millis(),
            janitor_interval: parts.janitor_interval,
            adoption_duration: parts.adoption_duration,
            clock: parts.clock,
            ids: parts.ids,
            matchmaker: parts.matchmaker,
            priority: parts.priority,
            audit: parts.audit,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Janitor tick period.
    pub fn janitor_interval(&self) -> Duration {
        self.janitor_interval
    }

    /// Length of the startup adoption window.
    pub fn adoption_duration(&self) -> Duration {
        self.adoption_duration
    }

    /// Unconditional `Starting` → `Running` transition, fired once by the
    /// adoption timer.
    pub fn finish_adoption(&self) {
        let mut state = self.state.lock();
        if state.phase == Phase::Starting {
            tracing::info!("adoption window closed, server is running");
            state.phase = Phase::Running;
        }
    }

    /// Validate that a request is satisfiable, then allocate or queue it.
    ///
    /// A request without an ID is checked for feasibility against the whole
    /// inventory (zero structural matches is a permanent error), assigned a
    /// fresh opaque ID, and enqueued; while `Running`, promotion runs
    /// immediately so the caller learns the outcome synchronously.
    pub fn allocate(&self, req: AllocateRequest) -> Result<AllocateResponse, AllocatorError> {
        let mut state = self.state.lock();
        let draft = req.invocation;
        if draft.topologies.len() != 1 {
            return Err(AllocatorError::InvalidRequest(format!(
                "requests must have exactly one topology, got {}",
                draft.topologies.len()
            )));
        }

        let probe = Invocation {
            id: String::new(),
            owner: draft.owner.clone(),
            purpose: draft.purpose.clone(),
            last_checkin: 0,
            queue_id: 0,
            topologies: draft.topologies.clone(),
        };
        let matches = self
            .matchmaker
            .matches(&state.units, &probe, MatchMode::Feasibility);
        let matched = matches.iter().filter(|names| !names.is_empty()).count();
        if matched != draft.topologies.len() {
            return Err(AllocatorError::Infeasible {
                wanted: draft.topologies.len(),
                matched,
            });
        }

        let now = self.clock.now_ms();
        let mut inv_id = draft.id.clone();
        if inv_id.is_empty() {
            // First contact: generate an ID and queue the request.
            inv_id = self.ids.generate();
            let inv = Invocation {
                id: inv_id.clone(),
                owner: draft.owner.clone(),
                purpose: draft.purpose.clone(),
                last_checkin: now,
                queue_id: 0,
                topologies: draft.topologies.clone(),
            };
            state.queue.enqueue(inv);
            self.resort_queue(&mut state);
            tracing::info!(invocation = %inv_id, owner = %draft.owner, "invocation enqueued");
            self.record_audit(AuditAction::Enqueue, &inv_id, None, &draft.owner);
            if state.phase == Phase::Running {
                self.promote_locked(&mut state);
            }
        }

        // Allocated?
        for unit in state.units.values_mut() {
            if let Some(occupant) = unit.get_invocation_mut(&inv_id) {
                occupant.last_checkin = now;
                let topologies = vec![unit.topology.clone()];
                return Ok(AllocateResponse::Allocated(Allocated {
                    id: inv_id,
                    topologies,
                    refresh_deadline_ms: now + self.allocation_refresh_ms,
                }));
            }
        }

        // Queued?
        if let Some((position, inv)) = state.queue.get_mut(&inv_id) {
            inv.last_checkin = now;
            return Ok(AllocateResponse::Queued(Queued {
                id: inv_id,
                queue_position: position,
                next_poll_time_ms: now + self.queue_refresh_ms,
            }));
        }

        if state.phase == Phase::Running {
            // Unknown, possibly expired.
            return Err(AllocatorError::UnknownInvocation(inv_id));
        }

        // The invocation was queued before a server restart; adopt it by
        // adding it back to the queue.
        let inv = Invocation {
            id: inv_id.clone(),
            owner: draft.owner.clone(),
            purpose: draft.purpose.clone(),
            last_checkin: now,
            queue_id: 0,
            topologies: draft.topologies,
        };
        let position = state.queue.enqueue(inv);
        self.resort_queue(&mut state);
        tracing::info!(invocation = %inv_id, "adopted queued invocation from before restart");
        self.record_audit(AuditAction::Adopt, &inv_id, None, &draft.owner);
        Ok(AllocateResponse::Queued(Queued {
            id: inv_id,
            queue_position: position,
            next_poll_time_ms: now + self.queue_refresh_ms,
        }))
    }

    /// Keepalive for an existing allocation.
    ///
    /// Resolves the unit by the topology the client believes it holds. An
    /// occupant mismatch is a permanent error while `Running`; while
    /// `Starting`, the claimed allocation is synthesized and force-allocated
    /// onto the unit instead.
    pub fn refresh(&self, req: RefreshRequest) -> Result<RefreshResponse, AllocatorError> {
        let mut state = self.state.lock();
        let draft = req.invocation;
        if draft.topologies.len() != 1 {
            return Err(AllocatorError::InvalidRequest(format!(
                "request must have exactly one topology, got {}",
                draft.topologies.len()
            )));
        }
        if req.allocated.len() != 1 {
            return Err(AllocatorError::InvalidRequest(format!(
                "allocations must have exactly one topology, got {}",
                req.allocated.len()
            )));
        }
        if draft.id.is_empty() {
            return Err(AllocatorError::InvalidRequest(
                "invocation.id must be set".to_string(),
            ));
        }

        let now = self.clock.now_ms();
        let phase = state.phase;
        let name = req.allocated[0].name.clone();
        let unit = state
            .units
            .get_mut(&name)
            .ok_or_else(|| AllocatorError::UnknownUnit(name.clone()))?;

        let mut adopted = false;
        if unit.get_invocation(&draft.id).is_none() {
            if phase == Phase::Running {
                return Err(AllocatorError::UnknownInvocation(draft.id));
            }
            // Adopt: trust the client-asserted allocation.
            let inv = Invocation {
                id: draft.id.clone(),
                owner: draft.owner.clone(),
                purpose: draft.purpose.clone(),
                last_checkin: now,
                queue_id: 0,
                topologies: draft.topologies,
            };
            if !unit.allocate(inv) {
                return Err(AllocatorError::Internal(format!(
                    "{name} cannot be allocated (adopted)"
                )));
            }
            tracing::info!(unit = %name, invocation = %draft.id, "adopted allocation from before restart");
            adopted = true;
        }
        if let Some(occupant) = unit.get_invocation_mut(&draft.id) {
            occupant.last_checkin = now;
        }
        if adopted {
            self.record_audit(AuditAction::Adopt, &draft.id, Some(&name), &draft.owner);
        }
        Ok(RefreshResponse {
            id: draft.id,
            refresh_deadline_ms: now + self.allocation_refresh_ms,
        })
    }

    /// Return an allocation and/or unqueue the invocation everywhere.
    pub fn release(&self, req: ReleaseRequest) -> Result<ReleaseResponse, AllocatorError> {
        let mut state = self.state.lock();
        if req.id.is_empty() {
            return Err(AllocatorError::InvalidRequest(
                "invocation_id must be set".to_string(),
            ));
        }
        let mut count = 0;
        let mut owner = String::new();
        for unit in state.units.values_mut() {
            if let Some(occupant) = unit.get_invocation(&req.id) {
                owner = occupant.owner.clone();
            }
            count += unit.forget(&req.id);
        }
        if let Some(inv) = state.queue.forget(&req.id) {
            owner = inv.owner;
            count += 1;
        }
        if count == 0 {
            return Err(AllocatorError::UnknownInvocation(req.id));
        }
        tracing::info!(invocation = %req.id, released = count, "invocation released");
        self.record_audit(AuditAction::Release, &req.id, None, &owner);
        Ok(ReleaseResponse {})
    }

    /// Per-unit health/occupancy/topology snapshot. Queue contents are
    /// intentionally not reported.
    pub fn status(&self) -> StatusResponse {
        let state = self.state.lock();
        let now = self.clock.now_ms();
        StatusResponse {
            units: state.units.values().map(|unit| unit.stats(now)).collect(),
        }
    }

    /// One janitor pass: expire stale allocations and queue entries, then
    /// promote queued invocations onto free units. No-op while `Starting`.
    pub fn janitor_tick(&self) {
        let started = self.clock.now_ms();
        let mut state = self.state.lock();
        if state.phase == Phase::Starting {
            return;
        }
        let now = self.clock.now_ms();
        let allocation_cutoff = now.saturating_sub(self.allocation_refresh_ms);
        let queue_cutoff = now.saturating_sub(self.queue_refresh_ms);

        let ServiceState { units, queue, .. } = &mut *state;
        for (name, unit) in units.iter_mut() {
            if let Some(expired) = unit.expire_allocations(allocation_cutoff) {
                self.record_audit(AuditAction::Expire, &expired.id, Some(name), &expired.owner);
            }
        }
        let removed = queue.expire_queued(queue_cutoff);
        if removed > 0 {
            tracing::info!(removed, "expired queued invocations");
        }
        self.promote_locked(&mut state);
        drop(state);
        tracing::debug!(
            duration_ms = (self.clock.now_ms() - started) as u64,
            "janitor pass finished"
        );
    }

    /// Turn queued requests into allocations where a free matching unit
    /// exists.
    ///
    /// Scans in position order and skips entries that cannot currently be
    /// matched, so a request blocked on one resource type does not starve
    /// requests for a different, currently-free type.
    fn promote_locked(&self, state: &mut ServiceState) {
        let mut ids: Vec<String> = Vec::with_capacity(state.queue.len());
        let _ = state.queue.walk(|_, inv| {
            ids.push(inv.id.clone());
            true
        });
        for id in ids {
            let matches = match state.queue.get(&id) {
                Some((_, inv)) => self
                    .matchmaker
                    .matches(&state.units, inv, MatchMode::Availability),
                None => continue,
            };
            if matches.is_empty() || matches.iter().any(|names| names.is_empty()) {
                continue;
            }
            let Some(inv) = state.queue.forget(&id) else {
                continue;
            };
            for names in &matches {
                for name in names {
                    let Some(unit) = state.units.get_mut(name) else {
                        continue;
                    };
                    if !unit.allocate(inv.clone()) {
                        tracing::error!(unit = %name, invocation = %id, "promotion hit an already-owned unit");
                        continue;
                    }
                    self.record_audit(AuditAction::Promote, &id, Some(name), &inv.owner);
                }
            }
        }
    }

    fn resort_queue(&self, state: &mut ServiceState) {
        if let Some(comparator) = &self.priority {
            state.queue.sort(|a, b| comparator(a, b));
        }
    }

    fn record_audit(&self, action: AuditAction, inv_id: &str, unit: Option<&str>, owner: &str) {
        if let Some(sink) = &self.audit {
            sink.lock().record(AuditEvent {
                invocation_id: inv_id.to_string(),
                unit: unit.map(str::to_string),
                owner: owner.to_string(),
                action,
                created_at_ms: self.clock.now_ms(),
            });
        }
    }
}
