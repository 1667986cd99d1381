//! Position-stable FIFO queue of pending invocations.
//!
//! Beside the classic enqueue/dequeue operations, the queue maintains a
//! per-entry virtual sequence number ([`QueueId`]) so any member's position
//! can be computed in O(1) from the head entry, without scanning. Reordering
//! (swap, sort) moves payload and sequence number together, which keeps the
//! position arithmetic valid under any injected prioritization policy.
//!
//! The queue is not internally synchronized; the service's mutex serializes
//! all access.

use std::cmp::Ordering;

use crate::core::invocation::{Invocation, Position, QueueId};
use crate::util::clock::TimestampMs;

/// Ordered, position-stable collection of pending invocations.
#[derive(Debug, Default)]
pub struct InvocationQueue {
    entries: Vec<Invocation>,
}

impl InvocationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an invocation to the back of the queue, assigning its `QueueId`.
    ///
    /// Returns the 1-based position the invocation was queued at.
    pub fn enqueue(&mut self, mut inv: Invocation) -> Position {
        let offset: QueueId = match self.entries.first() {
            Some(head) => head.queue_id,
            None => 1,
        };
        inv.queue_id = offset + self.entries.len() as QueueId;
        self.entries.push(inv);
        self.entries.len() as Position
    }

    /// Remove and return the head of the queue, resetting its `QueueId` to
    /// the not-queued sentinel.
    pub fn dequeue(&mut self) -> Option<Invocation> {
        if self.entries.is_empty() {
            return None;
        }
        let mut inv = self.entries.remove(0);
        inv.queue_id = 0;
        Some(inv)
    }

    /// Number of queued invocations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based position of `inv`, or 0 if it is not queued.
    pub fn position(&self, inv: &Invocation) -> Position {
        match self.entries.first() {
            Some(head) if inv.queue_id != 0 => 1 + inv.queue_id - head.queue_id,
            _ => 0,
        }
    }

    /// Invoke `walker` for each entry in position order until it returns
    /// `false`; returns the entry and position the walk stopped on.
    pub fn walk<F>(&self, mut walker: F) -> Option<(Position, &Invocation)>
    where
        F: FnMut(Position, &Invocation) -> bool,
    {
        for (idx, inv) in self.entries.iter().enumerate() {
            let pos = idx as Position + 1;
            if !walker(pos, inv) {
                return Some((pos, inv));
            }
        }
        None
    }

    /// Look up an invocation by ID, returning it with its 1-based position.
    pub fn get(&self, inv_id: &str) -> Option<(Position, &Invocation)> {
        self.walk(|_, inv| inv.id != inv_id)
    }

    /// Mutable lookup by ID, returning the entry with its 1-based position.
    pub fn get_mut(&mut self, inv_id: &str) -> Option<(Position, &mut Invocation)> {
        self.entries
            .iter_mut()
            .enumerate()
            .find(|(_, inv)| inv.id == inv_id)
            .map(|(idx, inv)| (idx as Position + 1, inv))
    }

    /// Remove every entry the predicate selects, in one pass.
    ///
    /// Removed entries get the sentinel `QueueId`; each survivor's `QueueId`
    /// is decremented by the running removal count, preserving the position
    /// invariant without a full renumber. Returns the number removed.
    pub fn filter<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(Position, &Invocation) -> bool,
    {
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut removed = 0;
        for (idx, mut inv) in self.entries.drain(..).enumerate() {
            if predicate(idx as Position + 1, &inv) {
                removed += 1;
                continue;
            }
            inv.queue_id -= removed as QueueId;
            kept.push(inv);
        }
        self.entries = kept;
        removed
    }

    /// Remove the invocation with the given ID, returning it with its
    /// `QueueId` reset to the sentinel.
    pub fn forget(&mut self, inv_id: &str) -> Option<Invocation> {
        let mut found = None;
        self.filter(|_, inv| {
            if inv.id == inv_id {
                found = Some(inv.clone());
                true
            } else {
                false
            }
        });
        found.map(|mut inv| {
            inv.queue_id = 0;
            inv
        })
    }

    /// Remove all queued invocations whose heartbeat is at or before
    /// `cutoff`. Returns the number removed.
    pub fn expire_queued(&mut self, cutoff: TimestampMs) -> usize {
        self.filter(|_, inv| inv.last_checkin <= cutoff)
    }

    /// Exchange two entries, moving their `QueueId`s with them so position
    /// arithmetic stays correct for everyone.
    pub fn swap(&mut self, i: usize, j: usize) {
        let (qi, qj) = (self.entries[i].queue_id, self.entries[j].queue_id);
        self.entries[i].queue_id = qj;
        self.entries[j].queue_id = qi;
        self.entries.swap(i, j);
    }

    /// Stable-sort the queue with an injected comparator ("lesser" entries
    /// move to the front), keeping each slot's `QueueId` in place.
    pub fn sort<F>(&mut self, mut comparator: F)
    where
        F: FnMut(&Invocation, &Invocation) -> Ordering,
    {
        let ids: Vec<QueueId> = self.entries.iter().map(|inv| inv.queue_id).collect();
        self.entries.sort_by(|a, b| comparator(a, b));
        for (inv, id) in self.entries.iter_mut().zip(ids) {
            inv.queue_id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invocation::Topology;

    fn inv(id: &str, owner: &str, checkin: TimestampMs) -> Invocation {
        Invocation {
            id: id.to_string(),
            owner: owner.to_string(),
            purpose: format!("{owner}-purpose"),
            last_checkin: checkin,
            queue_id: 0,
            topologies: vec![Topology::named("topoA")],
        }
    }

    #[test]
    fn test_enqueue_assigns_position_one_for_head() {
        let mut q = InvocationQueue::new();
        assert_eq!(q.enqueue(inv("a", "alice", 10)), 1);
        let (pos, got) = q.get("a").unwrap();
        assert_eq!(pos, 1);
        assert_eq!(got.owner, "alice");
        assert_eq!(got.queue_id, 1);
        assert_eq!(q.position(got), 1);
    }

    #[test]
    fn test_enqueue_two_positions() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 10));
        assert_eq!(q.enqueue(inv("b", "bob", 20)), 2);
        assert_eq!(q.len(), 2);
        let (pos, got) = q.get("b").unwrap();
        assert_eq!(pos, 2);
        assert_eq!(got.owner, "bob");
    }

    #[test]
    fn test_dequeue_resets_queue_id() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 10));
        q.enqueue(inv("b", "bob", 20));
        let head = q.dequeue().unwrap();
        assert_eq!(head.id, "a");
        assert_eq!(head.queue_id, 0);
        assert_eq!(q.len(), 1);
        // Position math still anchors on the new head.
        let (pos, _) = q.get("b").unwrap();
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_dequeue_empty() {
        let mut q = InvocationQueue::new();
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn test_filter_preserves_position_invariant_for_survivors() {
        let mut q = InvocationQueue::new();
        for (id, owner) in [("a", "alice"), ("b", "bob"), ("c", "carol"), ("d", "dan")] {
            q.enqueue(inv(id, owner, 10));
        }
        // Drop b and c.
        let removed = q.filter(|_, inv| inv.id == "b" || inv.id == "c");
        assert_eq!(removed, 2);
        assert_eq!(q.len(), 2);
        let head_qid = q.get("a").unwrap().1.queue_id;
        for id in ["a", "d"] {
            let (pos, got) = q.get(id).unwrap();
            assert_eq!(pos, 1 + got.queue_id - head_qid);
        }
        assert_eq!(q.get("d").unwrap().0, 2);
    }

    #[test]
    fn test_forget_removes_by_id() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 10));
        q.enqueue(inv("b", "bob", 20));
        let gone = q.forget("a").unwrap();
        assert_eq!(gone.queue_id, 0);
        assert_eq!(q.len(), 1);
        assert!(q.forget("a").is_none());
    }

    #[test]
    fn test_expire_queued_is_at_or_before() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 1000));
        assert_eq!(q.expire_queued(999), 0);
        assert_eq!(q.expire_queued(1000), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn test_swap_moves_payload_and_queue_id_together() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 10));
        q.enqueue(inv("b", "bob", 20));
        q.swap(0, 1);
        assert_eq!(q.get("b").unwrap().0, 1);
        assert_eq!(q.get("a").unwrap().0, 2);
        let head_qid = q.get("b").unwrap().1.queue_id;
        let (pos_a, a) = q.get("a").unwrap();
        assert_eq!(pos_a, 1 + a.queue_id - head_qid);
    }

    #[test]
    fn test_sort_keeps_positions_valid() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "zoe", 10));
        q.enqueue(inv("b", "alice", 20));
        q.enqueue(inv("c", "mike", 30));
        q.sort(|x, y| x.owner.cmp(&y.owner));
        assert_eq!(q.get("b").unwrap().0, 1);
        assert_eq!(q.get("c").unwrap().0, 2);
        assert_eq!(q.get("a").unwrap().0, 3);
        // Every entry still satisfies the head-anchored identity.
        let head_qid = q.get("b").unwrap().1.queue_id;
        for id in ["a", "b", "c"] {
            let (pos, got) = q.get(id).unwrap();
            assert_eq!(pos, 1 + got.queue_id - head_qid);
        }
    }

    #[test]
    fn test_walk_stops_where_told() {
        let mut q = InvocationQueue::new();
        q.enqueue(inv("a", "alice", 10));
        q.enqueue(inv("b", "bob", 20));
        let (pos, got) = q.walk(|_, inv| inv.id != "b").unwrap();
        assert_eq!(pos, 2);
        assert_eq!(got.id, "b");
        assert!(q.walk(|_, _| true).is_none());
    }
}
