//! Matching a request's topologies against the unit inventory.

use std::collections::BTreeMap;

use crate::core::invocation::Invocation;
use crate::core::query;
use crate::core::unit::Unit;

/// Pluggable structural-match predicate: does `unit` structurally satisfy
/// the requested topology, ignoring occupancy?
pub trait StructuralMatch: Send + Sync {
    /// Whether the unit structurally matches the requested topology.
    fn matches(&self, requested: &crate::core::invocation::Topology, unit: &Unit) -> bool;
}

/// Baseline predicate: exact topology-name equality.
#[derive(Debug, Default)]
pub struct NameEquality;

impl StructuralMatch for NameEquality {
    fn matches(&self, requested: &crate::core::invocation::Topology, unit: &Unit) -> bool {
        unit.topology.name == requested.name
    }
}

/// Query-aware predicate: when the requested topology carries a `filter`
/// attribute, that filter expression is evaluated against the unit;
/// otherwise this falls back to name equality. Units the expression fails
/// to evaluate against are treated as non-matching.
#[derive(Debug, Default)]
pub struct QueryFilter;

impl StructuralMatch for QueryFilter {
    fn matches(&self, requested: &crate::core::invocation::Topology, unit: &Unit) -> bool {
        match requested.attributes.get("filter") {
            Some(expr) => query::evaluate(expr, unit).unwrap_or(false),
            None => unit.topology.name == requested.name,
        }
    }
}

/// Match mode: feasibility collects every structural match regardless of
/// occupancy; availability skips allocated units and stops at the first
/// free structural match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Could this request ever succeed? Used once, at first contact.
    Feasibility,
    /// Which free unit can serve it right now?
    Availability,
}

/// Matches invocations against the unit inventory through an injected
/// structural predicate.
pub struct Matchmaker {
    predicate: Box<dyn StructuralMatch>,
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new(NameEquality)
    }
}

impl Matchmaker {
    /// Build a matchmaker around a structural predicate.
    pub fn new(predicate: impl StructuralMatch + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// For each requested topology, collect the names of matching units.
    ///
    /// The outer vector is indexed like `inv.topologies`. In
    /// [`MatchMode::Availability`] each inner vector holds at most one name
    /// (the first structurally matching free unit); in
    /// [`MatchMode::Feasibility`] it holds every structural match, occupied
    /// or not.
    pub fn matches(
        &self,
        units: &BTreeMap<String, Unit>,
        inv: &Invocation,
        mode: MatchMode,
    ) -> Vec<Vec<String>> {
        inv.topologies
            .iter()
            .map(|requested| {
                let mut found = Vec::new();
                for (name, unit) in units {
                    if mode == MatchMode::Availability && unit.is_allocated() {
                        continue;
                    }
                    if self.predicate.matches(requested, unit) {
                        found.push(name.clone());
                        if mode == MatchMode::Availability {
                            break;
                        }
                    }
                }
                found
            })
            .collect()
    }
}
