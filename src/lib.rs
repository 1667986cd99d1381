//! # Unit Allocator
//!
//! A shared-resource allocation and fair-queueing service for scarce, named
//! hardware test resources ("units": GPU topologies, license-gated rigs)
//! shared by many concurrent clients.
//!
//! ## Core Problem Solved
//!
//! Hardware test fleets have different constraints than typical web
//! backends:
//!
//! - **Scarce, named inventory**: each unit advertises one topology and
//!   holds at most one occupant at a time
//! - **Fairness under contention**: waiting requests keep a stable queue
//!   position that clients can poll without the server scanning the queue
//! - **Crash tolerance without persistence**: after a restart, live
//!   allocations and queue spots are rebuilt from client heartbeats during
//!   a short adoption window instead of being read back from disk
//!
//! ## Key Features
//!
//! - **Feasibility vs. availability matching**: an impossible request fails
//!   permanently at first contact; a merely-busy one queues
//! - **O(1) queue positions**: a virtual sequence number per entry makes
//!   position arithmetic anchor on the queue head, surviving removal,
//!   reordering, and injected prioritization policies
//! - **Boolean filter queries**: `numGpus = 2 AND ram >= 8M` style
//!   expressions evaluated against unit attributes
//! - **Coarse-grained locking**: one mutex serializes every operation and
//!   janitor pass; correctness is chosen over throughput
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use unit_allocator::builders::ServiceBuilder;
//! use unit_allocator::config::ServiceConfig;
//! use unit_allocator::runtime::{spawn_background, AllocateRequest, InvocationDraft};
//!
//! let config = ServiceConfig::from_json_str(&contents)?;
//! let service = Arc::new(ServiceBuilder::new(config).build()?);
//! let (_janitor, _adoption) = spawn_background(&service);
//!
//! let response = service.allocate(AllocateRequest {
//!     invocation: InvocationDraft {
//!         id: String::new(),
//!         owner: "ci-runner".into(),
//!         purpose: "//hw/tests:smoke".into(),
//!         topologies: vec![topology],
//!     },
//! })?;
//! ```
//!
//! For complete examples, see `tests/allocation_flow_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core allocation domain: queue, units, matching, queries, coordinator.
pub mod core;
/// Configuration models for the service inventory and timing.
pub mod config;
/// Builders to construct the service from configuration.
pub mod builders;
/// Boundary surface: request/response records and background tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;
