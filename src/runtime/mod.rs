//! Boundary surface: request/response records and background tasks.

pub mod api;
pub mod tasks;

pub use api::{
    Allocated, AllocateRequest, AllocateResponse, InvocationDraft, Queued, RefreshRequest,
    RefreshResponse, ReleaseRequest, ReleaseResponse, StatusResponse,
};
pub use tasks::{spawn_adoption_timer, spawn_background, spawn_janitor};
