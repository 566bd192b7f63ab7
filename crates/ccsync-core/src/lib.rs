//! Desired-state reconciliation engine for Catalyst Center.
//!
//! Takes a typed description of site hierarchy nodes, global IP pools, and
//! pool reservations, and makes the controller match it:
//!
//! - **[`ResourceGraph`]** validates the desired state and computes a
//!   deterministic creation order (and its exact reverse for deletion).
//!   Dangling references are rejected before any network call.
//!
//! - **[`SessionManager`]** owns the controller token. Exactly one login is
//!   in flight at a time; a rejected token is refreshed once per call.
//!
//! - **[`TaskTracker`]** polls asynchronous controller tasks with capped
//!   exponential backoff until they settle, time out, or the run is
//!   cancelled.
//!
//! - **[`InventoryReader`]** projects controller state into the same
//!   [`ResourceKey`] identities as desired state, for existence checks,
//!   deletion guards, and `status`.
//!
//! - **[`Reconciler`]** walks a [`Plan`] step by step and produces a
//!   [`RunReport`].
//!
//! [`Controller`] wires all of the above behind one facade. The HTTP
//! surface is abstracted by [`ControllerApi`] so the engine can be driven
//! against an in-memory controller.

pub mod backend;
mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod inventory;
pub mod model;
pub mod reconciler;
pub mod report;
pub mod session;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::ControllerApi;
pub use config::{ControllerConfig, SessionPolicy, TaskPolicy, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use graph::{Operation, Plan, PlanStep, ResourceGraph};
pub use inventory::{InventoryReader, InventorySnapshot, ObservedDetail, ObservedResource};
pub use reconciler::{Reconciler, StepPhase};
pub use report::{FailureKind, OutcomeState, ResourceOutcome, RunReport, RunStatus};
pub use session::{CallMode, Credential, SessionManager};
pub use tracker::{Task, TaskState, TaskTracker};

pub use ipnet::Ipv4Net;
pub use model::{
    BuildingAttrs, DesiredResource, DesiredState, FloorAttrs, GlobalPool, PoolReservation,
    ResourceKey, ResourceKind, SiteAttrs, SiteKind, SiteNode, SitePath,
};
