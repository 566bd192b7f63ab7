// ccsync-api: Async Rust client for the Catalyst Center intent API.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod pools;
mod reservations;
mod sites;
mod tasks;

pub use auth::{AuthToken, Credentials};
pub use client::CatalystClient;
pub use error::Error;
pub use models::{
    AddressSpace, AreaSpec, BuildingSpec, ExecutionPhase, ExecutionStatus, FloorSpec, GlobalPool,
    GlobalPoolCreateRequest, Reservation, ReservationCreateRequest, ReservedPool, Site,
    SiteCreateRequest, SiteSpec, TaskHandle,
};
pub use transport::{TlsMode, TransportConfig};
