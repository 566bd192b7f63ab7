// ── Domain model ──
//
// Typed description of desired resources, shared with the inventory
// projection of observed controller state.

pub mod pool;
pub mod resource;
pub mod site;

pub use pool::{GlobalPool, PoolReservation};
pub use resource::{DesiredResource, DesiredState, ResourceKey, ResourceKind};
pub use site::{BuildingAttrs, FloorAttrs, SiteAttrs, SiteKind, SiteNode, SitePath};
