// ── Resource identity and desired state ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::pool::{GlobalPool, PoolReservation};
use super::site::{SiteKind, SiteNode, SitePath};

/// Every kind of resource the reconciler manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Area,
    Building,
    Floor,
    GlobalPool,
    PoolReservation,
}

impl ResourceKind {
    pub fn is_site(self) -> bool {
        matches!(self, Self::Area | Self::Building | Self::Floor)
    }
}

impl From<SiteKind> for ResourceKind {
    fn from(kind: SiteKind) -> Self {
        match kind {
            SiteKind::Area => Self::Area,
            SiteKind::Building => Self::Building,
            SiteKind::Floor => Self::Floor,
        }
    }
}

/// Identity of a resource, shared by desired and observed state.
///
/// Sites are identified by kind and full path (name + parent), pools by
/// name, reservations by name within their site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKey {
    Site { kind: SiteKind, path: SitePath },
    Pool { name: String },
    Reservation { site: SitePath, name: String },
}

impl ResourceKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Site { kind, .. } => (*kind).into(),
            Self::Pool { .. } => ResourceKind::GlobalPool,
            Self::Reservation { .. } => ResourceKind::PoolReservation,
        }
    }

    /// Short display name (last path segment for sites).
    pub fn name(&self) -> &str {
        match self {
            Self::Site { path, .. } => path.name(),
            Self::Pool { name } | Self::Reservation { name, .. } => name,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Site { kind, path } => write!(f, "{kind} '{path}'"),
            Self::Pool { name } => write!(f, "global pool '{name}'"),
            Self::Reservation { site, name } => write!(f, "reservation '{name}' at '{site}'"),
        }
    }
}

/// One desired resource of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DesiredResource {
    Site(SiteNode),
    Pool(GlobalPool),
    Reservation(PoolReservation),
}

impl DesiredResource {
    pub fn key(&self) -> ResourceKey {
        match self {
            Self::Site(node) => ResourceKey::Site {
                kind: node.kind(),
                path: node.path(),
            },
            Self::Pool(pool) => ResourceKey::Pool {
                name: pool.name.clone(),
            },
            Self::Reservation(res) => ResourceKey::Reservation {
                site: res.site.clone(),
                name: res.name.clone(),
            },
        }
    }
}

/// The complete desired configuration handed to the reconciler.
///
/// Declaration order (pools, then sites, then reservations, each in list
/// order) is the tie-breaker for plan ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub pools: Vec<GlobalPool>,
    #[serde(default)]
    pub sites: Vec<SiteNode>,
    #[serde(default)]
    pub reservations: Vec<PoolReservation>,
}

impl DesiredState {
    /// All resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = DesiredResource> + '_ {
        self.pools
            .iter()
            .cloned()
            .map(DesiredResource::Pool)
            .chain(self.sites.iter().cloned().map(DesiredResource::Site))
            .chain(
                self.reservations
                    .iter()
                    .cloned()
                    .map(DesiredResource::Reservation),
            )
    }

    pub fn len(&self) -> usize {
        self.pools.len() + self.sites.len() + self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
