// ── Inventory reader ──
//
// Read-only view of what the controller currently has, normalized into
// the same `ResourceKey` identities as desired state. Listings are cached
// and invalidated per key whenever the reconciler mutates a resource.

use std::str::FromStr;
use std::sync::Arc;

use ccsync_api::{GlobalPool as ApiPool, Reservation as ApiReservation, Site as ApiSite};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ipnet::Ipv4Net;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::backend::ControllerApi;
use crate::error::CoreError;
use crate::model::{ResourceKey, ResourceKind, SiteKind, SitePath};
use crate::session::{CallMode, SessionManager};

/// One resource as observed on the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedResource {
    pub key: ResourceKey,
    /// Controller-assigned id.
    pub id: String,
    pub detail: ObservedDetail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservedDetail {
    Site {
        parent_id: Option<String>,
        /// `true` when the kind was guessed from hierarchy depth.
        inferred_kind: bool,
    },
    Pool {
        cidr: Option<Ipv4Net>,
        gateways: Vec<String>,
        dhcp_servers: Vec<String>,
        dns_servers: Vec<String>,
        used: Option<u64>,
        total: Option<u64>,
    },
    Reservation {
        site_id: String,
        pool_id: Option<String>,
        cidr: Option<Ipv4Net>,
        used: Option<u64>,
        total: Option<u64>,
    },
}

impl ObservedResource {
    pub fn kind(&self) -> ResourceKind {
        self.key.kind()
    }

    pub fn cidr(&self) -> Option<Ipv4Net> {
        match &self.detail {
            ObservedDetail::Pool { cidr, .. } | ObservedDetail::Reservation { cidr, .. } => *cidr,
            ObservedDetail::Site { .. } => None,
        }
    }
}

/// Point-in-time copy of the controller inventory.
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub taken_at: DateTime<Utc>,
    pub resources: Vec<ObservedResource>,
}

impl InventorySnapshot {
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ObservedResource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Sites,
    Pools,
}

pub struct InventoryReader<A> {
    session: Arc<SessionManager<A>>,
    cache: DashMap<Slot, Arc<Vec<ObservedResource>>>,
    /// Reservation listings are per site on the controller, so they are
    /// cached per site path.
    reservations: DashMap<SitePath, Arc<Vec<ObservedResource>>>,
}

impl<A: ControllerApi> InventoryReader<A> {
    pub fn new(session: Arc<SessionManager<A>>) -> Self {
        Self {
            session,
            cache: DashMap::new(),
            reservations: DashMap::new(),
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
        self.reservations.clear();
    }

    /// Drop cached listings that a mutation of `key` may have changed.
    ///
    /// Only the reservation listing of the affected site is dropped.
    pub fn invalidate(&self, key: &ResourceKey) {
        match key {
            ResourceKey::Site { path, .. } => {
                self.cache.remove(&Slot::Sites);
                self.reservations.remove(path);
            }
            ResourceKey::Pool { .. } => {
                self.cache.remove(&Slot::Pools);
            }
            ResourceKey::Reservation { site, .. } => {
                self.reservations.remove(site);
            }
        }
    }

    /// Every observed resource of `kind`, served from cache when warm.
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<ObservedResource>, CoreError> {
        let listed = match kind {
            ResourceKind::GlobalPool => self.pools().await?.to_vec(),
            ResourceKind::PoolReservation => self.all_reservations().await?,
            ResourceKind::Area | ResourceKind::Building | ResourceKind::Floor => self
                .sites()
                .await?
                .iter()
                .filter(|r| r.kind() == kind)
                .cloned()
                .collect(),
        };
        Ok(listed)
    }

    /// Look up the observed counterpart of a desired resource.
    ///
    /// Sites match on path alone: the observed kind may only be inferred.
    /// Reservations are looked up at their holding site only.
    pub async fn find(&self, key: &ResourceKey) -> Result<Option<ObservedResource>, CoreError> {
        let candidates = match key {
            ResourceKey::Site { .. } => self.sites().await?,
            ResourceKey::Pool { .. } => self.pools().await?,
            ResourceKey::Reservation { site, .. } => self.reservations_at(site).await?,
        };
        Ok(candidates
            .iter()
            .find(|r| same_identity(&r.key, key))
            .cloned())
    }

    pub async fn site_by_path(
        &self,
        path: &SitePath,
    ) -> Result<Option<ObservedResource>, CoreError> {
        let sites = self.sites().await?;
        Ok(sites
            .iter()
            .find(|r| matches!(&r.key, ResourceKey::Site { path: p, .. } if p == path))
            .cloned())
    }

    pub async fn pool_by_name(&self, name: &str) -> Result<Option<ObservedResource>, CoreError> {
        let pools = self.pools().await?;
        Ok(pools
            .iter()
            .find(|r| matches!(&r.key, ResourceKey::Pool { name: n } if n == name))
            .cloned())
    }

    /// Observed resources that still depend on `key`.
    ///
    /// A site is referenced by child sites and by reservations held at it.
    /// A pool is referenced by reservations carved from it, matched by
    /// parent id or, when the controller omits it, by CIDR containment.
    pub async fn references_to(&self, key: &ResourceKey) -> Result<Vec<ResourceKey>, CoreError> {
        match key {
            ResourceKey::Site { path, .. } => {
                let sites = self.sites().await?;
                let held = self.reservations_at(path).await?;
                let children = sites.iter().filter_map(|r| match &r.key {
                    ResourceKey::Site { path: p, .. } if p.parent().as_ref() == Some(path) => {
                        Some(r.key.clone())
                    }
                    _ => None,
                });
                Ok(children.chain(held.iter().map(|r| r.key.clone())).collect())
            }
            ResourceKey::Pool { .. } => {
                let Some(pool) = self.find(key).await? else {
                    return Ok(Vec::new());
                };
                let pool_cidr = pool.cidr();
                let reservations = self.all_reservations().await?;
                Ok(reservations
                    .iter()
                    .filter(|r| match &r.detail {
                        ObservedDetail::Reservation { pool_id, cidr, .. } => match pool_id {
                            Some(parent) => *parent == pool.id,
                            None => match (pool_cidr, cidr) {
                                (Some(outer), Some(inner)) => outer.contains(inner),
                                _ => false,
                            },
                        },
                        _ => false,
                    })
                    .map(|r| r.key.clone())
                    .collect())
            }
            ResourceKey::Reservation { .. } => Ok(Vec::new()),
        }
    }

    /// Full inventory, fetched fresh.
    pub async fn snapshot(&self) -> Result<InventorySnapshot, CoreError> {
        self.invalidate_all();
        let mut resources = Vec::new();
        for kind in ResourceKind::iter() {
            resources.extend(self.list(kind).await?);
        }
        Ok(InventorySnapshot {
            taken_at: Utc::now(),
            resources,
        })
    }

    // ── Fetching ─────────────────────────────────────────────────────

    async fn sites(&self) -> Result<Arc<Vec<ObservedResource>>, CoreError> {
        if let Some(cached) = self.cache.get(&Slot::Sites) {
            return Ok(Arc::clone(cached.value()));
        }
        let fresh = Arc::new(self.fetch_sites().await?);
        self.cache.insert(Slot::Sites, Arc::clone(&fresh));
        Ok(fresh)
    }

    async fn pools(&self) -> Result<Arc<Vec<ObservedResource>>, CoreError> {
        if let Some(cached) = self.cache.get(&Slot::Pools) {
            return Ok(Arc::clone(cached.value()));
        }
        let fresh = Arc::new(self.fetch_pools().await?);
        self.cache.insert(Slot::Pools, Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Reservations held at `path`; empty when the site does not exist.
    async fn reservations_at(
        &self,
        path: &SitePath,
    ) -> Result<Arc<Vec<ObservedResource>>, CoreError> {
        if let Some(cached) = self.reservations.get(path) {
            return Ok(Arc::clone(cached.value()));
        }
        let fresh = Arc::new(match self.site_by_path(path).await? {
            Some(site) => self.fetch_reservations(path, &site.id).await?,
            None => Vec::new(),
        });
        self.reservations.insert(path.clone(), Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Reservations at every observed site, fetching only uncached sites.
    async fn all_reservations(&self) -> Result<Vec<ObservedResource>, CoreError> {
        let sites = self.sites().await?;
        let mut observed = Vec::new();
        for site in &*sites {
            if let ResourceKey::Site { path, .. } = &site.key {
                observed.extend(self.reservations_at(path).await?.iter().cloned());
            }
        }
        Ok(observed)
    }

    async fn fetch_sites(&self) -> Result<Vec<ObservedResource>, CoreError> {
        let sites = self
            .session
            .call(CallMode::Idempotent, |api, token| async move {
                api.list_sites(&token).await
            })
            .await?;
        let observed: Vec<ObservedResource> = sites.iter().filter_map(observe_site).collect();
        debug!(count = observed.len(), "listed sites");
        Ok(observed)
    }

    async fn fetch_pools(&self) -> Result<Vec<ObservedResource>, CoreError> {
        let pools = self
            .session
            .call(CallMode::Idempotent, |api, token| async move {
                api.list_global_pools(&token).await
            })
            .await?;
        debug!(count = pools.len(), "listed global pools");
        Ok(pools.iter().map(observe_pool).collect())
    }

    async fn fetch_reservations(
        &self,
        path: &SitePath,
        site_id: &str,
    ) -> Result<Vec<ObservedResource>, CoreError> {
        let id = site_id.to_owned();
        let reservations = self
            .session
            .call(CallMode::Idempotent, move |api, token| {
                let id = id.clone();
                async move { api.list_reservations(&token, &id).await }
            })
            .await?;
        debug!(site = %path, count = reservations.len(), "listed reservations");
        Ok(reservations
            .iter()
            .map(|r| observe_reservation(r, path, site_id))
            .collect())
    }
}

fn same_identity(observed: &ResourceKey, desired: &ResourceKey) -> bool {
    match (observed, desired) {
        (ResourceKey::Site { path: a, .. }, ResourceKey::Site { path: b, .. }) => a == b,
        _ => observed == desired,
    }
}

// ── Normalization ────────────────────────────────────────────────────

fn observe_site(site: &ApiSite) -> Option<ObservedResource> {
    let path = SitePath::new(site.hierarchy());
    if path.is_root() {
        return None;
    }
    let advertised = site
        .site_type()
        .and_then(|t| SiteKind::from_str(t).ok());
    let (kind, inferred_kind) = match advertised {
        Some(kind) => (kind, false),
        None => (SiteKind::from_depth(path.depth())?, true),
    };
    Some(ObservedResource {
        key: ResourceKey::Site { kind, path },
        id: site.id.clone(),
        detail: ObservedDetail::Site {
            parent_id: site.parent_id.clone(),
            inferred_kind,
        },
    })
}

fn observe_pool(pool: &ApiPool) -> ObservedResource {
    ObservedResource {
        key: ResourceKey::Pool {
            name: pool.ip_pool_name.clone(),
        },
        id: pool.id.clone(),
        detail: ObservedDetail::Pool {
            cidr: parse_cidr(&pool.ip_pool_cidr),
            gateways: pool.gateways.clone(),
            dhcp_servers: pool.dhcp_server_ips.clone(),
            dns_servers: pool.dns_server_ips.clone(),
            used: pool.used_ip_address_count,
            total: pool.total_ip_address_count,
        },
    }
}

fn observe_reservation(res: &ApiReservation, site: &SitePath, site_id: &str) -> ObservedResource {
    let v4 = res.ipv4_pool();
    ObservedResource {
        key: ResourceKey::Reservation {
            site: site.clone(),
            name: res.group_name.clone(),
        },
        id: res.id.clone(),
        detail: ObservedDetail::Reservation {
            site_id: res.site_id.clone().unwrap_or_else(|| site_id.to_owned()),
            pool_id: v4.and_then(|p| p.parent_uuid.clone()),
            cidr: v4.and_then(|p| parse_cidr(&p.ip_pool_cidr)),
            used: v4.and_then(|p| p.used_ip_address_count),
            total: v4.and_then(|p| p.total_ip_address_count),
        },
    }
}

fn parse_cidr(raw: &str) -> Option<Ipv4Net> {
    match raw.parse() {
        Ok(prefix) => Some(prefix),
        Err(_) => {
            if !raw.is_empty() {
                warn!(cidr = raw, "ignoring unparseable CIDR from controller");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: &str, hierarchy: &str, kind: Option<&str>) -> ApiSite {
        let info = kind.map(|k| {
            serde_json::json!({ "namespace": "Location", "attributes": { "type": k } })
        });
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": hierarchy.rsplit('/').next(),
            "siteNameHierarchy": hierarchy,
            "additionalInfo": info.into_iter().collect::<Vec<_>>(),
        }))
        .expect("site json")
    }

    #[test]
    fn global_root_is_not_observed() {
        assert!(observe_site(&site("g", "Global", None)).is_none());
    }

    #[test]
    fn advertised_type_wins_over_depth() {
        let observed = observe_site(&site("1", "Global/US/Campus/HQ", Some("building")))
            .expect("observed");
        assert!(matches!(
            observed.key,
            ResourceKey::Site {
                kind: SiteKind::Building,
                ..
            }
        ));
        assert!(matches!(
            observed.detail,
            ObservedDetail::Site {
                inferred_kind: false,
                ..
            }
        ));
    }

    #[test]
    fn kind_falls_back_to_depth() {
        let observed = observe_site(&site("1", "Global/US/HQ", None)).expect("observed");
        assert_eq!(observed.kind(), ResourceKind::Area);
        let observed = observe_site(&site("2", "Global/US/SJ/HQ", None)).expect("observed");
        assert_eq!(observed.kind(), ResourceKind::Building);
    }

    #[test]
    fn site_identity_ignores_kind() {
        let observed = ResourceKey::Site {
            kind: SiteKind::Area,
            path: SitePath::new("Global/US/HQ"),
        };
        let desired = ResourceKey::Site {
            kind: SiteKind::Building,
            path: SitePath::new("Global/US/HQ"),
        };
        assert!(same_identity(&observed, &desired));
    }
}
