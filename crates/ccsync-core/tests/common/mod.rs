// In-memory controller for driving the reconciler end to end.
//
// Mutations take effect at submit time unless a task failure is scripted
// for the resource; execution status then reports the scripted outcome.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ccsync_api::models::AdditionalInfo;
use ccsync_api::{
    AuthToken, Credentials, Error as ApiError, ExecutionStatus, GlobalPool, GlobalPoolCreateRequest,
    Reservation, ReservationCreateRequest, ReservedPool, Site, SiteCreateRequest, SiteSpec,
    TaskHandle,
};
use ccsync_core::{
    BuildingAttrs, Controller, ControllerApi, ControllerConfig, DesiredState, PoolReservation,
    SiteNode,
};
use serde_json::json;

pub const GLOBAL_ID: &str = "global-0000";

#[derive(Default)]
struct State {
    next_id: u64,
    sites: Vec<Site>,
    pools: Vec<GlobalPool>,
    reservations: Vec<Reservation>,
    /// execution id -> (in-progress polls left, outcome)
    tasks: HashMap<String, (u32, Result<(), String>)>,
    calls: Vec<String>,
    logins: u32,

    // ── Scripted behavior ──
    reject_login: bool,
    login_delay: Duration,
    expire_tokens: u32,
    in_progress_polls: u32,
    transient_polls: u32,
    alternate_poll_failures: bool,
    polls: u32,
    task_failures: HashMap<String, String>,
    rejections: HashMap<String, String>,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn record(&mut self, call: String) -> Result<(), ApiError> {
        self.calls.push(call);
        if self.expire_tokens > 0 {
            self.expire_tokens -= 1;
            return Err(ApiError::SessionExpired);
        }
        Ok(())
    }

    /// HTTP 400 for a create scripted with [`FakeController::reject_create`].
    fn check_rejection(&self, name: &str) -> Result<(), ApiError> {
        match self.rejections.get(name) {
            Some(message) => Err(ApiError::Api {
                status: 400,
                message: message.clone(),
                code: None,
            }),
            None => Ok(()),
        }
    }

    fn accept(&mut self, name: &str, apply: impl FnOnce(&mut Self)) -> TaskHandle {
        let outcome = match self.task_failures.get(name) {
            Some(reason) => Err(reason.clone()),
            None => {
                apply(self);
                Ok(())
            }
        };
        let id = self.id("exec");
        self.tasks.insert(id.clone(), (self.in_progress_polls, outcome));
        TaskHandle {
            execution_id: Some(id),
            execution_status_url: None,
            message: None,
        }
    }

    fn site_by_id(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }
}

#[derive(Default)]
pub struct FakeController {
    state: Mutex<State>,
}

impl FakeController {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        fake.with(|s| {
            s.sites.push(Site {
                id: GLOBAL_ID.into(),
                name: "Global".into(),
                site_name_hierarchy: Some("Global".into()),
                parent_id: None,
                additional_info: Vec::new(),
            });
        });
        Arc::new(fake)
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    // ── Scripting ──

    pub fn reject_login(&self) {
        self.with(|s| s.reject_login = true);
    }

    pub fn set_login_delay(&self, delay: Duration) {
        self.with(|s| s.login_delay = delay);
    }

    /// Reject the next `n` authenticated calls with HTTP 401.
    pub fn expire_tokens(&self, n: u32) {
        self.with(|s| s.expire_tokens = n);
    }

    /// Every task reports in-progress `n` times before settling.
    pub fn set_in_progress_polls(&self, n: u32) {
        self.with(|s| s.in_progress_polls = n);
    }

    /// The next `n` status polls fail with HTTP 503.
    pub fn fail_polls_transiently(&self, n: u32) {
        self.with(|s| s.transient_polls = n);
    }

    /// Every odd-numbered status poll fails with HTTP 503.
    pub fn alternate_poll_failures(&self) {
        self.with(|s| s.alternate_poll_failures = true);
    }

    /// Creating the resource called `name` is refused with HTTP 400.
    pub fn reject_create(&self, name: &str, message: &str) {
        self.with(|s| s.rejections.insert(name.into(), message.into()));
    }

    /// The task for the resource called `name` fails with `reason`.
    pub fn fail_task_for(&self, name: &str, reason: &str) {
        self.with(|s| s.task_failures.insert(name.into(), reason.into()));
    }

    // ── Inspection ──

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    /// Only the create/delete calls, in submission order.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("create ") || c.starts_with("delete "))
            .collect()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| c.starts_with(prefix)).count())
    }

    pub fn logins(&self) -> u32 {
        self.with(|s| s.logins)
    }

    pub fn site_paths(&self) -> Vec<String> {
        self.with(|s| {
            s.sites
                .iter()
                .filter(|site| site.id != GLOBAL_ID)
                .filter_map(|site| site.site_name_hierarchy.clone())
                .collect()
        })
    }

    pub fn pool_names(&self) -> Vec<String> {
        self.with(|s| s.pools.iter().map(|p| p.ip_pool_name.clone()).collect())
    }

    pub fn reservation_names(&self) -> Vec<String> {
        self.with(|s| s.reservations.iter().map(|r| r.group_name.clone()).collect())
    }
}

impl ControllerApi for FakeController {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthToken, ApiError> {
        let (delay, reject, n) = self.with(|s| {
            s.calls.push("login".into());
            (s.login_delay, s.reject_login, s.logins + 1)
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if reject {
            return Err(ApiError::Authentication {
                message: "invalid credentials".into(),
            });
        }
        self.with(|s| s.logins += 1);
        Ok(AuthToken::new(format!("token-{n}")))
    }

    async fn list_sites(&self, _token: &AuthToken) -> Result<Vec<Site>, ApiError> {
        self.with(|s| {
            s.record("list sites".into())?;
            Ok(s.sites.clone())
        })
    }

    async fn list_global_pools(&self, _token: &AuthToken) -> Result<Vec<GlobalPool>, ApiError> {
        self.with(|s| {
            s.record("list pools".into())?;
            Ok(s.pools.clone())
        })
    }

    async fn list_reservations(
        &self,
        _token: &AuthToken,
        site_id: &str,
    ) -> Result<Vec<Reservation>, ApiError> {
        self.with(|s| {
            s.record(format!("list reservations {site_id}"))?;
            Ok(s.reservations
                .iter()
                .filter(|r| r.site_id.as_deref() == Some(site_id))
                .cloned()
                .collect())
        })
    }

    async fn execution_status(
        &self,
        _token: &AuthToken,
        handle: &TaskHandle,
    ) -> Result<Option<ExecutionStatus>, ApiError> {
        self.with(|s| {
            let id = handle.execution_id.clone().unwrap_or_default();
            s.record(format!("status {id}"))?;
            s.polls += 1;
            if s.alternate_poll_failures && s.polls % 2 == 1 {
                return Err(ApiError::Api {
                    status: 503,
                    message: "service unavailable".into(),
                    code: None,
                });
            }
            if s.transient_polls > 0 {
                s.transient_polls -= 1;
                return Err(ApiError::Api {
                    status: 503,
                    message: "service unavailable".into(),
                    code: None,
                });
            }
            let Some((polls_left, outcome)) = s.tasks.get_mut(&id) else {
                return Err(ApiError::Api {
                    status: 404,
                    message: "execution not found".into(),
                    code: None,
                });
            };
            if *polls_left > 0 {
                *polls_left -= 1;
                return Ok(Some(ExecutionStatus {
                    status: Some("IN_PROGRESS".into()),
                    ..ExecutionStatus::default()
                }));
            }
            Ok(Some(match outcome {
                Ok(()) => ExecutionStatus {
                    status: Some("SUCCESS".into()),
                    end_time: Some(json!(1_700_000_000_000_u64)),
                    ..ExecutionStatus::default()
                },
                Err(reason) => ExecutionStatus {
                    status: Some("FAILURE".into()),
                    bapi_error: Some(reason.clone()),
                    ..ExecutionStatus::default()
                },
            }))
        })
    }

    async fn create_site(
        &self,
        _token: &AuthToken,
        request: &SiteCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        let (name, parent) = match &request.site {
            SiteSpec::Area(a) => (a.name.clone(), a.parent_name.clone()),
            SiteSpec::Building(b) => (b.name.clone(), b.parent_name.clone()),
            SiteSpec::Floor(f) => (f.name.clone(), f.parent_name.clone()),
        };
        let path = format!("{parent}/{name}");
        let kind = request.site_type;
        self.with(|s| {
            s.record(format!("create site {path}"))?;
            s.check_rejection(&name)?;
            let parent_id = s
                .sites
                .iter()
                .find(|site| site.site_name_hierarchy.as_deref() == Some(parent.as_str()))
                .map(|site| site.id.clone())
                .ok_or_else(|| ApiError::Api {
                    status: 400,
                    message: format!("parent {parent} does not exist"),
                    code: None,
                })?;
            let id = s.id("site");
            Ok(s.accept(&name, |s| {
                let mut attributes = serde_json::Map::new();
                attributes.insert("type".into(), json!(kind));
                s.sites.push(Site {
                    id,
                    name: name.clone(),
                    site_name_hierarchy: Some(path),
                    parent_id: Some(parent_id),
                    additional_info: vec![AdditionalInfo {
                        namespace: Some("Location".into()),
                        attributes,
                    }],
                });
            }))
        })
    }

    async fn delete_site(&self, _token: &AuthToken, site_id: &str) -> Result<TaskHandle, ApiError> {
        self.with(|s| {
            let Some(site) = s.site_by_id(site_id).cloned() else {
                return Err(ApiError::Api {
                    status: 404,
                    message: format!("site {site_id} not found"),
                    code: None,
                });
            };
            s.record(format!("delete site {}", site.hierarchy()))?;
            let id = site.id.clone();
            Ok(s.accept(&site.name, |s| s.sites.retain(|x| x.id != id)))
        })
    }

    async fn create_global_pool(
        &self,
        _token: &AuthToken,
        request: &GlobalPoolCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        self.with(|s| {
            s.record(format!("create pool {}", request.name))?;
            s.check_rejection(&request.name)?;
            let id = s.id("pool");
            let space = &request.address_space;
            Ok(s.accept(&request.name, |s| {
                s.pools.push(GlobalPool {
                    id,
                    ip_pool_name: request.name.clone(),
                    ip_pool_cidr: format!("{}/{}", space.subnet, space.prefix_length),
                    gateways: space.gateway_ip_address.iter().cloned().collect(),
                    dhcp_server_ips: space.dhcp_servers.clone(),
                    dns_server_ips: space.dns_servers.clone(),
                    used_ip_address_count: Some(0),
                    total_ip_address_count: Some(1 << (32 - u32::from(space.prefix_length))),
                    total_assignable_ip_address_count: None,
                });
            }))
        })
    }

    async fn delete_global_pool(
        &self,
        _token: &AuthToken,
        pool_id: &str,
    ) -> Result<TaskHandle, ApiError> {
        self.with(|s| {
            let Some(pool) = s.pools.iter().find(|p| p.id == pool_id).cloned() else {
                return Err(ApiError::Api {
                    status: 404,
                    message: format!("pool {pool_id} not found"),
                    code: None,
                });
            };
            s.record(format!("delete pool {}", pool.ip_pool_name))?;
            let id = pool.id.clone();
            Ok(s.accept(&pool.ip_pool_name, |s| s.pools.retain(|p| p.id != id)))
        })
    }

    async fn create_reservation(
        &self,
        _token: &AuthToken,
        site_id: &str,
        request: &ReservationCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        self.with(|s| {
            s.record(format!("create reservation {}", request.name))?;
            s.check_rejection(&request.name)?;
            let parent = s
                .pools
                .iter()
                .find(|p| p.ip_pool_cidr == request.ipv4_global_pool)
                .map(|p| p.id.clone())
                .ok_or_else(|| ApiError::Api {
                    status: 400,
                    message: format!("global pool {} not found", request.ipv4_global_pool),
                    code: Some("NCIP10283".into()),
                })?;
            let id = s.id("reservation");
            let cidr = format!("{}/{}", request.ipv4_subnet, request.ipv4_prefix_length);
            let site_id = site_id.to_owned();
            Ok(s.accept(&request.name, |s| {
                s.reservations.push(Reservation {
                    id,
                    group_name: request.name.clone(),
                    site_id: Some(site_id),
                    ip_pools: vec![ReservedPool {
                        id: None,
                        ip_pool_cidr: cidr,
                        parent_uuid: Some(parent),
                        ipv6: Some(false),
                        gateways: vec![request.ipv4_gateway.clone()],
                        used_ip_address_count: Some(0),
                        total_ip_address_count: Some(
                            1 << (32 - u32::from(request.ipv4_prefix_length)),
                        ),
                    }],
                });
            }))
        })
    }

    async fn delete_reservation(
        &self,
        _token: &AuthToken,
        reservation_id: &str,
    ) -> Result<TaskHandle, ApiError> {
        self.with(|s| {
            let Some(res) = s.reservations.iter().find(|r| r.id == reservation_id).cloned() else {
                return Err(ApiError::Api {
                    status: 404,
                    message: format!("reservation {reservation_id} not found"),
                    code: None,
                });
            };
            s.record(format!("delete reservation {}", res.group_name))?;
            let id = res.id.clone();
            Ok(s.accept(&res.group_name, |s| s.reservations.retain(|r| r.id != id)))
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

pub fn config() -> ControllerConfig {
    ControllerConfig::new(
        "https://cc.example.test".parse().unwrap(),
        "admin",
        "s3cret".to_string().into(),
    )
}

pub fn controller(fake: &Arc<FakeController>) -> Controller<FakeController> {
    Controller::with_api(Arc::clone(fake), config())
}

/// Pool `US_CORP`, area `US`, building `HQ`, reservation `HQ_CORP`.
pub fn us_corp() -> DesiredState {
    DesiredState {
        pools: vec![ccsync_core::GlobalPool::new(
            "US_CORP",
            "10.201.0.0/16".parse().unwrap(),
        )],
        sites: vec![
            SiteNode::area("US", "Global"),
            SiteNode::building("HQ", "Global/US", BuildingAttrs::default()),
        ],
        reservations: vec![PoolReservation::new(
            "HQ_CORP",
            "US_CORP",
            "Global/US/HQ",
            "10.201.1.0/24".parse().unwrap(),
        )],
    }
}
