// ── Reconciler ──
//
// Drives a plan one step at a time through an explicit per-resource state
// machine:
//
//   NotStarted -> ExistsCheck -> Skip
//                             -> Submit -> Polling -> Done
//
// Any phase may fail. Non-fatal failures are recorded against the step and
// its dependents are skipped; fatal ones abort the run and leave the rest
// of the plan `NotAttempted`.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use ccsync_api::{
    AddressSpace, AreaSpec, BuildingSpec, FloorSpec, GlobalPoolCreateRequest,
    ReservationCreateRequest, SiteCreateRequest, SiteSpec, TaskHandle,
};
use chrono::Utc;
use serde::Serialize;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ControllerApi;
use crate::error::CoreError;
use crate::graph::{Operation, Plan, PlanStep};
use crate::inventory::{InventoryReader, ObservedDetail, ObservedResource};
use crate::model::{
    DesiredResource, GlobalPool, PoolReservation, ResourceKey, ResourceKind, SiteAttrs, SiteNode,
};
use crate::report::{OutcomeState, ResourceOutcome, RunReport};
use crate::session::{CallMode, SessionManager};
use crate::tracker::TaskTracker;

const POOL_TYPE: &str = "Generic";

/// Phase of a single plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepPhase {
    NotStarted,
    ExistsCheck,
    Skip,
    Submit,
    Polling,
    Done,
}

/// A step failure together with the phase it happened in.
#[derive(Debug)]
struct StepFailure {
    phase: StepPhase,
    error: CoreError,
}

trait AtPhase<T> {
    fn at(self, phase: StepPhase) -> Result<T, StepFailure>;
}

impl<T> AtPhase<T> for Result<T, CoreError> {
    fn at(self, phase: StepPhase) -> Result<T, StepFailure> {
        self.map_err(|error| StepFailure { phase, error })
    }
}

pub struct Reconciler<A> {
    session: Arc<SessionManager<A>>,
    inventory: Arc<InventoryReader<A>>,
    tracker: TaskTracker<A>,
    cancel: CancellationToken,
}

impl<A: ControllerApi> Reconciler<A> {
    pub fn new(
        session: Arc<SessionManager<A>>,
        inventory: Arc<InventoryReader<A>>,
        tracker: TaskTracker<A>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            inventory,
            tracker,
            cancel,
        }
    }

    /// Execute `plan` and report every step's outcome.
    ///
    /// Never returns an error: fatal conditions are reported as an
    /// `Aborted` run.
    pub async fn run(&self, plan: &Plan) -> RunReport {
        let mut report = RunReport::begin(plan);
        self.inventory.invalidate_all();

        info!(
            run_id = %report.run_id,
            operation = %plan.operation(),
            steps = plan.len(),
            "run started"
        );

        // Steps that failed or were skipped because something they need failed.
        let mut unhealthy: HashSet<ResourceKey> = HashSet::new();

        for step in plan.steps() {
            if self.cancel.is_cancelled() {
                warn!(run_id = %report.run_id, "run cancelled");
                let err = CoreError::Cancelled;
                report.abort(err.kind(), err.to_string());
                break;
            }

            let blocked_by: Vec<ResourceKey> = step
                .depends_on
                .iter()
                .filter(|dep| unhealthy.contains(*dep))
                .cloned()
                .collect();

            let mut outcome = ResourceOutcome::new(step.key.clone(), OutcomeState::NotAttempted);

            if !blocked_by.is_empty() {
                warn!(resource = %step.key, blocked = blocked_by.len(), "skipped, dependency failed");
                unhealthy.insert(step.key.clone());
                outcome.state = OutcomeState::SkippedDependencyFailed { blocked_by };
                report.outcomes.insert(step.key.clone(), outcome);
                continue;
            }

            let result = self.execute(step, &mut outcome).await;
            outcome.finished_at = Some(Utc::now());

            let fatal = match result {
                Ok(()) => None,
                Err(StepFailure { phase, error }) => {
                    if let Some(id) = error.task_id() {
                        outcome.task_id.get_or_insert_with(|| id.to_owned());
                    }
                    outcome.state = OutcomeState::Failed {
                        kind: error.kind(),
                        detail: error.to_string(),
                        phase,
                    };
                    unhealthy.insert(step.key.clone());
                    warn!(resource = %step.key, %phase, error = %error, "step failed");
                    error.is_fatal().then_some(error)
                }
            };

            report.outcomes.insert(step.key.clone(), outcome);

            if let Some(error) = fatal {
                warn!(run_id = %report.run_id, error = %error, "run aborted");
                report.abort(error.kind(), error.to_string());
                break;
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            status = %report.status,
            done = report.count(|s| matches!(s, OutcomeState::Done)),
            skipped = report.count(|s| matches!(s, OutcomeState::Skipped)),
            failed = report.count(|s| !s.is_ok()),
            "run finished"
        );
        report
    }

    async fn execute(
        &self,
        step: &PlanStep,
        outcome: &mut ResourceOutcome,
    ) -> Result<(), StepFailure> {
        let mut phase = StepPhase::NotStarted;
        let mut observed: Option<ObservedResource> = None;
        let mut handle: Option<TaskHandle> = None;

        loop {
            debug!(resource = %step.key, %phase, "step phase");
            phase = match phase {
                StepPhase::NotStarted => StepPhase::ExistsCheck,

                StepPhase::ExistsCheck => {
                    observed = self.inventory.find(&step.key).await.at(phase)?;
                    match (step.operation, &observed) {
                        (Operation::Create, Some(existing)) => {
                            if existing.key != step.key {
                                warn!(
                                    desired = %step.key,
                                    observed = %existing.key,
                                    "existing resource has a different kind"
                                );
                            }
                            StepPhase::Skip
                        }
                        (Operation::Delete, None) => StepPhase::Skip,
                        (Operation::Create, None) => StepPhase::Submit,
                        (Operation::Delete, Some(_)) => {
                            self.guard_delete(&step.key).await.at(phase)?;
                            StepPhase::Submit
                        }
                    }
                }

                StepPhase::Skip => {
                    info!(resource = %step.key, "already in desired state");
                    outcome.state = OutcomeState::Skipped;
                    return Ok(());
                }

                StepPhase::Submit => {
                    outcome.submitted_at = Some(Utc::now());
                    let submitted = match (step.operation, &observed) {
                        (Operation::Create, _) => self.submit_create(&step.resource).await,
                        (Operation::Delete, Some(target)) => self.submit_delete(target).await,
                        (Operation::Delete, None) => Err(CoreError::Internal(format!(
                            "delete of {} submitted without an observed target",
                            step.key
                        ))),
                    };
                    let submitted = submitted.at(phase)?;
                    outcome.task_id = submitted.label().map(str::to_owned);
                    self.inventory.invalidate(&step.key);
                    handle = Some(submitted);
                    StepPhase::Polling
                }

                StepPhase::Polling => {
                    let Some(pending) = handle.as_ref() else {
                        return Err(StepFailure {
                            phase,
                            error: CoreError::Internal("polling without a task handle".into()),
                        });
                    };
                    let task = self.tracker.await_handle(pending, &step.key).await;
                    // The controller may have changed even if the task failed.
                    self.inventory.invalidate(&step.key);
                    let task = task.at(phase)?;
                    debug!(resource = %step.key, polls = task.polls, "task settled");
                    StepPhase::Done
                }

                StepPhase::Done => {
                    info!(resource = %step.key, operation = %step.operation, "done");
                    outcome.state = OutcomeState::Done;
                    return Ok(());
                }
            };
        }
    }

    /// Refuse to delete a site or pool that is still referenced.
    async fn guard_delete(&self, key: &ResourceKey) -> Result<(), CoreError> {
        if matches!(key, ResourceKey::Reservation { .. }) {
            return Ok(());
        }
        let referenced_by = self.inventory.references_to(key).await?;
        if referenced_by.is_empty() {
            return Ok(());
        }
        Err(CoreError::DependencyConflict {
            resource: key.to_string(),
            referenced_by: referenced_by.iter().map(ToString::to_string).collect(),
        })
    }

    // ── Submission ───────────────────────────────────────────────────

    async fn submit_create(&self, resource: &DesiredResource) -> Result<TaskHandle, CoreError> {
        match resource {
            DesiredResource::Site(node) => {
                let request = Arc::new(site_request(node));
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let request = Arc::clone(&request);
                        async move { api.create_site(&token, &request).await }
                    })
                    .await
            }
            DesiredResource::Pool(pool) => {
                let request = Arc::new(pool_request(pool));
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let request = Arc::clone(&request);
                        async move { api.create_global_pool(&token, &request).await }
                    })
                    .await
            }
            DesiredResource::Reservation(res) => {
                let (site_id, request) = self.reservation_request(res).await?;
                let request = Arc::new(request);
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let request = Arc::clone(&request);
                        let site_id = site_id.clone();
                        async move { api.create_reservation(&token, &site_id, &request).await }
                    })
                    .await
            }
        }
    }

    async fn submit_delete(&self, target: &ObservedResource) -> Result<TaskHandle, CoreError> {
        let id = target.id.clone();
        match target.kind() {
            ResourceKind::Area | ResourceKind::Building | ResourceKind::Floor => {
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let id = id.clone();
                        async move { api.delete_site(&token, &id).await }
                    })
                    .await
            }
            ResourceKind::GlobalPool => {
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let id = id.clone();
                        async move { api.delete_global_pool(&token, &id).await }
                    })
                    .await
            }
            ResourceKind::PoolReservation => {
                self.session
                    .call(CallMode::Mutation, move |api, token| {
                        let id = id.clone();
                        async move { api.delete_reservation(&token, &id).await }
                    })
                    .await
            }
        }
    }

    /// Resolve the holding site id and the parent pool from the live
    /// inventory, then build the reservation body.
    async fn reservation_request(
        &self,
        res: &PoolReservation,
    ) -> Result<(String, ReservationCreateRequest), CoreError> {
        let site = self
            .inventory
            .site_by_path(&res.site)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "site".into(),
                identifier: res.site.to_string(),
            })?;
        let pool = self
            .inventory
            .pool_by_name(&res.pool)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "global pool".into(),
                identifier: res.pool.clone(),
            })?;

        let ObservedDetail::Pool {
            cidr: Some(pool_cidr),
            dhcp_servers,
            dns_servers,
            ..
        } = &pool.detail
        else {
            return Err(CoreError::NotFound {
                entity_type: "global pool address space".into(),
                identifier: res.pool.clone(),
            });
        };

        let prefix = res.prefix()?;
        let request = ReservationCreateRequest {
            name: res.name.clone(),
            pool_type: POOL_TYPE.into(),
            ipv4_global_pool: pool_cidr.to_string(),
            ipv4_prefix: true,
            ipv4_prefix_length: prefix.prefix_len(),
            ipv4_subnet: prefix.network().to_string(),
            ipv4_gateway: res.gateway()?.to_string(),
            ipv4_dhcp_servers: res
                .dhcp_servers
                .as_deref()
                .map_or_else(|| dhcp_servers.clone(), addrs),
            ipv4_dns_servers: res
                .dns_servers
                .as_deref()
                .map_or_else(|| dns_servers.clone(), addrs),
        };
        Ok((site.id, request))
    }
}

// ── Request bodies ───────────────────────────────────────────────────

fn site_request(node: &SiteNode) -> SiteCreateRequest {
    let name = node.name.clone();
    let parent_name = node.parent.to_string();
    let spec = match &node.attrs {
        SiteAttrs::Area => SiteSpec::Area(AreaSpec { name, parent_name }),
        SiteAttrs::Building(b) => SiteSpec::Building(BuildingSpec {
            name,
            parent_name,
            latitude: b.latitude,
            longitude: b.longitude,
            address: b.address.clone(),
            country: b.country.clone(),
        }),
        SiteAttrs::Floor(f) => SiteSpec::Floor(FloorSpec {
            name,
            parent_name,
            rf_model: f.rf_model.clone(),
            width: f.width,
            length: f.length,
            height: f.height,
            floor_number: f.floor_number,
        }),
    };
    SiteCreateRequest::new(spec)
}

fn pool_request(pool: &GlobalPool) -> GlobalPoolCreateRequest {
    GlobalPoolCreateRequest {
        name: pool.name.clone(),
        pool_type: POOL_TYPE.into(),
        address_space: AddressSpace {
            subnet: pool.cidr.network().to_string(),
            prefix_length: pool.cidr.prefix_len(),
            gateway_ip_address: pool.gateway.map(|gw| gw.to_string()),
            dhcp_servers: addrs(&pool.dhcp_servers),
            dns_servers: addrs(&pool.dns_servers),
        },
    }
}

fn addrs(list: &[Ipv4Addr]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}
