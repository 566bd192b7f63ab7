// ── Controller facade ──
//
// Single entry point for consumers. Wires one session manager and one
// inventory reader to a controller backend and runs create/delete plans
// through a fresh reconciler per run.

use std::sync::Arc;

use ccsync_api::transport::{TlsMode, TransportConfig};
use ccsync_api::{CatalystClient, Credentials};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::backend::ControllerApi;
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::graph::{Operation, Plan, ResourceGraph};
use crate::inventory::{InventoryReader, InventorySnapshot};
use crate::model::DesiredState;
use crate::reconciler::Reconciler;
use crate::report::RunReport;
use crate::session::SessionManager;
use crate::tracker::TaskTracker;

/// Reconciles desired state against one controller.
///
/// Cheaply cloneable via `Arc<ControllerInner>`; clones share the session,
/// the inventory cache, and the cancellation token.
pub struct Controller<A = CatalystClient> {
    inner: Arc<ControllerInner<A>>,
}

impl<A> Clone for Controller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<A> {
    config: ControllerConfig,
    session: Arc<SessionManager<A>>,
    inventory: Arc<InventoryReader<A>>,
    cancel: CancellationToken,
}

impl Controller<CatalystClient> {
    /// Build a controller backed by the Catalyst Center HTTP client.
    /// Does not contact the controller.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let client = CatalystClient::new(config.url.as_str(), &transport)?;
        Ok(Self::with_api(Arc::new(client), config))
    }
}

impl<A: ControllerApi> Controller<A> {
    /// Build a controller over any [`ControllerApi`] implementation.
    pub fn with_api(api: Arc<A>, config: ControllerConfig) -> Self {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let session = Arc::new(SessionManager::new(api, credentials, config.session));
        let inventory = Arc::new(InventoryReader::new(Arc::clone(&session)));
        Self {
            inner: Arc::new(ControllerInner {
                config,
                session,
                inventory,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionManager<A> {
        &self.inner.session
    }

    pub fn inventory(&self) -> &InventoryReader<A> {
        &self.inner.inventory
    }

    /// Token observed by every poll loop; cancelling it aborts the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Compute the ordered plan for `operation`. Performs no I/O.
    pub fn plan(&self, desired: &DesiredState, operation: Operation) -> Result<Plan, CoreError> {
        ResourceGraph::build(desired)?.plan(operation)
    }

    /// Create everything in `desired` that the controller does not have.
    ///
    /// Returns `Err` only for input rejected before any network call;
    /// failures during the run are reported in the [`RunReport`].
    pub async fn create(&self, desired: &DesiredState) -> Result<RunReport, CoreError> {
        let plan = self.plan(desired, Operation::Create)?;
        Ok(self.execute(&plan).await)
    }

    /// Delete everything in `desired`, dependents first.
    ///
    /// Refuses to run unless `force` is set.
    pub async fn delete(&self, desired: &DesiredState, force: bool) -> Result<RunReport, CoreError> {
        if !force {
            return Err(CoreError::ConfirmationRequired {
                operation: "delete".into(),
            });
        }
        let plan = self.plan(desired, Operation::Delete)?;
        Ok(self.execute(&plan).await)
    }

    /// Current controller inventory, always read fresh.
    pub async fn status(&self) -> Result<InventorySnapshot, CoreError> {
        self.inner.inventory.snapshot().await
    }

    async fn execute(&self, plan: &Plan) -> RunReport {
        info!(
            controller = %self.inner.config.url,
            operation = %plan.operation(),
            "reconciling"
        );
        let tracker = TaskTracker::new(
            Arc::clone(&self.inner.session),
            self.inner.config.tasks,
            self.inner.cancel.clone(),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&self.inner.session),
            Arc::clone(&self.inner.inventory),
            tracker,
            self.inner.cancel.clone(),
        );
        reconciler.run(plan).await
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
