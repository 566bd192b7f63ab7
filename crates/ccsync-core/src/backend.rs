// ── Controller backend seam ──
//
// The reconciliation engine talks to the controller only through this
// trait. `CatalystClient` is the production implementation; tests plug
// in an in-memory controller.

use std::future::Future;

use ccsync_api::{
    AuthToken, CatalystClient, Credentials, Error as ApiError, ExecutionStatus, GlobalPool,
    GlobalPoolCreateRequest, Reservation, ReservationCreateRequest, Site, SiteCreateRequest,
    TaskHandle,
};

/// The controller REST surface used by the reconciler.
///
/// Every call except `login` takes the bearer token explicitly; token
/// caching and refresh belong to the [`SessionManager`](crate::session::SessionManager).
pub trait ControllerApi: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthToken, ApiError>> + Send;

    // ── Reads ────────────────────────────────────────────────────────

    fn list_sites(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Vec<Site>, ApiError>> + Send;

    fn list_global_pools(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<Vec<GlobalPool>, ApiError>> + Send;

    fn list_reservations(
        &self,
        token: &AuthToken,
        site_id: &str,
    ) -> impl Future<Output = Result<Vec<Reservation>, ApiError>> + Send;

    fn execution_status(
        &self,
        token: &AuthToken,
        handle: &TaskHandle,
    ) -> impl Future<Output = Result<Option<ExecutionStatus>, ApiError>> + Send;

    // ── Mutations ────────────────────────────────────────────────────

    fn create_site(
        &self,
        token: &AuthToken,
        request: &SiteCreateRequest,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;

    fn delete_site(
        &self,
        token: &AuthToken,
        site_id: &str,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;

    fn create_global_pool(
        &self,
        token: &AuthToken,
        request: &GlobalPoolCreateRequest,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;

    fn delete_global_pool(
        &self,
        token: &AuthToken,
        pool_id: &str,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;

    fn create_reservation(
        &self,
        token: &AuthToken,
        site_id: &str,
        request: &ReservationCreateRequest,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;

    fn delete_reservation(
        &self,
        token: &AuthToken,
        reservation_id: &str,
    ) -> impl Future<Output = Result<TaskHandle, ApiError>> + Send;
}

impl ControllerApi for CatalystClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        CatalystClient::login(self, credentials).await
    }

    async fn list_sites(&self, token: &AuthToken) -> Result<Vec<Site>, ApiError> {
        CatalystClient::list_sites(self, token).await
    }

    async fn list_global_pools(&self, token: &AuthToken) -> Result<Vec<GlobalPool>, ApiError> {
        CatalystClient::list_global_pools(self, token).await
    }

    async fn list_reservations(
        &self,
        token: &AuthToken,
        site_id: &str,
    ) -> Result<Vec<Reservation>, ApiError> {
        CatalystClient::list_reservations(self, token, site_id).await
    }

    async fn execution_status(
        &self,
        token: &AuthToken,
        handle: &TaskHandle,
    ) -> Result<Option<ExecutionStatus>, ApiError> {
        CatalystClient::execution_status(self, token, handle).await
    }

    async fn create_site(
        &self,
        token: &AuthToken,
        request: &SiteCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        CatalystClient::create_site(self, token, request).await
    }

    async fn delete_site(&self, token: &AuthToken, site_id: &str) -> Result<TaskHandle, ApiError> {
        CatalystClient::delete_site(self, token, site_id).await
    }

    async fn create_global_pool(
        &self,
        token: &AuthToken,
        request: &GlobalPoolCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        CatalystClient::create_global_pool(self, token, request).await
    }

    async fn delete_global_pool(
        &self,
        token: &AuthToken,
        pool_id: &str,
    ) -> Result<TaskHandle, ApiError> {
        CatalystClient::delete_global_pool(self, token, pool_id).await
    }

    async fn create_reservation(
        &self,
        token: &AuthToken,
        site_id: &str,
        request: &ReservationCreateRequest,
    ) -> Result<TaskHandle, ApiError> {
        CatalystClient::create_reservation(self, token, site_id, request).await
    }

    async fn delete_reservation(
        &self,
        token: &AuthToken,
        reservation_id: &str,
    ) -> Result<TaskHandle, ApiError> {
        CatalystClient::delete_reservation(self, token, reservation_id).await
    }
}
