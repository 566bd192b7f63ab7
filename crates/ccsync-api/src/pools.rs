// Global IP pool endpoints

use tracing::debug;

use crate::auth::AuthToken;
use crate::client::CatalystClient;
use crate::error::Error;
use crate::models::{Envelope, GlobalPool, GlobalPoolCreateRequest, TaskHandle};

const POOL_PATH: &str = "dna/intent/api/v1/global-pool";

impl CatalystClient {
    /// List all global pools.
    ///
    /// `GET /dna/intent/api/v1/global-pool`
    pub async fn list_global_pools(&self, token: &AuthToken) -> Result<Vec<GlobalPool>, Error> {
        let envelope: Envelope<Vec<GlobalPool>> = self.get(token, POOL_PATH).await?;
        Ok(envelope.response)
    }

    /// `POST /dna/intent/api/v1/global-pool`
    pub async fn create_global_pool(
        &self,
        token: &AuthToken,
        request: &GlobalPoolCreateRequest,
    ) -> Result<TaskHandle, Error> {
        debug!(name = %request.name, "creating global pool");
        self.post(token, POOL_PATH, request).await
    }

    /// `DELETE /dna/intent/api/v1/global-pool/{id}`
    pub async fn delete_global_pool(
        &self,
        token: &AuthToken,
        pool_id: &str,
    ) -> Result<TaskHandle, Error> {
        debug!(pool_id, "deleting global pool");
        self.delete(token, &format!("{POOL_PATH}/{pool_id}")).await
    }
}
