// Execution status endpoint
//
// Mutating calls return `executionStatusUrl`; when it is missing the
// status is looked up by execution id on the management endpoint.

use tracing::trace;

use crate::auth::AuthToken;
use crate::client::CatalystClient;
use crate::error::Error;
use crate::models::{ExecutionStatus, TaskHandle};

const EXECUTION_STATUS_PATH: &str = "dna/intent/api/v1/dnacaap/management/execution-status";

impl CatalystClient {
    /// Fetch the current status of an accepted mutation.
    ///
    /// Returns `Ok(None)` for a synchronous handle (nothing to poll).
    pub async fn execution_status(
        &self,
        token: &AuthToken,
        handle: &TaskHandle,
    ) -> Result<Option<ExecutionStatus>, Error> {
        let path = match (&handle.execution_status_url, &handle.execution_id) {
            (Some(url), _) => url.clone(),
            (None, Some(id)) => format!("{EXECUTION_STATUS_PATH}/{id}"),
            (None, None) => return Ok(None),
        };
        trace!(path, "polling execution status");
        self.get(token, &path).await.map(Some)
    }
}
