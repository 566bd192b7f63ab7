// Site hierarchy endpoints
//
// Areas, buildings, and floors share one resource; the create body is
// tagged with the site type.

use tracing::debug;

use crate::auth::AuthToken;
use crate::client::CatalystClient;
use crate::error::Error;
use crate::models::{Envelope, Site, SiteCreateRequest, TaskHandle};

const SITE_PATH: &str = "dna/intent/api/v1/site";

impl CatalystClient {
    /// List every site in the hierarchy, `Global` included.
    ///
    /// `GET /dna/intent/api/v1/site`
    pub async fn list_sites(&self, token: &AuthToken) -> Result<Vec<Site>, Error> {
        let envelope: Envelope<Vec<Site>> = self.get(token, SITE_PATH).await?;
        Ok(envelope.response)
    }

    /// Create an area, building, or floor.
    ///
    /// `POST /dna/intent/api/v1/site`
    pub async fn create_site(
        &self,
        token: &AuthToken,
        request: &SiteCreateRequest,
    ) -> Result<TaskHandle, Error> {
        debug!(site_type = request.site_type, "creating site");
        self.post(token, SITE_PATH, request).await
    }

    /// Delete a site by id.
    ///
    /// `DELETE /dna/intent/api/v1/site/{id}`
    pub async fn delete_site(&self, token: &AuthToken, site_id: &str) -> Result<TaskHandle, Error> {
        debug!(site_id, "deleting site");
        self.delete(token, &format!("{SITE_PATH}/{site_id}")).await
    }
}
