// Site-scoped IP pool reservation endpoints
//
// Listing and creation are scoped to a site id; deletion addresses the
// reservation id directly.

use tracing::debug;

use crate::auth::AuthToken;
use crate::client::CatalystClient;
use crate::error::Error;
use crate::models::{Envelope, Reservation, ReservationCreateRequest, TaskHandle};

const RESERVATION_PATH: &str = "dna/intent/api/v1/reserve-ip-subpool";

impl CatalystClient {
    /// List the reservations held by one site.
    ///
    /// `GET /dna/intent/api/v1/reserve-ip-subpool?siteId={id}`
    pub async fn list_reservations(
        &self,
        token: &AuthToken,
        site_id: &str,
    ) -> Result<Vec<Reservation>, Error> {
        let envelope: Envelope<Option<Vec<Reservation>>> = self
            .get_with_params(token, RESERVATION_PATH, &[("siteId", site_id)])
            .await?;
        Ok(envelope.response.unwrap_or_default())
    }

    /// `POST /dna/intent/api/v1/reserve-ip-subpool/{siteId}`
    pub async fn create_reservation(
        &self,
        token: &AuthToken,
        site_id: &str,
        request: &ReservationCreateRequest,
    ) -> Result<TaskHandle, Error> {
        debug!(site_id, name = %request.name, "reserving ip subpool");
        self.post(token, &format!("{RESERVATION_PATH}/{site_id}"), request)
            .await
    }

    /// `DELETE /dna/intent/api/v1/reserve-ip-subpool/{id}`
    pub async fn delete_reservation(
        &self,
        token: &AuthToken,
        reservation_id: &str,
    ) -> Result<TaskHandle, Error> {
        debug!(reservation_id, "releasing ip subpool");
        self.delete(token, &format!("{RESERVATION_PATH}/{reservation_id}"))
            .await
    }
}
