// Wire types for the Catalyst Center intent API.
//
// List endpoints wrap their payload in `{"response": [...]}`; mutating
// endpoints answer with an execution handle that is polled separately.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Envelopes ───────────────────────────────────────────────────────

/// The `{"response": ...}` wrapper used by every intent read endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(rename = "Token")]
    pub token: String,
}

// ── Sites ───────────────────────────────────────────────────────────

/// A site hierarchy record as returned by `GET /dna/intent/api/v1/site`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub site_name_hierarchy: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub additional_info: Vec<AdditionalInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdditionalInfo {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl Site {
    /// The site type advertised in `additionalInfo[*].attributes.type`.
    pub fn site_type(&self) -> Option<&str> {
        self.additional_info
            .iter()
            .find_map(|info| info.attributes.get("type").and_then(Value::as_str))
    }

    /// Full hierarchy path, falling back to the bare name.
    pub fn hierarchy(&self) -> &str {
        self.site_name_hierarchy.as_deref().unwrap_or(&self.name)
    }
}

/// Body for `POST /dna/intent/api/v1/site`.
///
/// Serializes as `{"type": "building", "site": {"building": {...}}}`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteCreateRequest {
    #[serde(rename = "type")]
    pub site_type: &'static str,
    pub site: SiteSpec,
}

impl SiteCreateRequest {
    pub fn new(site: SiteSpec) -> Self {
        let site_type = match &site {
            SiteSpec::Area(_) => "area",
            SiteSpec::Building(_) => "building",
            SiteSpec::Floor(_) => "floor",
        };
        Self { site_type, site }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteSpec {
    Area(AreaSpec),
    Building(BuildingSpec),
    Floor(FloorSpec),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSpec {
    pub name: String,
    pub parent_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSpec {
    pub name: String,
    pub parent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorSpec {
    pub name: String,
    pub parent_name: String,
    pub rf_model: String,
    pub width: f64,
    pub length: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_number: Option<i32>,
}

// ── Global pools ────────────────────────────────────────────────────

/// A global IP pool as returned by `GET /dna/intent/api/v1/global-pool`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPool {
    pub id: String,
    pub ip_pool_name: String,
    pub ip_pool_cidr: String,
    #[serde(default)]
    pub gateways: Vec<String>,
    #[serde(default)]
    pub dhcp_server_ips: Vec<String>,
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub used_ip_address_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_ip_address_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_assignable_ip_address_count: Option<u64>,
}

/// Body for `POST /dna/intent/api/v1/global-pool`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPoolCreateRequest {
    pub name: String,
    pub pool_type: String,
    pub address_space: AddressSpace,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    pub subnet: String,
    pub prefix_length: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dhcp_servers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
}

// ── Reservations ────────────────────────────────────────────────────

/// A site-scoped reservation as returned by `GET /reserve-ip-subpool?siteId=`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub group_name: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub ip_pools: Vec<ReservedPool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedPool {
    #[serde(default)]
    pub id: Option<String>,
    pub ip_pool_cidr: String,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub ipv6: Option<bool>,
    #[serde(default)]
    pub gateways: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub used_ip_address_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_ip_address_count: Option<u64>,
}

impl Reservation {
    /// The IPv4 sub-pool carried by this reservation, if any.
    pub fn ipv4_pool(&self) -> Option<&ReservedPool> {
        self.ip_pools.iter().find(|p| p.ipv6 != Some(true))
    }
}

/// Body for `POST /dna/intent/api/v1/reserve-ip-subpool/{siteId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub pool_type: String,
    pub ipv4_global_pool: String,
    pub ipv4_prefix: bool,
    pub ipv4_prefix_length: u8,
    pub ipv4_subnet: String,
    #[serde(rename = "ipv4GateWay")]
    pub ipv4_gateway: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv4_dhcp_servers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv4_dns_servers: Vec<String>,
}

// ── Execution status ────────────────────────────────────────────────

/// Response to any accepted mutating call.
///
/// A handle with neither id nor URL means the controller finished the
/// work synchronously.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub execution_status_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskHandle {
    pub fn is_synchronous(&self) -> bool {
        self.execution_id.is_none() && self.execution_status_url.is_none()
    }

    /// Best identifier for logs and reports.
    pub fn label(&self) -> Option<&str> {
        self.execution_id
            .as_deref()
            .or(self.execution_status_url.as_deref())
    }
}

/// `GET .../execution-status/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bapi_error: Option<String>,
    #[serde(default)]
    pub bapi_sync_response_json: Option<Value>,
    #[serde(default)]
    pub is_error: Option<bool>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub end_time: Option<Value>,
    #[serde(default)]
    pub end_time_epoch: Option<Value>,
    #[serde(default)]
    pub bapi_name: Option<String>,
}

/// Interpreted state of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPhase {
    InProgress,
    Succeeded,
    Failed(String),
}

impl ExecutionStatus {
    pub fn phase(&self) -> ExecutionPhase {
        let status = self.status.as_deref().map(str::to_ascii_uppercase);
        match status.as_deref() {
            Some("SUCCESS") => self
                .sync_failure()
                .map_or(ExecutionPhase::Succeeded, ExecutionPhase::Failed),
            Some("FAILURE" | "FAILED") => ExecutionPhase::Failed(self.failure_detail()),
            _ if self.is_error == Some(true) => ExecutionPhase::Failed(self.failure_detail()),
            _ if self.has_ended() => ExecutionPhase::Succeeded,
            _ => ExecutionPhase::InProgress,
        }
    }

    /// Older releases report completion only through an end timestamp.
    fn has_ended(&self) -> bool {
        [&self.end_time, &self.end_time_epoch]
            .into_iter()
            .flatten()
            .any(|v| match v {
                Value::Null | Value::Bool(false) => false,
                Value::String(s) => !s.is_empty(),
                Value::Number(n) => n.as_u64() != Some(0),
                _ => true,
            })
    }

    /// A "successful" execution can still carry a business-level failure.
    fn sync_failure(&self) -> Option<String> {
        if let Some(err) = self.bapi_error.as_deref().filter(|e| !e.is_empty()) {
            return Some(err.to_owned());
        }

        let sync = match self.bapi_sync_response_json.as_ref()? {
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
            other => other.clone(),
        };
        let failed = match sync.get("status") {
            Some(Value::Bool(ok)) => !ok,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("false"),
            _ => false,
        };
        failed.then(|| {
            sync.get("message")
                .or_else(|| sync.get("description"))
                .and_then(Value::as_str)
                .unwrap_or("operation reported failure")
                .to_owned()
        })
    }

    fn failure_detail(&self) -> String {
        self.bapi_error
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| self.failure_reason.clone())
            .unwrap_or_else(|| "task failed".into())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Address counts arrive as numbers on most releases and as strings on some.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
