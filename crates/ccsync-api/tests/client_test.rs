#![allow(clippy::unwrap_used)]
// Integration tests for `CatalystClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ccsync_api::{
    AreaSpec, AuthToken, CatalystClient, Credentials, Error, ExecutionPhase,
    GlobalPoolCreateRequest, AddressSpace, ReservationCreateRequest, SiteCreateRequest, SiteSpec,
    TaskHandle,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CatalystClient) {
    let server = MockServer::start().await;
    let client = CatalystClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn token() -> AuthToken {
    AuthToken::new("tok-123")
}

fn task_accepted(id: &str) -> serde_json::Value {
    json!({
        "executionId": id,
        "executionStatusUrl": format!("/dna/platform/management/business-api/v1/execution-status/{id}"),
        "message": "The request has been accepted for execution"
    })
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dna/system/api/v1/auth/token"))
        .and(basic_auth("admin", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Token": "abc" })))
        .expect(1)
        .mount(&server)
        .await;

    let creds = Credentials::new("admin", "s3cret".to_string().into());
    client.login(&creds).await.unwrap();
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dna/system/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let creds = Credentials::new("admin", "wrong".to_string().into());
    let result = client.login(&creds).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_expired_token_maps_to_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/intent/api/v1/site"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_sites(&token()).await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
}

// ── Sites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sites_sends_token_and_decodes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/intent/api/v1/site"))
        .and(header("X-Auth-Token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [
                { "id": "g", "name": "Global", "siteNameHierarchy": "Global" },
                {
                    "id": "b1",
                    "name": "HQ",
                    "siteNameHierarchy": "Global/US/HQ",
                    "parentId": "a1",
                    "additionalInfo": [
                        { "namespace": "Location", "attributes": { "type": "building", "country": "United States" } }
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let sites = client.list_sites(&token()).await.unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[1].hierarchy(), "Global/US/HQ");
    assert_eq!(sites[1].site_type(), Some("building"));
    assert_eq!(sites[0].site_type(), None);
}

#[tokio::test]
async fn test_create_site_posts_tagged_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dna/intent/api/v1/site"))
        .and(body_json(json!({
            "type": "area",
            "site": { "area": { "name": "US", "parentName": "Global" } }
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(task_accepted("e-1")))
        .expect(1)
        .mount(&server)
        .await;

    let req = SiteCreateRequest::new(SiteSpec::Area(AreaSpec {
        name: "US".into(),
        parent_name: "Global".into(),
    }));
    let handle = client.create_site(&token(), &req).await.unwrap();
    assert_eq!(handle.execution_id.as_deref(), Some("e-1"));
}

#[tokio::test]
async fn test_validation_rejection_keeps_controller_detail() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dna/intent/api/v1/global-pool"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "response": {
                "errorCode": "NCIP10283",
                "message": "Invalid request",
                "detail": "Subnet 10.201.0.0/16 overlaps with existing pool US_TECH"
            },
            "version": "1.0"
        })))
        .mount(&server)
        .await;

    let req = GlobalPoolCreateRequest {
        name: "US_CORP".into(),
        pool_type: "Generic".into(),
        address_space: AddressSpace {
            subnet: "10.201.0.0".into(),
            prefix_length: 16,
            gateway_ip_address: None,
            dhcp_servers: vec![],
            dns_servers: vec![],
        },
    };
    let err = client.create_global_pool(&token(), &req).await.unwrap_err();

    match err {
        Error::Api {
            status,
            message,
            code,
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Subnet 10.201.0.0/16 overlaps with existing pool US_TECH");
            assert_eq!(code.as_deref(), Some("NCIP10283"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_errors_are_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/intent/api/v1/global-pool"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.list_global_pools(&token()).await.unwrap_err();
    assert!(err.is_transient(), "got: {err:?}");
    assert!(!err.is_unsent());
}

// ── Reservations ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_reservations_is_site_scoped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/intent/api/v1/reserve-ip-subpool"))
        .and(query_param("siteId", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [{
                "id": "r1",
                "groupName": "HQ_CORP",
                "ipPools": [{
                    "ipPoolCidr": "10.201.1.0/24",
                    "parentUuid": "p1",
                    "ipv6": false,
                    "usedIpAddressCount": 3,
                    "totalIpAddressCount": 256
                }]
            }]
        })))
        .mount(&server)
        .await;

    let list = client.list_reservations(&token(), "b1").await.unwrap();
    assert_eq!(list.len(), 1);
    let pool = list[0].ipv4_pool().unwrap();
    assert_eq!(pool.ip_pool_cidr, "10.201.1.0/24");
    assert_eq!(pool.parent_uuid.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_create_reservation_payload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/dna/intent/api/v1/reserve-ip-subpool/b1"))
        .and(body_json(json!({
            "name": "HQ_CORP",
            "type": "Generic",
            "ipv4GlobalPool": "10.201.0.0/16",
            "ipv4Prefix": true,
            "ipv4PrefixLength": 24,
            "ipv4Subnet": "10.201.1.0",
            "ipv4GateWay": "10.201.1.1"
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(task_accepted("e-9")))
        .expect(1)
        .mount(&server)
        .await;

    let req = ReservationCreateRequest {
        name: "HQ_CORP".into(),
        pool_type: "Generic".into(),
        ipv4_global_pool: "10.201.0.0/16".into(),
        ipv4_prefix: true,
        ipv4_prefix_length: 24,
        ipv4_subnet: "10.201.1.0".into(),
        ipv4_gateway: "10.201.1.1".into(),
        ipv4_dhcp_servers: vec![],
        ipv4_dns_servers: vec![],
    };
    client.create_reservation(&token(), "b1", &req).await.unwrap();
}

// ── Execution status ────────────────────────────────────────────────

#[tokio::test]
async fn test_execution_status_follows_status_url() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/platform/management/business-api/v1/execution-status/e-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bapiExecutionId": "e-1",
            "status": "SUCCESS"
        })))
        .mount(&server)
        .await;

    let handle: TaskHandle = serde_json::from_value(task_accepted("e-1")).unwrap();
    let status = client.execution_status(&token(), &handle).await.unwrap().unwrap();
    assert_eq!(status.phase(), ExecutionPhase::Succeeded);
}

#[tokio::test]
async fn test_execution_status_falls_back_to_execution_id() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/dna/intent/api/v1/dnacaap/management/execution-status/e-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILURE",
            "bapiError": "Floor name already exists"
        })))
        .mount(&server)
        .await;

    let handle = TaskHandle {
        execution_id: Some("e-2".into()),
        ..TaskHandle::default()
    };
    let status = client.execution_status(&token(), &handle).await.unwrap().unwrap();
    assert_eq!(
        status.phase(),
        ExecutionPhase::Failed("Floor name already exists".into())
    );
}

#[tokio::test]
async fn test_synchronous_handle_needs_no_poll() {
    let (_server, client) = setup().await;
    let status = client
        .execution_status(&token(), &TaskHandle::default())
        .await
        .unwrap();
    assert!(status.is_none());
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/dna/intent/api/v1/global-pool/p1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let handle = client.delete_global_pool(&token(), "p1").await.unwrap();
    assert!(handle.is_synchronous());
}
