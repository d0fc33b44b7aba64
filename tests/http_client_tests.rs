//! Integration tests for the request executor.
//!
//! These tests run the client against a local mock server with a virtual
//! clock, covering token refresh, 429 backoff, timeouts and error mapping.

use std::sync::Arc;
use std::time::Duration;

use loyverse_api::auth::{InMemoryCredentialStore, StoredIntegration};
use loyverse_api::clients::{HttpMethod, HttpRequest};
use loyverse_api::{
    BaseUrl, ClientId, ClientSecret, Credential, LoyverseConfig, LoyverseError, ManualClock,
    RestClient, TenantId,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration pointing both endpoints at `server`.
fn create_config(server: &MockServer) -> loyverse_api::LoyverseConfigBuilder {
    LoyverseConfig::builder()
        .client_id(ClientId::new("test-client").unwrap())
        .client_secret(ClientSecret::new("test-secret").unwrap())
        .api_base_url(BaseUrl::new(format!("{}/v1.0", server.uri())).unwrap())
        .token_url(BaseUrl::new(format!("{}/oauth/token", server.uri())).unwrap())
}

struct Fixture {
    client: RestClient,
    clock: Arc<ManualClock>,
    store: Arc<InMemoryCredentialStore>,
    tenant: TenantId,
}

/// Creates a client for tenant `org-1` holding `old-access` / `old-refresh`.
fn create_fixture(config: LoyverseConfig) -> Fixture {
    let tenant = TenantId::new("org-1").unwrap();
    let credential = Credential::new("old-access", "old-refresh");
    let store = Arc::new(InMemoryCredentialStore::new());
    store.insert(StoredIntegration::connected(tenant.clone(), &credential));
    let clock = Arc::new(ManualClock::new());

    let client = RestClient::with_clock(
        Arc::new(config),
        tenant.clone(),
        credential,
        store.clone(),
        clock.clone(),
    )
    .unwrap();

    Fixture {
        client,
        clock,
        store,
        tenant,
    }
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_get_sends_bearer_token_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/categories"))
        .and(header("authorization", "Bearer old-access"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"categories": []})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture.client.get("categories", None).await.unwrap();

    assert_eq!(body, json!({"categories": []}));
    assert!(fixture.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_post_serializes_body_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/items"))
        .and(body_json(json!({"item_name": "Latte"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "item-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture
        .client
        .post("items", &json!({"item_name": "Latte"}))
        .await
        .unwrap();

    assert_eq!(body["id"], "item-1");
}

#[tokio::test]
async fn test_empty_success_body_becomes_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1.0/items/item-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture.client.delete("/items/item-1").await.unwrap();

    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_invalid_json_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items", None).await;

    assert!(matches!(result, Err(LoyverseError::Decode(_))));
}

#[tokio::test]
async fn test_request_passes_query_and_extra_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .and(query_param("show_deleted", "true"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let request = HttpRequest::builder(HttpMethod::Get, "items")
        .query_param("show_deleted", "true")
        .header("X-Trace", "abc")
        .build()
        .unwrap();

    let body = fixture.client.request(request).await.unwrap();
    assert_eq!(body, json!({"items": []}));
}

// ============================================================================
// 401 handling
// ============================================================================

#[tokio::test]
async fn test_401_refreshes_once_and_retries_with_new_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/stores"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"code": "UNAUTHORIZED", "details": "Token expired"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/stores"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stores": [{"id": "s1"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture.client.get("stores", None).await.unwrap();

    assert_eq!(body["stores"][0]["id"], "s1");
    assert_eq!(fixture.client.credential().await.access_token, "new-access");
    assert!(fixture.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_second_401_after_refresh_is_authentication_error() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items", None).await;

    match result {
        Err(LoyverseError::Authentication(error)) => {
            assert_eq!(error.description, "authentication failed after token refresh");
        }
        other => panic!("Expected Authentication error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let (first, second) = tokio::join!(
        fixture.client.get("items", None),
        fixture.client.get("stores", None)
    );

    assert_eq!(first.unwrap(), json!({"items": []}));
    assert_eq!(second.unwrap(), json!({"items": []}));

    let stored = fixture.store.get(&fixture.tenant).unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("new-access"));
    assert_eq!(stored.refresh_token.as_deref(), Some("new-refresh"));
}

#[tokio::test]
async fn test_failed_refresh_is_authentication_error_without_resend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items", None).await;

    match result {
        Err(LoyverseError::Authentication(error)) => {
            assert_eq!(error.code.as_deref(), Some("invalid_grant"));
        }
        other => panic!("Expected Authentication error, got {other:?}"),
    }

    let stored = fixture.store.get(&fixture.tenant).unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("old-access"));
}

// ============================================================================
// 429 handling
// ============================================================================

#[tokio::test]
async fn test_always_429_exhausts_retries_with_exponential_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items", None).await;

    match result {
        Err(LoyverseError::MaxRetries(error)) => {
            assert_eq!(error.retries, 3);
            assert_eq!(error.last_status, Some(429));
            assert_eq!(error.total_delay, Duration::from_secs(7));
        }
        other => panic!("Expected MaxRetries error, got {other:?}"),
    }

    let sleeps = fixture.clock.sleeps();
    assert_eq!(
        sleeps,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );

    // Cumulative backoff never decreases.
    let cumulative: Vec<Duration> = sleeps
        .iter()
        .scan(Duration::ZERO, |total, sleep| {
            *total += *sleep;
            Some(*total)
        })
        .collect();
    assert!(cumulative.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_max_retries_zero_fails_on_first_429() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).max_retries(0).build().unwrap());
    let result = fixture.client.get("items", None).await;

    assert!(matches!(
        result,
        Err(LoyverseError::MaxRetries(ref error)) if error.retries == 0
    ));
    assert!(fixture.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_429_honors_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": ["a"]})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture.client.get("items", None).await.unwrap();

    assert_eq!(body["items"], json!(["a"]));
    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_oversized_retry_after_is_capped_at_rate_limit_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1e10"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_config(&server)
        .rate_limit_window(Duration::from_secs(30))
        .build()
        .unwrap();
    let fixture = create_fixture(config);
    fixture.client.get("items", None).await.unwrap();

    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_secs(30)]);
}

#[tokio::test]
async fn test_429_then_401_uses_both_budgets() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let body = fixture.client.get("items", None).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_secs(1)]);
}

// ============================================================================
// Timeouts and other errors
// ============================================================================

#[tokio::test]
async fn test_timeout_counts_against_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = create_config(&server)
        .request_timeout(Duration::from_millis(50))
        .max_retries(1)
        .base_delay(Duration::from_millis(100))
        .build()
        .unwrap();
    let fixture = create_fixture(config);
    let result = fixture.client.get("items", None).await;

    match result {
        Err(LoyverseError::MaxRetries(error)) => {
            assert_eq!(error.retries, 1);
            assert_eq!(error.last_status, None);
        }
        other => panic!("Expected MaxRetries error, got {other:?}"),
    }
    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_millis(100)]);
}

#[tokio::test]
async fn test_other_status_is_api_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/items/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-77")
                .set_body_json(json!({
                    "errors": [{"code": "NOT_FOUND", "details": "Item not found"}]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items/missing", None).await;

    match result {
        Err(LoyverseError::Api(error)) => {
            assert_eq!(error.status, 404);
            assert_eq!(error.code.as_deref(), Some("NOT_FOUND"));
            assert_eq!(error.description, "Item not found");
            assert_eq!(error.request_id.as_deref(), Some("req-77"));
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
    assert!(fixture.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_server_error_with_text_body_keeps_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).build().unwrap());
    let result = fixture.client.get("items", None).await;

    match result {
        Err(LoyverseError::Api(error)) => {
            assert_eq!(error.status, 502);
            assert_eq!(error.description, "Bad Gateway");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_requests_beyond_quota_wait_for_next_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).requests_per_minute(2).build().unwrap());

    fixture.client.get("items", None).await.unwrap();
    fixture.client.get("items", None).await.unwrap();
    assert!(fixture.clock.sleeps().is_empty());
    assert_eq!(fixture.client.http_client().rate_limit_remaining().await, 0);

    fixture.client.get("items", None).await.unwrap();
    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_secs(60)]);
    assert_eq!(fixture.client.http_client().rate_limit_remaining().await, 1);
}

#[tokio::test]
async fn test_retries_also_pass_through_rate_limiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let fixture = create_fixture(create_config(&server).requests_per_minute(1).build().unwrap());
    fixture.client.get("items", None).await.unwrap();

    // Retry-After of zero, then the full window for the second send.
    assert_eq!(
        fixture.clock.sleeps(),
        vec![Duration::ZERO, Duration::from_secs(60)]
    );
}
