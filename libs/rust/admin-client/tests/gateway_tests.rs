//! HTTP-level tests of the request gateway against a mock server.

use admin_client::api::auth;
use admin_client::{
    ApiClient, ClientConfig, ClientError, Notifier, RequestDescriptor, RetryConfig, SessionStore,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures;
use test_utils::mocks::{MockSessionStore, RecordingNotifier};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: ApiClient,
    session: Arc<MockSessionStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(session: MockSessionStore, config: ClientConfig) -> Harness {
    let session = Arc::new(session);
    let notifier = Arc::new(RecordingNotifier::new());
    let client = ApiClient::builder(config)
        .session_store(Arc::clone(&session) as Arc<dyn SessionStore>)
        .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
        .build()
        .unwrap();
    Harness {
        client,
        session,
        notifier,
    }
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(&server.uri())
        .unwrap()
        .with_logout_delay(Duration::from_millis(10))
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

#[tokio::test]
async fn test_attaches_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/info"))
        .and(header("Authorization", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(fixtures::user_info())))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let info = assert_ok!(auth::user_info(&h.client).await);
    assert_eq!(info.user_name, "Super");
    assert_eq!(info.buttons.len(), 2);
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_concurrent_unauthorized_calls_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .and(header("Authorization", "T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(json!({ "total": 3 }))))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(fixtures::unauthorized()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::token_pair("T2", "R2"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let (a, b) = tokio::join!(
        h.client.send::<Value>(RequestDescriptor::get("/api/v1/orders")),
        h.client.send::<Value>(RequestDescriptor::get("/api/v1/orders")),
    );

    assert_eq!(assert_ok!(a), json!({ "total": 3 }));
    assert_eq!(assert_ok!(b), json!({ "total": 3 }));
    assert_eq!(count_requests(&server, "/api/auth/refresh").await, 1);

    let retried_with_t2 = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            r.url.path() == "/api/v1/orders"
                && r.headers.get("authorization").is_some_and(|v| v == "T2")
        })
        .count();
    assert_eq!(retried_with_t2, 2);

    let pair = h.session.pair().await.unwrap();
    assert_eq!(pair.access_token, "T2");
    assert_eq!(pair.refresh_token, "R2");
    assert!(h.notifier.errors().is_empty());
    assert_eq!(h.client.metrics().refresh_exchanges.get(), 1);
    assert!(!h.client.is_refreshing().await);
}

#[tokio::test]
async fn test_missing_refresh_token_skips_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/info"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::token_pair("T2", "R2")))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(
        MockSessionStore::without_refresh_token("T1"),
        config_for(&server),
    );

    let err: ClientError = assert_err!(auth::user_info(&h.client).await);
    assert!(err.is_unauthorized());

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.session.sign_out_count(), 1);
    assert!(h.session.pair().await.is_none());
}

#[tokio::test]
async fn test_incomplete_refresh_response_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::unauthorized()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(json!({ "token": "T2" }))))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let err = assert_err!(auth::user_info(&h.client).await);
    assert!(err.is_unauthorized());
    assert_eq!(err.message, "token expired");
    assert_eq!(h.session.set_tokens_count(), 0);
    assert_eq!(h.notifier.unauthorized_count(), 1);
    assert_eq!(count_requests(&server, "/api/user/info").await, 1);
}

#[tokio::test]
async fn test_post_params_sent_as_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/members"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "name": "Ada", "level": 2 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::success_with_message(json!({ "id": 7 }), "created")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let request = RequestDescriptor::post("/api/v1/members")
        .with_params(&json!({ "name": "Ada", "level": 2 }))
        .unwrap()
        .show_success_notification();
    let created: Value = assert_ok!(h.client.send(request).await);

    assert_eq!(created, json!({ "id": 7 }));
    assert_eq!(h.notifier.successes(), vec!["created".to_string()]);
}

#[tokio::test]
async fn test_get_params_sent_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/list"))
        .and(query_param("current", "1"))
        .and(query_param("size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(json!({
            "records": [], "current": 1, "size": 20, "total": 0
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let request = RequestDescriptor::get("/api/user/list")
        .with_params(&json!({ "current": 1, "size": 20 }))
        .unwrap();
    let page: Value = assert_ok!(h.client.send(request).await);
    assert_eq!(page["total"], 0);
    assert!(h.notifier.successes().is_empty());
}

#[tokio::test]
async fn test_business_error_notification_respects_suppression() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::failure(1001, "name is required")))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(
        MockSessionStore::signed_in("T1", "R1"),
        config_for(&server).with_retry(RetryConfig::default().with_max_retries(2)),
    );

    let err = assert_err!(
        h.client
            .send::<Value>(RequestDescriptor::post("/api/v1/members"))
            .await
    );
    assert_eq!(err.code, 1001);
    assert_eq!(err.message, "name is required");
    assert_eq!(err.method.as_deref(), Some("POST"));

    let quiet = RequestDescriptor::post("/api/v1/members").suppress_error_notification();
    assert_err!(h.client.send::<Value>(quiet).await);

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].1);
    assert!(!errors[1].1);
    assert_eq!(h.client.metrics().retries.get(), 0);
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(json!([]))))
        .mount(&server)
        .await;

    let h = harness(
        MockSessionStore::signed_in("T1", "R1"),
        config_for(&server).with_retry(
            RetryConfig::default()
                .with_max_retries(1)
                .with_delay(Duration::from_millis(20)),
        ),
    );

    let orders: Vec<Value> = assert_ok!(
        h.client
            .send(RequestDescriptor::get("/api/v1/orders"))
            .await
    );
    assert!(orders.is_empty());
    assert_eq!(h.client.metrics().retries.get(), 1);
    assert_eq!(h.client.metrics().requests_issued.get(), 2);
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test]
async fn test_login_stores_pair_for_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "userName": "Super", "password": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::token_pair("T1", "R1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/info"))
        .and(header("Authorization", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::success(fixtures::user_info())))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::new(), config_for(&server));

    let pair = assert_ok!(auth::login(&h.client, "Super", "123456").await);
    assert_eq!(pair.access_token, "T1");
    assert_eq!(h.session.set_tokens_count(), 1);

    let info = assert_ok!(auth::user_info(&h.client).await);
    assert_eq!(info.user_id, 1);
}

#[tokio::test]
async fn test_connection_failure_maps_to_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let session = Arc::new(MockSessionStore::signed_in("T1", "R1"));
    let notifier = Arc::new(RecordingNotifier::new());
    let client = ApiClient::builder(ClientConfig::new(&uri).unwrap())
        .session_store(Arc::clone(&session) as Arc<dyn SessionStore>)
        .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
        .build()
        .unwrap();

    let err = assert_err!(
        client
            .send::<Value>(RequestDescriptor::get("/api/v1/orders"))
            .await
    );
    assert_eq!(err.code, 503);
    assert!(err.is_retry_exhausted());
    assert_eq!(notifier.errors().len(), 1);
}

#[tokio::test]
async fn test_send_envelope_returns_raw_envelope_and_shows_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/members"))
        .and(body_json(json!({ "id": 7, "name": "Ada" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::success_with_message(json!({ "id": 7 }), "saved")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let request = RequestDescriptor::put("/api/v1/members")
        .with_params(&json!({ "id": 7, "name": "Ada" }))
        .unwrap()
        .show_success_notification();
    let envelope = assert_ok!(h.client.send_envelope(request).await);

    assert_eq!(envelope.code, 200);
    assert_eq!(envelope.msg, "saved");
    assert_eq!(envelope.data, Some(json!({ "id": 7 })));
    assert_eq!(h.notifier.successes(), vec!["saved".to_string()]);
}

#[tokio::test]
async fn test_send_envelope_reports_suppressed_error_as_hidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::failure(500, "count members failed")))
        .mount(&server)
        .await;

    let h = harness(MockSessionStore::signed_in("T1", "R1"), config_for(&server));

    let quiet = RequestDescriptor::get("/api/v1/summary").suppress_error_notification();
    let err = assert_err!(h.client.send_envelope(quiet).await);
    assert_eq!(err.code, 500);

    let loud = RequestDescriptor::get("/api/v1/summary");
    assert_err!(h.client.send_envelope(loud).await);

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 2);
    assert!(!errors[0].1);
    assert!(errors[1].1);
    assert!(h.notifier.successes().is_empty());
}
