use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(max_retries: u32) -> ExternalCallClient {
    ExternalCallClient::new(Duration::from_secs(5))
        .expect("client builds")
        .with_max_retries(max_retries)
        .with_initial_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn success_returns_parsed_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 21})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(3);
    let value = client
        .call("GET", &format!("{}/data", server.uri()), None, None)
        .await
        .expect("call succeeds");

    assert_eq!(value, json!({"temp": 21}));
}

#[tokio::test]
async fn non_json_body_is_wrapped_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text here"))
        .mount(&server)
        .await;

    let client = fast_client(3);
    let value = client
        .call("GET", &server.uri(), None, None)
        .await
        .expect("call succeeds");

    assert_eq!(value, json!({"text": "plain text here"}));
}

#[tokio::test]
async fn empty_body_reports_success_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = fast_client(3);
    let value = client
        .call("DELETE", &server.uri(), None, None)
        .await
        .expect("call succeeds");

    assert_eq!(value, json!({"success": true, "status": 204}));
}

#[tokio::test]
async fn retry_bound_is_exactly_max_retries_plus_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        // Exactly max_retries + 1 attempts, never more, never fewer.
        .expect(3)
        .mount(&server)
        .await;

    let client = fast_client(2);
    let result = client.call("GET", &server.uri(), None, None).await;

    assert!(result.is_err());
    server.verify().await;
}

#[tokio::test]
async fn rate_limit_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(3);
    let value = client
        .call("GET", &server.uri(), None, None)
        .await
        .expect("eventually succeeds");

    assert_eq!(value, json!({"ok": true}));
    server.verify().await;
}

#[tokio::test]
async fn non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(3);
    let result = client.call("GET", &server.uri(), None, None).await;

    let error = result.expect_err("400 is terminal");
    assert!(error.to_string().contains("400"));
    server.verify().await;
}

#[tokio::test]
async fn server_error_outside_retry_set_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(3);
    let result = client.call("GET", &server.uri(), None, None).await;

    assert!(result.is_err());
    server.verify().await;
}

#[tokio::test]
async fn bearer_token_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer sekrit"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(0);
    client
        .call("GET", &server.uri(), None, Some("sekrit"))
        .await
        .expect("call succeeds");

    server.verify().await;
}

#[tokio::test]
async fn json_body_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({"q": "rain"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(0);
    let value = client
        .call("POST", &server.uri(), Some(&json!({"q": "rain"})), None)
        .await
        .expect("call succeeds");

    assert_eq!(value, json!({"hits": 1}));
    server.verify().await;
}

#[tokio::test]
async fn invalid_method_is_rejected() {
    let client = fast_client(0);
    let result = client
        .call("NOT A METHOD", "http://localhost/", None, None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn connection_refused_is_retried_then_surfaced() {
    // Nothing listens on this port; connect errors are transient, so the
    // full retry budget is spent before the failure surfaces.
    let client = fast_client(1);
    let result = client
        .call("GET", "http://127.0.0.1:1/unreachable", None, None)
        .await;

    assert!(result.is_err());
}
