use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use evosaas_api::routes::router;
use evosaas_api::token::TokenService;
use evosaas_api::AppStateInner;
use evosaas_store::Store;

fn test_app() -> Router {
    let state = Arc::new(AppStateInner {
        store: Store::new(),
        tokens: TokenService::new("test-secret"),
        environment: "test".into(),
        started_at: Instant::now(),
    });
    router(state, "*")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "pw123456", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_instance(app: &Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/whatsapp/instances",
        Some(token),
        Some(json!({ "instanceName": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create instance failed: {body}");
    body["instance"].clone()
}

// -- Auth --

#[tokio::test]
async fn register_returns_user_and_usable_token() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "alice@x.com", "password": "pw123456", "name": "Alice" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "alice@x.com");
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["plan"], "starter");
    // The hash must never appear in any response shape.
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, profile) = send(&app, "GET", "/auth/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["email"], "alice@x.com");
}

#[tokio::test]
async fn register_validates_input() {
    let app = test_app();

    let cases = [
        json!({ "email": "alice@x.com", "password": "pw123456" }),
        json!({ "email": "not-an-email", "password": "pw123456", "name": "A" }),
        json!({ "email": "alice@x.com", "password": "short", "name": "A" }),
    ];
    for body in cases {
        let (status, response) = send(&app, "POST", "/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }
}

#[tokio::test]
async fn duplicate_email_rejected_regardless_of_other_fields() {
    let app = test_app();
    register(&app, "alice@x.com", "Alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "alice@x.com", "password": "different1", "name": "Imposter" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn login_returns_matching_identity() {
    let app = test_app();
    register(&app, "alice@x.com", "Alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@x.com", "password": "pw123456" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@x.com");

    let token = body["token"].as_str().unwrap();
    let (status, profile) = send(&app, "GET", "/auth/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["email"], "alice@x.com");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = test_app();
    register(&app, "alice@x.com", "Alice").await;

    let (wrong_pw_status, wrong_pw_body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@x.com", "password": "wrong-password" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "pw123456" })),
    )
    .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body, unknown_body);
}

#[tokio::test]
async fn missing_and_invalid_tokens_get_distinct_401s() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/whatsapp/instances", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, body) =
        send(&app, "GET", "/whatsapp/instances", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn tampered_token_rejected() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;
    let tampered = format!("{}AAAA", &token[..token.len() - 4]);

    let (status, body) = send(&app, "GET", "/auth/profile", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

// -- Instances --

#[tokio::test]
async fn created_instance_starts_pending_and_is_listed() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;

    let instance = create_instance(&app, &token, "Shop1").await;
    assert_eq!(instance["instanceName"], "Shop1");
    assert_eq!(instance["status"], "pending");
    assert_eq!(instance["qrCode"], Value::Null);

    let (status, body) = send(&app, "GET", "/whatsapp/instances", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["instances"].as_array().unwrap().len(), 1);
    assert_eq!(body["instances"][0]["id"], instance["id"]);

    let uri = format!("/whatsapp/instances/{}", instance["id"].as_str().unwrap());
    let (status, body) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["instance"]["status"], "pending");
}

#[tokio::test]
async fn instance_name_is_validated() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;

    for body in [json!({}), json!({ "instanceName": "ab" })] {
        let (status, response) = send(
            &app,
            "POST",
            "/whatsapp/instances",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }
}

// -- Messages --

#[tokio::test]
async fn send_message_records_it_as_sent() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;
    let instance = create_instance(&app, &token, "Shop1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/whatsapp/messages/send",
        Some(&token),
        Some(json!({
            "instanceId": instance["id"],
            "phoneNumber": "15550001234",
            "message": "hi",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["data"]["phoneNumber"], "15550001234");
    assert_eq!(body["data"]["instanceId"], instance["id"]);
}

#[tokio::test]
async fn send_message_validates_input() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;
    let instance = create_instance(&app, &token, "Shop1").await;

    let cases = [
        json!({ "phoneNumber": "15550001234", "message": "hi" }),
        json!({ "instanceId": instance["id"], "phoneNumber": "123", "message": "hi" }),
        json!({ "instanceId": instance["id"], "phoneNumber": "15550001234", "message": "" }),
    ];
    for body in cases {
        let (status, response) = send(
            &app,
            "POST",
            "/whatsapp/messages/send",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{response}");
    }
}

#[tokio::test]
async fn send_to_unknown_instance_is_not_found() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/whatsapp/messages/send",
        Some(&token),
        Some(json!({
            "instanceId": "00000000-0000-0000-0000-000000000000",
            "phoneNumber": "15550001234",
            "message": "hi",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Instance not found");
}

#[tokio::test]
async fn message_filter_returns_exact_subset() {
    let app = test_app();
    let token = register(&app, "alice@x.com", "Alice").await;
    let shop = create_instance(&app, &token, "Shop1").await;
    let support = create_instance(&app, &token, "Support").await;

    for (instance, text) in [(&shop, "a"), (&support, "b"), (&shop, "c")] {
        let (status, _) = send(
            &app,
            "POST",
            "/whatsapp/messages/send",
            Some(&token),
            Some(json!({
                "instanceId": instance["id"],
                "phoneNumber": "15550001234",
                "message": text,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, all) = send(&app, "GET", "/whatsapp/messages", Some(&token), None).await;
    let uri = format!(
        "/whatsapp/messages?instanceId={}",
        shop["id"].as_str().unwrap()
    );
    let (_, filtered) = send(&app, "GET", &uri, Some(&token), None).await;

    let expected: Vec<&Value> = all["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["instanceId"] == shop["id"])
        .collect();
    let actual: Vec<&Value> = filtered["messages"].as_array().unwrap().iter().collect();

    assert_eq!(actual.len(), 2);
    assert_eq!(actual, expected);
    // Insertion order is preserved in the unfiltered listing.
    let texts: Vec<&str> = all["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

// -- Tenant isolation --

#[tokio::test]
async fn full_scenario_with_cross_tenant_isolation() {
    let app = test_app();

    // register alice@x.com / pw123456 / "Alice" -> 201 with token
    let alice = register(&app, "alice@x.com", "Alice").await;

    // create instance "Shop1" -> 201, status pending
    let instance = create_instance(&app, &alice, "Shop1").await;
    assert_eq!(instance["status"], "pending");

    // send message -> 200, status sent
    let (status, body) = send(
        &app,
        "POST",
        "/whatsapp/messages/send",
        Some(&alice),
        Some(json!({
            "instanceId": instance["id"],
            "phoneNumber": "15550001234",
            "message": "hi",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "sent");

    // a second user's token must see alice's instance as nonexistent
    let bob = register(&app, "bob@x.com", "Bob").await;
    let uri = format!("/whatsapp/instances/{}", instance["id"].as_str().unwrap());
    let (status, body) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Instance not found");

    let (_, instances) = send(&app, "GET", "/whatsapp/instances", Some(&bob), None).await;
    assert!(instances["instances"].as_array().unwrap().is_empty());

    let (_, messages) = send(&app, "GET", "/whatsapp/messages", Some(&bob), None).await;
    assert!(messages["messages"].as_array().unwrap().is_empty());

    // sending through alice's instance with bob's token is also not-found
    let (status, _) = send(
        &app,
        "POST",
        "/whatsapp/messages/send",
        Some(&bob),
        Some(json!({
            "instanceId": instance["id"],
            "phoneNumber": "15550001234",
            "message": "intruder",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Webhooks, health, misc --

#[tokio::test]
async fn webhook_acknowledges_arbitrary_payloads() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/webhooks/evolution",
        None,
        Some(json!({ "event": "connection.update", "data": { "state": "open" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "received");
}

#[tokio::test]
async fn health_reports_uptime_and_responses_carry_request_id() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert!(body["uptime"].is_u64());
}

#[tokio::test]
async fn unknown_route_gets_json_404() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["path"], "/nope");
    assert_eq!(body["method"], "GET");
}

#[tokio::test]
async fn api_index_lists_endpoint_groups() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/v1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["auth"], "/auth");
    assert_eq!(body["endpoints"]["whatsapp"], "/whatsapp");
}
