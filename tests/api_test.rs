//! End-to-end tests driving the full router
//!
//! Every request goes through the same chains as in production. There is no
//! socket, so the client key comes from `X-Forwarded-For` or falls back to
//! "unknown".

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use practice_api::{config::Config, server::Server};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

const ALLOWED_ORIGIN: &str = "http://localhost:3000";

fn test_config() -> Config {
    let mut config = Config::default_config();
    config.auth.jwt_secret = Some(SecretString::new("integration-test-secret".to_string()));
    config.logging.security_events = false;
    config
}

async fn app_with(config: Config) -> Router {
    Server::new(config).await.unwrap().router()
}

async fn app() -> Router {
    app_with(test_config()).await
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    Reply {
        status,
        headers,
        body,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> Reply {
    send(
        app,
        json_request(
            Method::POST,
            "/auth/login",
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health_carries_security_headers_and_request_id() {
    let app = app().await;
    let reply = send(&app, get("/health")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert!(reply.body["timestamp"].is_string());
    assert_eq!(reply.headers["x-frame-options"], "DENY");
    assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    assert_eq!(reply.headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(reply.headers.contains_key("x-request-id"));
    assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_hundred_and_first_request_is_rate_limited() {
    let app = app().await;
    let from = |client: &str| {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..100 {
        let reply = send(&app, from("203.0.113.7")).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let reply = send(&app, from("203.0.113.7")).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.headers[header::RETRY_AFTER], "60");
    assert_eq!(
        reply.body,
        json!({ "error": "rate limit exceeded", "retry_after": 60 })
    );
    assert_eq!(reply.headers["x-frame-options"], "DENY");

    // Other clients have their own window
    let reply = send(&app, from("198.51.100.1")).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_then_me() {
    let app = app().await;

    let reply = login(&app, "alice@example.com", "password").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["expires_in"], 900);
    let access = reply.body["access_token"].as_str().unwrap().to_string();
    assert!(reply.body["refresh_token"].is_string());

    let reply = send(&app, bearer("/auth/me", &access)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        json!({ "user_id": 1, "email": "alice@example.com" })
    );
}

#[tokio::test]
async fn test_login_failures() {
    let app = app().await;

    let reply = login(&app, "alice@example.com", "wrong").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid credentials");

    let reply = login(&app, "nobody@example.com", "password").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid request body");

    let reply = send(&app, get("/auth/login")).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_me_rejects_missing_and_bad_tokens() {
    let app = app().await;

    let reply = send(&app, get("/auth/me")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "missing authorization header");

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid authorization header format");

    let reply = send(&app, bearer("/auth/me", "not.a.token")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_secret_is_rejected() {
    let other = app_with({
        let mut config = test_config();
        config.auth.jwt_secret = Some(SecretString::new("some-other-secret".to_string()));
        config
    })
    .await;
    let reply = login(&other, "alice@example.com", "password").await;
    let foreign = reply.body["access_token"].as_str().unwrap().to_string();

    let app = app().await;
    let reply = send(&app, bearer("/auth/me", &foreign)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid token signature");
}

#[tokio::test]
async fn test_refresh_issues_working_tokens() {
    let app = app().await;
    let reply = login(&app, "bob@example.com", "password").await;
    let refresh_token = reply.body["refresh_token"].as_str().unwrap().to_string();
    let access_token = reply.body["access_token"].as_str().unwrap().to_string();

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/auth/refresh",
            json!({ "refresh_token": refresh_token }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let new_access = reply.body["access_token"].as_str().unwrap().to_string();

    let reply = send(&app, bearer("/auth/me", &new_access)).await;
    assert_eq!(reply.body, json!({ "user_id": 2, "email": "bob@example.com" }));

    // Access tokens are accepted for refresh as well
    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/auth/refresh",
            json!({ "refresh_token": access_token }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/auth/refresh",
            json!({ "refresh_token": "garbage" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "invalid refresh token");
}

#[tokio::test]
async fn test_csrf_on_state_changing_requests() {
    let app = app().await;
    let body = json!({ "name": "Dana", "email": "dana@example.com" }).to_string();
    let post = |origin: &str, marker: bool| {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/users")
            .header(header::ORIGIN, origin);
        if marker {
            builder = builder.header("x-requested-with", "XMLHttpRequest");
        }
        builder.body(Body::from(body.clone())).unwrap()
    };

    let reply = send(&app, post(ALLOWED_ORIGIN, false)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.body["error"],
        "CSRF validation failed: missing X-Requested-With header"
    );

    let reply = send(&app, post("http://evil.example", true)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "CSRF validation failed: invalid origin");

    let reply = send(&app, post(ALLOWED_ORIGIN, true)).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["id"], 4);

    // Safe methods are never checked
    let req = Request::builder()
        .uri("/users")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_strict_mode_requires_provenance() {
    let mut config = test_config();
    config.csrf.strict_mode = true;
    let app = app_with(config).await;

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/users",
            json!({ "name": "Dana", "email": "dana@example.com" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.body["error"],
        "CSRF validation failed: missing origin/referer"
    );
}

#[tokio::test]
async fn test_user_crud() {
    let app = app().await;

    let reply = send(&app, get("/users")).await;
    assert_eq!(reply.status, StatusCode::OK);
    let names: Vec<_> = reply
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);

    let reply = send(&app, get("/users/1")).await;
    assert_eq!(reply.body["email"], "alice@example.com");

    let reply = send(&app, get("/users/abc")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid user id");

    let reply = send(&app, get("/users/99")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "user not found");

    let reply = send(
        &app,
        json_request(
            Method::PUT,
            "/users/1",
            json!({ "name": "Alicia", "email": "alicia@example.com" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "Alicia");

    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/users/2")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(send(&app, get("/users/2")).await.status, StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method(Method::PATCH)
        .uri("/users")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(reply.body["error"], "method not allowed");

    let reply = send(&app, get("/nowhere")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "not found");
}

#[tokio::test]
async fn test_user_input_validation() {
    let app = app().await;

    let cases = [
        (json!({ "name": "", "email": "x@example.com" }), "name and email are required"),
        (json!({ "name": "<b></b>", "email": "x@example.com" }), "name and email are required"),
        (json!({ "name": "Dana", "email": "not-an-email" }), "invalid email format"),
        (json!({ "name": "n".repeat(101), "email": "x@example.com" }), "invalid name format"),
    ];

    for (body, message) in cases {
        let reply = send(&app, json_request(Method::POST, "/users", body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], message);
    }

    let reply = send(
        &app,
        json_request(
            Method::POST,
            "/users",
            json!({ "name": "  <script>x</script>Eve ", "email": "eve@example.com" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["name"], "xEve");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = test_config();
    config.body_limit.max_bytes = 64;
    let app = app_with(config).await;

    let body = json!({ "name": "n".repeat(100), "email": "big@example.com" }).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app().await;
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/users")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::empty())
        .unwrap();

    let reply = send(&app, req).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
    assert_eq!(
        reply.headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
}

#[tokio::test]
async fn test_simulation_endpoints() {
    let app = app().await;

    let reply = send(&app, get("/delay/0")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["delay_ms"], 0);

    for uri in ["/delay/abc", "/delay/10001", "/delay/-5"] {
        let reply = send(&app, get(uri)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "invalid delay value (0-10000ms)");
    }

    let reply = send(&app, get("/error-rate/101")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid error rate (0-100)");

    let reply = send(&app, get("/error-rate/0")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);

    let reply = send(&app, get("/error-rate/100")).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["success"], false);
    assert_eq!(reply.body["error_rate_percent"], 100);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::METHOD_NOT_ALLOWED);
}
