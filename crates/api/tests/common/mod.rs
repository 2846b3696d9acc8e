#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use eyelabel_api::auth::jwt::JwtConfig;
use eyelabel_api::auth::password::hash_password;
use eyelabel_api::config::ServerConfig;
use eyelabel_api::router::build_app_router;
use eyelabel_api::state::AppState;
use eyelabel_core::roles::Role;
use eyelabel_db::models::user::{CreateUser, User};
use eyelabel_db::repositories::UserRepo;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        completion_hide_threshold: 2,
        assignment_timeout_mins: 15,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        bootstrap_admin: None,
    }
}

/// The production router over `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role: Role) -> User {
    let input = CreateUser {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role,
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Log in through the API and return the access token.
pub async fn login(app: &Router, email: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": TEST_PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK, "login should succeed");
    body_json(response).await["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

/// Create a user and log them in. Returns `(user, access_token)`.
pub async fn signed_in(app: &Router, pool: &PgPool, email: &str, role: Role) -> (User, String) {
    let user = create_user(pool, email, role).await;
    let token = login(app, email).await;
    (user, token)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::DELETE, uri, Some(token))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::POST, uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::PATCH, uri, Some(token), body)).await
}

/// POST a multipart form with a single `file` field.
pub async fn upload_file(
    app: Router,
    uri: &str,
    token: &str,
    file_name: &str,
    content: &str,
) -> Response<Body> {
    let boundary = "eyelabel-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Upload `content` as `transcript.csv` and return the new dataset id.
pub async fn upload_dataset(app: &Router, token: &str, content: &str) -> i64 {
    let response = upload_file(
        app.clone(),
        "/api/v1/datasets?name=Clinic",
        token,
        "transcript.csv",
        content,
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["dataset"]["id"]
        .as_i64()
        .expect("dataset id")
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("body should be UTF-8")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const CSV_HEADER: &str = "r_sph,r_cyl,r_axis,r_add,l_sph,l_cyl,l_axis,l_add,pd,\
chart_number,occluder_state,chart_display,speaker,utterance_text";

/// Header plus five data lines: lines 2 and 3 repeat the same measurements
/// and line 5 has no measurements at all, so three rows survive.
pub fn sample_csv() -> String {
    [
        CSV_HEADER,
        "-1.00,0.0,180.0,0.0,-1.25,0.0,180.0,0.0,64.0,Chart1,Bino,Large E,Optum,Read the top line",
        "-1.50,0.0,180.0,0.0,-1.25,0.0,180.0,0.0,64.0,Chart1,Bino,Large E,Optum,Better or worse",
        "-1.50,0.0,180.0,0.0,-1.25,0.0,180.0,0.0,64.0,Chart1,Bino,Large E,Patient,Better",
        "-1.50,-0.5,90.0,0.0,-1.25,0.0,180.0,0.0,64.0,Chart2,Right,Letters,Optum,And now",
        ",,,,,,,,,,,,Patient,Thank you",
    ]
    .join("\n")
}

/// A CSV with `n` rows that all survive ingestion.
pub fn numbered_csv(n: usize) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for i in 0..n {
        lines.push(format!(
            "-{i}.00,0.0,180.0,0.0,0.0,0.0,180.0,0.0,64.0,Chart1,Bino,Large E,Optum,line {i}"
        ));
    }
    lines.join("\n")
}

/// Annotation fields that make a row submittable and labeled.
pub fn green_label(row_index: i64) -> serde_json::Value {
    serde_json::json!({
        "row_index": row_index,
        "step": "Step 1",
        "intent_of_optum": "Measure distance acuity",
        "flag": "GREEN",
    })
}
