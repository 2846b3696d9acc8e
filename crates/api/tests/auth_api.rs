//! HTTP-level tests for registration, login, lockout, token refresh and logout.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_user, get_auth, post_json, post_json_auth, TEST_PASSWORD};
use eyelabel_core::roles::Role;
use eyelabel_db::repositories::UserRepo;
use sqlx::PgPool;

async fn login_json(app: axum::Router, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    let status = response.status();
    (status, body_json(response).await)
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_creates_labeler_and_signs_in(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = serde_json::json!({
        "email": "  New.Labeler@Example.com ",
        "name": "New Labeler",
        "password": "long-enough-pw",
    });
    let response = post_json(app.clone(), "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "new.labeler@example.com");
    assert_eq!(json["user"]["role"], "labeler");
    assert!(json["access_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);

    let token = json["access_token"].as_str().unwrap();
    let me = get_auth(app, "/api/v1/auth/me", token).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["name"], "New Labeler");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_duplicate_email(pool: PgPool) {
    create_user(&pool, "taken@example.com", Role::Labeler).await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({
        "email": "TAKEN@example.com",
        "name": "Second",
        "password": "long-enough-pw",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_validates_input(pool: PgPool) {
    let app = common::build_test_app(pool);

    let short = serde_json::json!({ "email": "a@example.com", "name": "A", "password": "short" });
    let response = post_json(app.clone(), "/api/v1/auth/register", short).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_email = serde_json::json!({ "email": "not-an-email", "name": "A", "password": "long-enough-pw" });
    let response = post_json(app, "/api/v1/auth/register", bad_email).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_tokens_and_session_context(pool: PgPool) {
    let user = create_user(&pool, "admin@example.com", Role::Admin).await;
    let app = common::build_test_app(pool);

    let (status, json) = login_json(app, "Admin@Example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["role"], "admin");
    assert!(json["refresh_token"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_wrong_password_or_unknown_email_is_401(pool: PgPool) {
    create_user(&pool, "l@example.com", Role::Labeler).await;
    let app = common::build_test_app(pool);

    let (status, _) = login_json(app.clone(), "l@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login_json(app, "ghost@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn five_failures_lock_the_account(pool: PgPool) {
    create_user(&pool, "l@example.com", Role::Labeler).await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let (status, _) = login_json(app.clone(), "l@example.com", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, json) = login_json(app, "l@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].as_str().unwrap().contains("locked"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_cannot_log_in(pool: PgPool) {
    let user = create_user(&pool, "l@example.com", Role::Labeler).await;
    UserRepo::deactivate(&pool, user.id).await.unwrap();
    let app = common::build_test_app(pool);

    let (status, _) = login_json(app, "l@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Refresh and logout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    create_user(&pool, "l@example.com", Role::Labeler).await;
    let app = common::build_test_app(pool);
    let (_, login) = login_json(app.clone(), "l@example.com", TEST_PASSWORD).await;
    let old_refresh = login["refresh_token"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "refresh_token": old_refresh });
    let response = post_json(app.clone(), "/api/v1/auth/refresh", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_ne!(json["refresh_token"], old_refresh.as_str());

    // The old refresh token is spent.
    let again = post_json(app, "/api/v1/auth/refresh", body).await;
    assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    create_user(&pool, "l@example.com", Role::Labeler).await;
    let app = common::build_test_app(pool);
    let (_, login) = login_json(app.clone(), "l@example.com", TEST_PASSWORD).await;
    let access = login["access_token"].as_str().unwrap();
    let refresh = login["refresh_token"].as_str().unwrap();

    let response =
        post_json_auth(app.clone(), "/api/v1/auth/logout", access, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = serde_json::json!({ "refresh_token": refresh });
    let response = post_json(app, "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_bearer_token_is_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/auth/me", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
