mod support;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common_auth::SessionProfile;
use common_security::Role;
use serde_json::json;
use storefront_service::store::{NewUserRecord, StoreError, StoreResult, UserRecord, UserRepository};
use support::{get_request, json_request, messages, TestApp};

#[tokio::test]
async fn registration_succeeds_once_per_email() {
    let app = TestApp::new();
    let payload = json!({"name": "Alice", "email": "alice@shop.test", "password": "secret1"});

    let (status, body) = app.send(json_request(Method::POST, "/users", payload.clone(), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@shop.test");
    assert_eq!(body["role"], "user");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());

    let (status, body) = app.send(json_request(Method::POST, "/users", payload, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "email_taken");
}

/// Another request registers the same email between the lookup and the insert.
struct LosesInsertRace;

#[async_trait]
impl UserRepository for LosesInsertRace {
    async fn find_by_email(&self, _email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(None)
    }

    async fn find_by_id(&self, _id: uuid::Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(None)
    }

    async fn insert_user(&self, _user: NewUserRecord) -> StoreResult<UserRecord> {
        Err(StoreError::Conflict("users_email_key".into()))
    }
}

#[tokio::test]
async fn unique_violation_on_insert_is_a_conflict() {
    let app = TestApp::with_users(Arc::new(LosesInsertRace));
    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/users",
            json!({"name": "Alice", "email": "alice@shop.test", "password": "secret1"}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "email_taken");
}

#[tokio::test]
async fn empty_password_reports_only_the_length_rule() {
    let app = TestApp::new();
    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/users",
            json!({"name": "Alice", "email": "a@b.com", "password": ""}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(messages(&body), vec!["password must have at least 6 characters".to_string()]);
}

#[tokio::test]
async fn registration_reports_every_violation() {
    let app = TestApp::new();
    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/users",
            json!({"name": "ab", "email": "bad", "password": "123"}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(messages(&body).len(), 3);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new();
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_body");
}

#[tokio::test]
async fn login_returns_token_that_unlocks_me() {
    let app = TestApp::new();
    app.send(json_request(
        Method::POST,
        "/users",
        json!({"name": "Alice", "email": "alice@shop.test", "password": "secret1"}),
        None,
    ))
    .await;

    let (status, session) = app
        .send(json_request(
            Method::POST,
            "/session",
            json!({"email": "alice@shop.test", "password": "secret1"}),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["name"], "Alice");
    assert_eq!(session["role"], "user");
    let token = session["token"].as_str().unwrap().to_string();

    let (status, me) = app.send(get_request("/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], session["id"]);
    assert_eq!(me["email"], "alice@shop.test");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.seed_user("bob@shop.test", "hunter22", Role::User).await;

    let (wrong_status, wrong_body) = app
        .send(json_request(
            Method::POST,
            "/session",
            json!({"email": "bob@shop.test", "password": "nope-nope"}),
            None,
        ))
        .await;
    let (unknown_status, unknown_body) = app
        .send(json_request(
            Method::POST,
            "/session",
            json!({"email": "ghost@shop.test", "password": "nope-nope"}),
            None,
        ))
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn me_requires_a_valid_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.send(get_request("/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "auth_header");

    let (status, _) = app.send(get_request("/me", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let user = app.seed_user("old@shop.test", "secret1", Role::User).await;
    let issued = app
        .issuer
        .issue_at(
            user.id,
            &SessionProfile::new(&user.name, &user.email),
            Utc::now() - Duration::days(31),
        )
        .unwrap();

    let (status, body) = app.send(get_request("/me", Some(&issued.token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "auth_expired");
}

#[tokio::test]
async fn me_for_vanished_account_is_not_found() {
    let app = TestApp::new();
    let issued = app
        .issuer
        .issue(uuid::Uuid::new_v4(), &SessionProfile::new("Ghost", "ghost@shop.test"))
        .unwrap();
    let (status, body) = app.send(get_request("/me", Some(&issued.token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "user_not_found");
}
