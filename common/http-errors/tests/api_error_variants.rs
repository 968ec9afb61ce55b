use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::ApiError;
use http_body_util::BodyExt;
use serde_json::Value;

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn validation_variant_lists_every_detail() {
    let err = ApiError::validation(["name too short", "invalid email", "password too short"]);
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "validation_error");
    let body = body_json(resp).await;
    assert_eq!(body["error"], "validation failed");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details[1]["message"], "invalid email");
}

#[test]
fn unauthorized_variant() {
    let resp = ApiError::unauthorized("invalid_token", "invalid token").into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_token");
}

#[test]
fn forbidden_variant() {
    let resp = ApiError::forbidden("admin_required", "administrator role required").into_response();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "admin_required");
}

#[test]
fn bad_request_variant() {
    let resp = ApiError::bad_request("invalid_something", "nope").into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_something");
}

#[test]
fn not_found_variant() {
    let resp = ApiError::not_found("missing_resource", "missing").into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_resource");
}

#[test]
fn conflict_variant() {
    let resp = ApiError::conflict("email_taken", "user already exists").into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "email_taken");
}

#[tokio::test]
async fn internal_variant_hides_cause() {
    let resp = ApiError::internal("connection refused (db-primary:5432)").into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
    let body = body_json(resp).await;
    assert_eq!(body["error"], "internal server error");
    assert!(!body.to_string().contains("db-primary"));
    assert!(body.get("details").is_none());
}
