#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common_auth::{JwtConfig, JwtVerifier, SessionProfile, TokenIssuer};
use common_crypto::{CredentialHasher, HashingConfig};
use common_security::Role;
use http_body_util::BodyExt;
use serde_json::Value;
use storefront_service::media::{check_image, ImageStore, ImageUpload, MediaError, StoredImage};
use storefront_service::metrics::StorefrontMetrics;
use storefront_service::store::{MemoryStore, NewUserRecord, UserRecord, UserRepository};
use storefront_service::{router, AppState};
use tower::ServiceExt;

pub const SECRET: &str = "storefront-test-secret";
pub const BOUNDARY: &str = "storefront-boundary";

/// Accepts every valid image and remembers what it was given.
#[derive(Default)]
pub struct RecordingImageStore {
    pub uploads: Mutex<Vec<ImageUpload>>,
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn store(&self, image: ImageUpload) -> Result<StoredImage, MediaError> {
        check_image(&image)?;
        let url = format!("https://cdn.test/products/{}", image.file_name);
        let public_id = format!("products/{}", image.file_name);
        self.uploads.lock().unwrap().push(image);
        Ok(StoredImage { url, public_id })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingImageStore>,
    pub issuer: Arc<TokenIssuer>,
    pub hasher: Arc<CredentialHasher>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(store.clone(), store)
    }

    /// Catalog stays in memory; account lookups go to `users`.
    pub fn with_users(users: Arc<dyn UserRepository>) -> Self {
        Self::build(users, Arc::new(MemoryStore::new()))
    }

    fn build(users: Arc<dyn UserRepository>, store: Arc<MemoryStore>) -> Self {
        let config = JwtConfig::new(SECRET);
        let media = Arc::new(RecordingImageStore::default());
        let issuer = Arc::new(TokenIssuer::new(&config));
        let hasher = Arc::new(CredentialHasher::new(&HashingConfig::new(1)).unwrap());
        let state = AppState::new(
            users,
            store.clone(),
            media.clone(),
            issuer.clone(),
            Arc::new(JwtVerifier::new(&config)),
            hasher.clone(),
            Arc::new(StorefrontMetrics::new().unwrap()),
        );
        Self { router: router(state), store, media, issuer, hasher }
    }

    pub async fn seed_user(&self, email: &str, password: &str, role: Role) -> UserRecord {
        self.store
            .insert_user(NewUserRecord {
                name: "Seeded".into(),
                email: email.into(),
                password_hash: self.hasher.hash(password).unwrap(),
                role,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &UserRecord) -> String {
        self.issuer
            .issue(user.id, &SessionProfile::new(&user.name, &user.email))
            .unwrap()
            .token
    }

    pub async fn admin_token(&self) -> String {
        let admin = self.seed_user("admin@shop.test", "admin-pass", Role::Admin).await;
        self.token_for(&admin)
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    bare_request(Method::GET, uri, token)
}

pub fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

pub fn messages(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
