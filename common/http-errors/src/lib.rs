use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use serde::Serialize;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";
const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_LABEL: &str = "overflow";
const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

#[derive(Debug)]
pub enum ApiError {
    Validation { details: Vec<String> },
    BadRequest { code: &'static str, message: String },
    Unauthorized { code: &'static str, message: String },
    Forbidden { code: &'static str, message: String },
    NotFound { code: &'static str, message: String },
    Conflict { code: &'static str, message: String },
    /// Message is always client-safe; the underlying cause is logged where the error is built.
    Internal { message: String },
}

impl ApiError {
    pub fn validation<I, M>(details: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self::Validation { details: details.into_iter().map(Into::into).collect() }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, message: message.into() }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized { code, message: message.into() }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden { code, message: message.into() }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { code, message: message.into() }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: message.into() }
    }

    /// Log `err` and hide it behind a generic 500.
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        tracing::error!(error = %err, "request failed with internal error");
        Self::Internal { message: GENERIC_INTERNAL_MESSAGE.to_string() }
    }

    /// Like [`ApiError::internal`] but with a client-facing message for the failed operation.
    pub fn internal_with<E: std::fmt::Display>(err: E, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %err, %message, "request failed with internal error");
        Self::Internal { message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. } => code,
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = match self {
            ApiError::Validation { details } => ErrorBody {
                code: code.into(),
                error: "validation failed".into(),
                details: Some(details.into_iter().map(|message| ErrorDetail { message }).collect()),
            },
            ApiError::BadRequest { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::Conflict { message, .. }
            | ApiError::Internal { message } => ErrorBody { code: code.into(), error: message, details: None },
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    )
    .expect("valid http_errors_total definition");
    REGISTRY.register(Box::new(v.clone())).ok();
    v
});

static ERROR_CODE_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("http_error_codes_distinct", "Distinct error code labels currently tracked")
        .expect("valid http_error_codes_distinct definition");
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

static ERROR_CODE_OVERFLOW: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "http_error_code_overflow_total",
        "Error responses whose code was folded into the overflow label",
    )
    .expect("valid http_error_code_overflow_total definition");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Registry holding the error metrics, for services that render `/metrics`.
pub fn registry() -> &'static Registry {
    Lazy::force(&HTTP_ERRORS_TOTAL);
    Lazy::force(&ERROR_CODE_DISTINCT);
    Lazy::force(&ERROR_CODE_OVERFLOW);
    &REGISTRY
}

/// Maps an error code to the label used in metrics, capping distinct labels at 40.
pub fn error_code_label(code: &str) -> String {
    let mut seen = SEEN_CODES.lock().unwrap_or_else(PoisonError::into_inner);
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        ERROR_CODE_OVERFLOW.inc();
        return OVERFLOW_LABEL.to_string();
    }
    seen.insert(code.to_string());
    ERROR_CODE_DISTINCT.set(seen.len() as i64);
    code.to_string()
}

pub fn distinct_error_codes() -> i64 {
    ERROR_CODE_DISTINCT.get()
}

pub fn overflowed_error_codes() -> u64 {
    ERROR_CODE_OVERFLOW.get()
}

type LayerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware for `axum::middleware::from_fn` counting error responses by service, code and status.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request, Next) -> LayerFuture + Clone + Send + Sync + 'static {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp
                    .headers()
                    .get(ERROR_CODE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                let label = error_code_label(code);
                HTTP_ERRORS_TOTAL
                    .with_label_values(&[service, label.as_str(), status.as_str()])
                    .inc();
            }
            resp
        }) as LayerFuture
    }
}
