use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_http_errors::{http_error_metrics_layer, ApiError};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::app_state::AppState;
use crate::category_handlers::{create_category, list_categories};
use crate::media::MAX_IMAGE_BYTES;
use crate::product_handlers::{create_product, delete_product, list_category_products, list_products};
use crate::user_handlers::{create_session, create_user, current_user};

pub const SERVICE_NAME: &str = "storefront-service";

/// Room for the multipart envelope and text fields around a maximum-size image.
const BODY_LIMIT_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Response {
    state
        .metrics
        .render()
        .unwrap_or_else(|err| ApiError::internal(err).into_response())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/users", post(create_user))
        .route("/session", post(create_session))
        .route("/me", get(current_user))
        .route("/category", get(list_categories).post(create_category))
        .route("/category/product", get(list_category_products))
        .route("/product", post(create_product).delete(delete_product))
        .route("/products", get(list_products))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .with_state(state)
}

/// An empty origin list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| warn!(%origin, error = %err, "ignoring invalid CORS origin"))
                .ok()
        }))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}
