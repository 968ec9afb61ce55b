pub mod app_state;
pub mod category_handlers;
pub mod config;
pub mod media;
pub mod metrics;
pub mod product_handlers;
pub mod routes;
pub mod schemas;
pub mod store;
pub mod user_handlers;
pub mod validation;

pub use app_state::AppState;
pub use common_http_errors::ApiError;
pub use routes::{cors_layer, router};
