use axum::{extract::State, http::StatusCode, Json};
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use common_security::AdminContext;
use tracing::info;

use crate::app_state::AppState;
use crate::schemas::CreateCategoryRequest;
use crate::store::Category;
use crate::validation::Valid;

pub async fn list_categories(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.catalog.list_categories().await.map_err(ApiError::internal)?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    admin: AdminContext,
    Valid(req): Valid<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state
        .catalog
        .insert_category(&req.name)
        .await
        .map_err(ApiError::internal)?;
    state.metrics.catalog_change("category_created");
    info!(category_id = %category.id, admin_id = %admin.subject(), "category created");
    Ok((StatusCode::CREATED, Json(category)))
}
