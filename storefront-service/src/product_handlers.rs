use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use common_auth::AuthContext;
use common_http_errors::{ApiError, ApiResult};
use common_security::AdminContext;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::media::{check_image, ImageUpload};
use crate::schemas::{CategoryProductsQuery, CreateProductForm, DeleteProductQuery, ListProductsQuery};
use crate::store::{DisableOutcome, NewProductRecord, Product, ProductListing};
use crate::validation::{Candidate, RequestSchema, ValidQuery};

const IMAGE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request("image_rejected", "image exceeds the 4 MiB limit")
    } else {
        ApiError::bad_request("malformed_body", err.body_text())
    }
}

fn category_not_found() -> ApiError {
    ApiError::not_found("category_not_found", "category not found")
}

/// Splits the form into its text fields and the optional image part.
async fn read_product_form(
    multipart: &mut Multipart,
) -> ApiResult<(Map<String, Value>, Option<ImageUpload>)> {
    let mut fields = Map::new();
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            image = Some(ImageUpload { file_name, content_type, bytes });
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            fields.insert(name, Value::String(text));
        }
    }
    Ok((fields, image))
}

pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut multipart =
        multipart.map_err(|rej| ApiError::bad_request("malformed_body", rej.body_text()))?;
    let (fields, image) = read_product_form(&mut multipart).await?;
    let candidate = Candidate { body: Value::Object(fields), ..Candidate::default() };

    let schema = CreateProductForm::schema();
    let mut errors = schema.check(&candidate);
    if image.is_none() {
        errors.push("file is required");
    }
    let image = match image {
        Some(image) if errors.is_empty() => image,
        _ => return Err(errors.into()),
    };
    let form: CreateProductForm = schema.validate(candidate).map_err(ApiError::from)?.body()?;
    let price = form
        .price
        .parse::<i32>()
        .map_err(|_| ApiError::validation(["price must be a number"]))?;

    check_image(&image).map_err(|err| ApiError::bad_request("image_rejected", err.to_string()))?;

    state
        .catalog
        .find_category(form.category_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(category_not_found)?;

    let stored = state.media.store(image).await.map_err(|err| {
        if err.is_client_error() {
            ApiError::bad_request("image_rejected", err.to_string())
        } else {
            ApiError::internal_with(err, "image upload failed")
        }
    })?;

    let product = state
        .catalog
        .insert_product(NewProductRecord {
            name: form.name,
            price,
            description: form.description,
            banner: stored.url,
            category_id: form.category_id,
        })
        .await
        .map_err(ApiError::internal)?;

    state.metrics.catalog_change("product_created");
    info!(product_id = %product.id, admin_id = %admin.subject(), "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    _auth: AuthContext,
    ValidQuery(query): ValidQuery<ListProductsQuery>,
) -> ApiResult<Json<Vec<ProductListing>>> {
    let products = state
        .catalog
        .list_products(query.disabled())
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(products))
}

pub async fn list_category_products(
    State(state): State<AppState>,
    _auth: AuthContext,
    ValidQuery(query): ValidQuery<CategoryProductsQuery>,
) -> ApiResult<Json<Vec<ProductListing>>> {
    state
        .catalog
        .find_category(query.category_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(category_not_found)?;
    let products = state
        .catalog
        .list_products_by_category(query.category_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(products))
}

pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminContext,
    ValidQuery(query): ValidQuery<DeleteProductQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let outcome = state
        .catalog
        .disable_product(query.product_id)
        .await
        .map_err(ApiError::internal)?;
    let message = match outcome {
        DisableOutcome::Disabled => {
            state.metrics.catalog_change("product_disabled");
            info!(product_id = %query.product_id, admin_id = %admin.subject(), "product disabled");
            "product disabled"
        }
        DisableOutcome::NotFound => {
            warn!(product_id = %query.product_id, "disable requested for unknown product");
            "product not found"
        }
    };
    Ok(Json(MessageResponse { message }))
}
