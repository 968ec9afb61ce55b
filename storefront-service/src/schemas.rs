//! Request payloads and the schemas that gate them.

use once_cell::sync::Lazy;
use serde::Deserialize;
use uuid::Uuid;

use crate::validation::{Field, RequestSchema, Schema};

static CREATE_USER: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field(Field::body("name").min_length(3, "name must have at least 3 characters"))
        .field(Field::body("email").email("invalid email"))
        .field(
            Field::body("password")
                .required("password is required")
                .min_length(6, "password must have at least 6 characters"),
        )
});

static CREATE_SESSION: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field(Field::body("email").email("invalid email"))
        .field(Field::body("password").required("password is required"))
});

static CREATE_CATEGORY: Lazy<Schema> = Lazy::new(|| {
    Schema::new().field(
        Field::body("name")
            .trim()
            .required("name is required")
            .min_length(2, "name must have at least 2 characters"),
    )
});

static CREATE_PRODUCT: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field(Field::body("name").required("name is required"))
        .field(Field::body("price").numeric("price must be a number"))
        .field(Field::body("description").required("description is required"))
        .field(Field::body("category_id").uuid("invalid category id"))
});

/// Any value other than `true` lists enabled products.
static LIST_PRODUCTS: Lazy<Schema> = Lazy::new(Schema::new);

static CATEGORY_PRODUCTS: Lazy<Schema> = Lazy::new(|| {
    Schema::new().field(
        Field::query("category_id")
            .required("category_id is required")
            .uuid("invalid category id"),
    )
});

static DELETE_PRODUCT: Lazy<Schema> = Lazy::new(|| {
    Schema::new().field(
        Field::query("product_id")
            .required("product_id is required")
            .uuid("invalid product id"),
    )
});

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RequestSchema for CreateUserRequest {
    fn schema() -> &'static Schema {
        &CREATE_USER
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub email: String,
    pub password: String,
}

impl RequestSchema for CreateSessionRequest {
    fn schema() -> &'static Schema {
        &CREATE_SESSION
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

impl RequestSchema for CreateCategoryRequest {
    fn schema() -> &'static Schema {
        &CREATE_CATEGORY
    }
}

/// Text parts of the multipart product form. The image travels separately.
#[derive(Debug, Deserialize)]
pub struct CreateProductForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub category_id: Uuid,
}

impl RequestSchema for CreateProductForm {
    fn schema() -> &'static Schema {
        &CREATE_PRODUCT
    }
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub disabled: Option<String>,
}

impl ListProductsQuery {
    pub fn disabled(&self) -> bool {
        self.disabled.as_deref() == Some("true")
    }
}

impl RequestSchema for ListProductsQuery {
    fn schema() -> &'static Schema {
        &LIST_PRODUCTS
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryProductsQuery {
    pub category_id: Uuid,
}

impl RequestSchema for CategoryProductsQuery {
    fn schema() -> &'static Schema {
        &CATEGORY_PRODUCTS
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteProductQuery {
    pub product_id: Uuid,
}

impl RequestSchema for DeleteProductQuery {
    fn schema() -> &'static Schema {
        &DELETE_PRODUCT
    }
}
