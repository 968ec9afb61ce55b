//! Persistence collaborators. Every lookup reports a missing row as a
//! sentinel (`None`, [`DisableOutcome::NotFound`]) and keeps `Err` for
//! failures of the store itself.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_security::{Role, RoleDirectory, SecurityError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewProductRecord {
    pub name: String,
    pub price: i32,
    pub description: String,
    pub banner: String,
    pub category_id: Uuid,
}

/// A product row. `disabled` hides it from the default listing without
/// removing it.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i32,
    pub description: String,
    pub banner: String,
    pub disabled: bool,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub category: CategorySummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled,
    NotFound,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;
    /// Fails with [`StoreError::Conflict`] when the email is already registered.
    async fn insert_user(&self, user: NewUserRecord) -> StoreResult<UserRecord>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Newest first.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, name: &str) -> StoreResult<Category>;
    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn insert_product(&self, product: NewProductRecord) -> StoreResult<Product>;
    /// Products whose `disabled` flag equals `disabled`, newest first.
    async fn list_products(&self, disabled: bool) -> StoreResult<Vec<ProductListing>>;
    /// Every product of one category regardless of `disabled`, newest first.
    async fn list_products_by_category(&self, category_id: Uuid) -> StoreResult<Vec<ProductListing>>;
    async fn disable_product(&self, id: Uuid) -> StoreResult<DisableOutcome>;
}

/// Answers role-gate lookups from the user table.
pub struct AccountRoles {
    users: Arc<dyn UserRepository>,
}

impl AccountRoles {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RoleDirectory for AccountRoles {
    async fn role_of(&self, subject: Uuid) -> Result<Option<Role>, SecurityError> {
        self.users
            .find_by_id(subject)
            .await
            .map(|user| user.map(|user| user.role))
            .map_err(|err| SecurityError::Directory(err.to_string()))
    }
}
