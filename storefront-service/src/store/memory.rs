use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    CatalogRepository, Category, CategorySummary, DisableOutcome, NewProductRecord, NewUserRecord,
    Product, ProductListing, StoreError, StoreResult, UserRecord, UserRepository,
};

#[derive(Default)]
struct State {
    users: Vec<UserRecord>,
    categories: Vec<Category>,
    products: Vec<Product>,
}

impl State {
    fn listing(&self, product: &Product) -> ProductListing {
        let name = self
            .categories
            .iter()
            .find(|c| c.id == product.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        ProductListing {
            product: product.clone(),
            category: CategorySummary { id: product.category_id, name },
        }
    }
}

/// Process-local store backing tests and local runs without Postgres.
/// Rows are kept in insertion order and read back newest first.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: NewUserRecord) -> StoreResult<UserRecord> {
        let mut state = self.state.write().expect("store rwlock poisoned");
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state.categories.iter().rev().cloned().collect())
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let mut state = self.state.write().expect("store rwlock poisoned");
        let category = Category { id: Uuid::new_v4(), name: name.to_string(), created_at: Utc::now() };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProductRecord) -> StoreResult<Product> {
        let mut state = self.state.write().expect("store rwlock poisoned");
        if !state.categories.iter().any(|c| c.id == product.category_id) {
            return Err(StoreError::Database(format!(
                "category {} does not exist",
                product.category_id
            )));
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            price: product.price,
            description: product.description,
            banner: product.banner,
            disabled: false,
            category_id: product.category_id,
            created_at: Utc::now(),
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn list_products(&self, disabled: bool) -> StoreResult<Vec<ProductListing>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state
            .products
            .iter()
            .rev()
            .filter(|p| p.disabled == disabled)
            .map(|p| state.listing(p))
            .collect())
    }

    async fn list_products_by_category(&self, category_id: Uuid) -> StoreResult<Vec<ProductListing>> {
        let state = self.state.read().expect("store rwlock poisoned");
        Ok(state
            .products
            .iter()
            .rev()
            .filter(|p| p.category_id == category_id)
            .map(|p| state.listing(p))
            .collect())
    }

    async fn disable_product(&self, id: Uuid) -> StoreResult<DisableOutcome> {
        let mut state = self.state.write().expect("store rwlock poisoned");
        match state.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.disabled = true;
                Ok(DisableOutcome::Disabled)
            }
            None => Ok(DisableOutcome::NotFound),
        }
    }
}
