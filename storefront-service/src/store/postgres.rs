use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_security::Role;
use sqlx::{query, query_as, FromRow, PgPool};
use uuid::Uuid;

use super::{
    CatalogRepository, Category, CategorySummary, DisableOutcome, NewProductRecord, NewUserRecord,
    Product, ProductListing, StoreError, StoreResult, UserRecord, UserRepository,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";
const PRODUCT_COLUMNS: &str =
    "id, name, price, description, banner, disabled, category_id, created_at";
const LISTING_SELECT: &str = "SELECT p.id, p.name, p.price, p.description, p.banner, p.disabled, p.category_id, p.created_at, c.name AS category_name
     FROM products p
     JOIN categories c ON c.id = p.category_id";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|err| StoreError::Database(err.to_string()))?;
        Ok(UserRecord {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: i32,
    description: String,
    banner: String,
    disabled: bool,
    category_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            description: row.description,
            banner: row.banner,
            disabled: row.disabled,
            category_id: row.category_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: String,
}

impl From<ListingRow> for ProductListing {
    fn from(row: ListingRow) -> Self {
        let product = Product::from(row.product);
        let category = CategorySummary {
            id: product.category_id,
            name: row.category_name,
        };
        ProductListing { product, category }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let row = query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn insert_user(&self, user: NewUserRecord) -> StoreResult<UserRecord> {
        let row = query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(db_error)?;
        UserRecord::try_from(row)
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = query_as::<_, CategoryRow>(
            "SELECT id, name, created_at FROM categories ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let row = query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row = query_as::<_, CategoryRow>("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_error)?;
        Ok(row.map(Category::from))
    }

    async fn insert_product(&self, product: NewProductRecord) -> StoreResult<Product> {
        let row = query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (id, name, price, description, banner, category_id) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.price)
        .bind(product.description)
        .bind(product.banner)
        .bind(product.category_id)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn list_products(&self, disabled: bool) -> StoreResult<Vec<ProductListing>> {
        let rows = query_as::<_, ListingRow>(&format!(
            "{LISTING_SELECT} WHERE p.disabled = $1 ORDER BY p.created_at DESC"
        ))
        .bind(disabled)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(ProductListing::from).collect())
    }

    async fn list_products_by_category(&self, category_id: Uuid) -> StoreResult<Vec<ProductListing>> {
        let rows = query_as::<_, ListingRow>(&format!(
            "{LISTING_SELECT} WHERE p.category_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(category_id)
        .fetch_all(&self.db)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(ProductListing::from).collect())
    }

    async fn disable_product(&self, id: Uuid) -> StoreResult<DisableOutcome> {
        let result = query("UPDATE products SET disabled = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            Ok(DisableOutcome::NotFound)
        } else {
            Ok(DisableOutcome::Disabled)
        }
    }
}
