//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `Conflict` | Duplicate SKU or id |
//! | `23503` (foreign key violation) | `InvalidReference` | Unknown parent category |
//! | Any other / non-database | `Backend` | Connection, decoding, check constraints |
//!
//! Variants live in their own table so that SKU uniqueness is a plain
//! `UNIQUE` constraint. Product writes replace the variant rows inside one
//! transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use catalog_core::{CategoryId, ProductId, VariantId};
use catalog_products::{Category, CategoryRef, Product, ResolvedProduct, Variant};

use super::{
    CategoryStore, ProductPage, ProductQuery, ProductStore, SortField, SortOrder, StoreError,
    StoreResult,
};

const SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");
const SKU_CONSTRAINT: &str = "product_variants_sku_key";

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id,
        p.name,
        p.description,
        p.category_id,
        p.base_price,
        p.discount_percentage,
        p.images,
        p.tags,
        p.is_active,
        p.featured,
        p.created_at,
        p.updated_at,
        c.id AS resolved_category_id,
        c.name AS resolved_category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const CATEGORY_SELECT: &str = r#"
    SELECT id, name, description, parent_id, is_active, created_at, updated_at
    FROM categories
"#;

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Attach variants to product rows, keeping row order.
    async fn hydrate(&self, rows: Vec<ProductRow>) -> StoreResult<Vec<ResolvedProduct>> {
        let mut products: Vec<ResolvedProduct> = rows.into_iter().map(ResolvedProduct::from).collect();

        let ids: Vec<Uuid> = products.iter().map(|p| p.product.id.as_uuid()).collect();
        let mut variants = self.load_variants(ids).await?;

        for resolved in &mut products {
            if let Some(list) = variants.remove(&resolved.product.id.as_uuid()) {
                resolved.product.variants = list;
            }
        }
        Ok(products)
    }

    async fn load_variants(&self, product_ids: Vec<Uuid>) -> StoreResult<HashMap<Uuid, Vec<Variant>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT id, product_id, name, value, price, stock, sku
            FROM product_variants
            WHERE product_id = ANY($1)
            ORDER BY product_id, position
            "#,
        )
        .bind(product_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_variants", e))?;

        let mut grouped: HashMap<Uuid, Vec<Variant>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(Variant::from(row));
        }
        Ok(grouped)
    }
}

async fn insert_variants(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
) -> StoreResult<()> {
    for (position, variant) in product.variants.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, position, name, value, price, stock, sku)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(variant.id.as_uuid())
        .bind(product.id.as_uuid())
        .bind(position as i32)
        .bind(&variant.name)
        .bind(&variant.value)
        .bind(variant.price)
        .bind(variant.stock)
        .bind(&variant.sku)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_variant", e))?;
    }
    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE p.is_active = ").push_bind(query.is_active);

    if let Some(category) = query.category {
        builder.push(" AND p.category_id = ").push_bind(category.as_uuid());
    }
    if let Some(featured) = query.featured {
        builder.push(" AND p.featured = ").push_bind(featured);
    }
    if let Some(min) = query.min_price {
        builder.push(" AND p.base_price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND p.base_price <= ").push_bind(max);
    }
    if let Some(needle) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(needle));
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(p.tags) AS t(tag) WHERE t.tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn order_clause(query: &ProductQuery) -> String {
    let column = match query.sort_by {
        SortField::Name => "p.name",
        SortField::BasePrice => "p.base_price",
        SortField::CreatedAt => "p.created_at",
        SortField::UpdatedAt => "p.updated_at",
    };
    let direction = match query.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {column} {direction}, p.id {direction}")
}

#[async_trait::async_trait]
impl ProductStore for PostgresCatalogStore {
    #[instrument(skip(self, query), err)]
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let pagination = query.pagination;
        let mut select = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        push_filters(&mut select, query);
        select
            .push(order_clause(query))
            .push(" LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build_query_as::<ProductRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Ok(ProductPage {
            items: self.hydrate(rows).await?,
            total: total.max(0) as u64,
            pagination,
        })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ResolvedProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category_id, base_price, discount_percentage,
                images, tags, is_active, featured, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category.as_uuid())
        .bind(product.base_price)
        .bind(product.discount_percentage)
        .bind(&product.images)
        .bind(&product.tags)
        .bind(product.is_active)
        .bind(product.featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        insert_variants(&mut tx, &product).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: Product) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                category_id = $4,
                base_price = $5,
                discount_percentage = $6,
                images = $7,
                tags = $8,
                is_active = $9,
                featured = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category.as_uuid())
        .bind(product.base_price)
        .bind(product.discount_percentage)
        .bind(&product.images)
        .bind(&product.tags)
        .bind(product.is_active)
        .bind(product.featured)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
            .bind(product.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_variants", e))?;

        insert_variants(&mut tx, &product).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn find_active_with_category(&self) -> StoreResult<Vec<ResolvedProduct>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.is_active ORDER BY p.created_at ASC, p.id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active_with_category", e))?;

        self.hydrate(rows).await
    }

    #[instrument(skip(self), fields(category_id = %category), err)]
    async fn count_products_in_category(&self, category: CategoryId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(category.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products_in_category", e))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait::async_trait]
impl CategoryStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_SELECT} WHERE is_active ORDER BY name, id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_active_categories", e))?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!("{CATEGORY_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;

        Ok(row.map(Category::from))
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, parent_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent.map(|p| p.as_uuid()))
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = $2,
                description = $3,
                parent_id = $4,
                is_active = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent.map(|p| p.as_uuid()))
        .bind(category.is_active)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn category_parents(&self) -> StoreResult<HashMap<CategoryId, CategoryId>> {
        let rows: Vec<(Uuid, Uuid)> =
            sqlx::query_as("SELECT id, parent_id FROM categories WHERE parent_id IS NOT NULL")
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("category_parents", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, parent)| (CategoryId::from_uuid(id), CategoryId::from_uuid(parent)))
            .collect())
    }
}

// -------------------------
// Row types
// -------------------------

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    category_id: Uuid,
    base_price: Decimal,
    discount_percentage: Decimal,
    images: Vec<String>,
    tags: Vec<String>,
    is_active: bool,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_category_id: Option<Uuid>,
    resolved_category_name: Option<String>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category_id: row.try_get("category_id")?,
            base_price: row.try_get("base_price")?,
            discount_percentage: row.try_get("discount_percentage")?,
            images: row.try_get("images")?,
            tags: row.try_get("tags")?,
            is_active: row.try_get("is_active")?,
            featured: row.try_get("featured")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            resolved_category_id: row.try_get("resolved_category_id")?,
            resolved_category_name: row.try_get("resolved_category_name")?,
        })
    }
}

/// Variants are attached later by `hydrate`; a dangling category resolves to `None`.
impl From<ProductRow> for ResolvedProduct {
    fn from(row: ProductRow) -> Self {
        let category = match (row.resolved_category_id, row.resolved_category_name) {
            (Some(id), Some(name)) => Some(CategoryRef {
                id: CategoryId::from_uuid(id),
                name,
            }),
            _ => None,
        };

        let product = Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            category: CategoryId::from_uuid(row.category_id),
            base_price: row.base_price,
            discount_percentage: row.discount_percentage,
            variants: Vec::new(),
            images: row.images,
            tags: row.tags,
            is_active: row.is_active,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        ResolvedProduct::new(product, category)
    }
}

#[derive(Debug)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    value: String,
    price: Decimal,
    stock: i64,
    sku: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for VariantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(VariantRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            value: row.try_get("value")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            sku: row.try_get("sku")?,
        })
    }
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            id: VariantId::from_uuid(row.id),
            name: row.name,
            value: row.value,
            price: row.price,
            stock: row.stock,
            sku: row.sku,
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    parent_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            parent_id: row.try_get("parent_id")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            parent: row.parent_id.map(CategoryId::from_uuid),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") if db_err.constraint() == Some(SKU_CONSTRAINT) => {
                    StoreError::Conflict("duplicate SKU".to_string())
                }
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::InvalidReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
