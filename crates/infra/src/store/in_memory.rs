use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use catalog_core::{CategoryId, Entity, ProductId};
use catalog_products::{Category, Product, ResolvedProduct};

use super::{CategoryStore, ProductPage, ProductQuery, ProductStore, StoreError, StoreResult};

/// In-memory catalog for tests/dev.
///
/// Implements both [`ProductStore`] and [`CategoryStore`] over one pair of
/// maps so product reads can resolve their category.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    categories: RwLock<HashMap<CategoryId, Category>>,
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_categories(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<CategoryId, Category>>> {
        self.categories.read().map_err(|_| poisoned())
    }

    fn write_categories(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<CategoryId, Category>>> {
        self.categories.write().map_err(|_| poisoned())
    }

    fn read_products(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<ProductId, Product>>> {
        self.products.read().map_err(|_| poisoned())
    }

    fn write_products(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<ProductId, Product>>> {
        self.products.write().map_err(|_| poisoned())
    }

    fn resolve(categories: &HashMap<CategoryId, Category>, product: &Product) -> ResolvedProduct {
        let category = categories.get(&product.category).map(Category::to_ref);
        ResolvedProduct::new(product.clone(), category)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

/// SKUs must be unique across the catalog, including within `candidate`.
fn ensure_unique_skus(products: &HashMap<ProductId, Product>, candidate: &Product) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for variant in &candidate.variants {
        if !seen.insert(variant.sku.as_str()) {
            return Err(duplicate_sku(&variant.sku));
        }
    }

    let clash = products
        .values()
        .filter(|p| p.id != candidate.id)
        .flat_map(|p| p.variants.iter())
        .find(|v| seen.contains(v.sku.as_str()));

    match clash {
        Some(v) => Err(duplicate_sku(&v.sku)),
        None => Ok(()),
    }
}

fn ensure_parent_exists(
    categories: &HashMap<CategoryId, Category>,
    category: &Category,
) -> StoreResult<()> {
    match category.parent {
        Some(parent) if !categories.contains_key(&parent) => Err(StoreError::InvalidReference(
            format!("parent category {parent}"),
        )),
        _ => Ok(()),
    }
}

fn insert_new<E: Entity>(map: &mut HashMap<E::Id, E>, entity: E) -> StoreResult<()> {
    let id = entity.key();
    if map.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{id} already exists")));
    }
    map.insert(id, entity);
    Ok(())
}

fn replace_existing<E: Entity>(map: &mut HashMap<E::Id, E>, entity: E) -> StoreResult<()> {
    match map.get_mut(&entity.key()) {
        Some(slot) => {
            *slot = entity;
            Ok(())
        }
        None => Err(StoreError::NotFound),
    }
}

fn duplicate_sku(sku: &str) -> StoreError {
    StoreError::Conflict(format!("duplicate SKU: {sku}"))
}

#[async_trait::async_trait]
impl ProductStore for InMemoryCatalogStore {
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<ProductPage> {
        let categories = self.read_categories()?;
        let products = self.read_products()?;

        let mut matching: Vec<&Product> = products.values().filter(|p| query.matches(p)).collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let pagination = query.pagination;
        let items = matching
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(pagination.limit as usize)
            .map(|p| Self::resolve(&categories, p))
            .collect();

        Ok(ProductPage {
            items,
            total,
            pagination,
        })
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ResolvedProduct>> {
        let categories = self.read_categories()?;
        let products = self.read_products()?;
        Ok(products.get(&id).map(|p| Self::resolve(&categories, p)))
    }

    async fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut products = self.write_products()?;
        ensure_unique_skus(&products, &product)?;
        insert_new(&mut products, product)
    }

    async fn update_product(&self, product: Product) -> StoreResult<()> {
        let mut products = self.write_products()?;
        if !products.contains_key(&product.id) {
            return Err(StoreError::NotFound);
        }
        ensure_unique_skus(&products, &product)?;
        replace_existing(&mut products, product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        Ok(self.write_products()?.remove(&id).is_some())
    }

    async fn find_active_with_category(&self) -> StoreResult<Vec<ResolvedProduct>> {
        let categories = self.read_categories()?;
        let products = self.read_products()?;

        let mut active: Vec<&Product> = products.values().filter(|p| p.is_active).collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(active
            .into_iter()
            .map(|p| Self::resolve(&categories, p))
            .collect())
    }

    async fn count_products_in_category(&self, category: CategoryId) -> StoreResult<u64> {
        let products = self.read_products()?;
        Ok(products.values().filter(|p| p.category == category).count() as u64)
    }
}

#[async_trait::async_trait]
impl CategoryStore for InMemoryCatalogStore {
    async fn list_active_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = self.read_categories()?;
        let mut active: Vec<Category> = categories.values().filter(|c| c.is_active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read_categories()?.get(&id).cloned())
    }

    async fn insert_category(&self, category: Category) -> StoreResult<()> {
        let mut categories = self.write_categories()?;
        ensure_parent_exists(&categories, &category)?;
        insert_new(&mut categories, category)
    }

    async fn update_category(&self, category: Category) -> StoreResult<()> {
        let mut categories = self.write_categories()?;
        ensure_parent_exists(&categories, &category)?;
        replace_existing(&mut categories, category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let mut categories = self.write_categories()?;
        if categories.remove(&id).is_none() {
            return Ok(false);
        }
        for child in categories.values_mut().filter(|c| c.parent == Some(id)) {
            child.parent = None;
        }
        Ok(true)
    }

    async fn category_parents(&self) -> StoreResult<HashMap<CategoryId, CategoryId>> {
        let categories = self.read_categories()?;
        Ok(categories
            .values()
            .filter_map(|c| c.parent.map(|parent| (c.id, parent)))
            .collect())
    }
}
