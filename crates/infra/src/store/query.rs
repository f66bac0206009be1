//! Product listing criteria and paginated results.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;

use catalog_core::CategoryId;
use catalog_products::{Product, ResolvedProduct};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Page/limit pagination (1-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Zero or missing values fall back to the defaults; `limit` is capped.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(DEFAULT_LIMIT)
                .min(MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    Name,
    BasePrice,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "basePrice" => Ok(Self::BasePrice),
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            other => Err(format!("unsupported sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unsupported sort order: {other}")),
        }
    }
}

/// Listing criteria for products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring over name, description and tags.
    pub search: Option<String>,
    pub category: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub is_active: bool,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub pagination: Pagination,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            featured: None,
            is_active: true,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            pagination: Pagination::default(),
        }
    }
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if product.is_active != self.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != product.category) {
            return false;
        }
        if self.featured.is_some_and(|f| f != product.featured) {
            return false;
        }
        if self.min_price.is_some_and(|min| product.base_price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.base_price > max) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => product.matches_text(needle),
            _ => true,
        }
    }

    /// Ordering for the requested sort; ties are broken by id.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.sort_by {
            SortField::Name => a.name.cmp(&b.name),
            SortField::BasePrice => a.base_price.cmp(&b.base_price),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.sort_order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        }
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub items: Vec<ResolvedProduct>,
    /// Number of products matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
}

impl ProductPage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.pagination.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(Some(3), Some(500)).limit, 100);
        assert_eq!(Pagination::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn sort_parsing() {
        assert_eq!("basePrice".parse::<SortField>(), Ok(SortField::BasePrice));
        assert!("price".parse::<SortField>().is_err());
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = ProductPage {
            items: Vec::new(),
            total: 21,
            pagination: Pagination::new(Some(1), Some(10)),
        };
        assert_eq!(page.total_pages(), 3);

        let empty = ProductPage { total: 0, ..page };
        assert_eq!(empty.total_pages(), 0);
    }
}
