use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, DomainError, DomainResult, Entity};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 200;

/// Upper bound on the ancestor chain walked when validating a parent change.
pub const MAX_CATEGORY_DEPTH: usize = 32;

/// Catalog category. Categories form a tree through `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<CategoryId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Category {
    pub fn create(id: CategoryId, draft: CategoryDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            parent: draft.parent,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, draft: CategoryDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.parent = draft.parent;
        self.is_active = draft.is_active;
        self.updated_at = now;
    }

    pub fn to_ref(&self) -> CategoryRef {
        CategoryRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Minimal projection of a category: identity plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
}

/// Raw category payload as received over the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<CategoryId>,
    pub is_active: bool,
}

impl CategoryInput {
    pub fn validate(self) -> DomainResult<CategoryDraft> {
        let mut errors = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let name_len = name.chars().count();
        if name_len == 0 {
            errors.push("name is required".to_string());
        } else if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
            errors.push(format!(
                "name must be between {NAME_MIN} and {NAME_MAX} characters"
            ));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX)
        {
            errors.push(format!(
                "description must be at most {DESCRIPTION_MAX} characters"
            ));
        }

        let parent = match self.parent_category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<CategoryId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("parentCategory must be a valid id".to_string());
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(DomainError::validation_many(errors));
        }

        Ok(CategoryDraft {
            name: name.to_string(),
            description,
            parent,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Check that giving `category` the parent `new_parent` keeps the tree acyclic.
///
/// Walks the ancestor chain of `new_parent` through `parent_of`, at most
/// [`MAX_CATEGORY_DEPTH`] steps. A chain that revisits a node it already saw
/// (a pre-existing cycle) or that is longer than the bound is rejected too.
pub fn ensure_acyclic<F>(
    category: CategoryId,
    new_parent: Option<CategoryId>,
    parent_of: F,
) -> DomainResult<()>
where
    F: Fn(CategoryId) -> Option<CategoryId>,
{
    let mut seen = HashSet::new();
    let mut cursor = new_parent;
    let mut depth = 0;

    while let Some(current) = cursor {
        if current == category {
            return Err(DomainError::invariant(
                "category hierarchy would form a cycle",
            ));
        }
        if !seen.insert(current) {
            return Err(DomainError::invariant(
                "category hierarchy already contains a cycle",
            ));
        }
        depth += 1;
        if depth > MAX_CATEGORY_DEPTH {
            return Err(DomainError::invariant(format!(
                "category hierarchy exceeds maximum depth of {MAX_CATEGORY_DEPTH}"
            )));
        }
        cursor = parent_of(current);
    }

    Ok(())
}
