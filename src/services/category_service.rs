use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use super::ServiceResult;
use crate::api::categories::{CategoryRequest, CategoryResponse};
use crate::database::models::{Category, NewCategory};
use crate::database::{CategoryStore, Store};
use crate::error::ApiError;
use crate::state::AppState;

pub struct CategoryService {
    store: Arc<dyn Store>,
}

impl CategoryService {
    pub fn new(state: &AppState) -> Self {
        Self { store: state.store.clone() }
    }

    /// The whole catalog as a forest: roots first, children nested, each
    /// level ordered by name.
    pub async fn tree(&self) -> ServiceResult<Vec<CategoryResponse>> {
        let categories = self.store.list_categories().await?;
        Ok(build_forest(categories))
    }

    /// Category with its direct children
    pub async fn get(&self, id: i64) -> ServiceResult<CategoryResponse> {
        let category = self.find(id).await?;
        let children = self.store.list_subcategories(id).await?;
        Ok(CategoryResponse::with_children(
            category,
            children.into_iter().map(CategoryResponse::from).collect(),
        ))
    }

    pub async fn subcategories(&self, id: i64) -> ServiceResult<Vec<Category>> {
        self.find(id).await?;
        Ok(self.store.list_subcategories(id).await?)
    }

    pub async fn create(&self, request: CategoryRequest) -> ServiceResult<Category> {
        let name = request.name.trim().to_string();
        if let Some(parent_id) = request.parent_id {
            self.find_parent(parent_id).await?;
        }
        self.ensure_unique_sibling(&name, request.parent_id, None).await?;

        let category = self
            .store
            .insert_category(NewCategory {
                name,
                description: request.description,
                parent_id: request.parent_id,
            })
            .await?;
        info!("Created category '{}' ({})", category.name, category.id);
        Ok(category)
    }

    pub async fn update(&self, id: i64, request: CategoryRequest) -> ServiceResult<Category> {
        let mut category = self.find(id).await?;
        let name = request.name.trim().to_string();

        if let Some(parent_id) = request.parent_id {
            if parent_id == id {
                return Err(ApiError::bad_request("A category cannot be its own parent"));
            }
            self.find_parent(parent_id).await?;
            if self.is_descendant(parent_id, id).await? {
                return Err(ApiError::bad_request(
                    "A category cannot be moved under one of its own subcategories",
                ));
            }
        }
        self.ensure_unique_sibling(&name, request.parent_id, Some(id)).await?;

        category.name = name;
        category.description = request.description;
        category.parent_id = request.parent_id;
        Ok(self.store.save_category(&category).await?)
    }

    /// Only leaf categories no expense refers to can be deleted
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.find(id).await?;

        if !self.store.list_subcategories(id).await?.is_empty() {
            return Err(ApiError::bad_request("Cannot delete a category that has subcategories"));
        }
        let in_use = self.store.count_category_expenses(id).await?;
        if in_use > 0 {
            return Err(ApiError::bad_request(format!(
                "Cannot delete a category used by {} expense(s)",
                in_use
            )));
        }

        self.store.delete_category(id).await?;
        info!("Deleted category {}", id);
        Ok(())
    }

    async fn find(&self, id: i64) -> ServiceResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Category not found with id: {}", id)))
    }

    async fn find_parent(&self, parent_id: i64) -> ServiceResult<Category> {
        self.store
            .find_category(parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Parent category not found with id: {}", parent_id)))
    }

    /// Whether `candidate` sits somewhere below `ancestor`
    async fn is_descendant(&self, candidate: i64, ancestor: i64) -> ServiceResult<bool> {
        let mut seen = HashSet::new();
        let mut current = Some(candidate);

        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            if !seen.insert(id) {
                break;
            }
            current = self.store.find_category(id).await?.and_then(|c| c.parent_id);
        }
        Ok(false)
    }

    async fn ensure_unique_sibling(&self, name: &str, parent_id: Option<i64>, exclude: Option<i64>) -> ServiceResult<()> {
        let siblings = match parent_id {
            Some(parent_id) => self.store.list_subcategories(parent_id).await?,
            None => self
                .store
                .list_categories()
                .await?
                .into_iter()
                .filter(|c| c.parent_id.is_none())
                .collect(),
        };

        let lowered = name.to_lowercase();
        let taken = siblings
            .iter()
            .any(|c| Some(c.id) != exclude && c.name.to_lowercase() == lowered);
        if taken {
            return Err(ApiError::conflict(format!("Category '{}' already exists at this level", name)));
        }
        Ok(())
    }
}

/// Nest a flat, name-ordered category list
fn build_forest(categories: Vec<Category>) -> Vec<CategoryResponse> {
    let mut by_parent: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
    for category in categories {
        by_parent.entry(category.parent_id).or_default().push(category);
    }

    fn attach(parent: Option<i64>, by_parent: &mut HashMap<Option<i64>, Vec<Category>>) -> Vec<CategoryResponse> {
        let Some(level) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|category| {
                let children = attach(Some(category.id), by_parent);
                CategoryResponse::with_children(category, children)
            })
            .collect()
    }

    attach(None, &mut by_parent)
}
