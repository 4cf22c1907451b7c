//! Category service
//!
//! Implements business logic for article categories:
//! - Create, read, update, delete categories
//! - Display order and reordering
//! - Restoring the default categories
//!
//! Posts reference categories by slug, so a category still used by posts can
//! be neither deleted nor re-slugged.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput, DEFAULT_CATEGORIES};
use crate::services::validation::{char_len, is_valid_slug, non_blank};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for categories
const CATEGORY_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:all";
const CACHE_NAMESPACE: &str = "categories";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Catégorie introuvable")]
    NotFound(String),

    #[error("Une catégorie avec ce slug existe déjà")]
    DuplicateSlug(String),

    /// The category is referenced by posts
    #[error("{0}")]
    InUse(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for journal categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    /// Create a new category service
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self::with_cache_ttl(repo, posts, cache, Duration::from_secs(CATEGORY_CACHE_TTL_SECS))
    }

    /// Create a new category service with custom cache TTL
    pub fn with_cache_ttl(
        repo: Arc<dyn CategoryRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            posts,
            cache,
            cache_ttl,
        }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` for an empty or too long slug, label or color
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let slug = input.slug.trim().to_string();
        let label = input.label.trim().to_string();
        let color = input.color.trim().to_string();
        validate_fields(&slug, &label, &color)?;

        if self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute category order")?,
        };

        let now = Utc::now();
        let category = Category {
            id: 0,
            slug,
            label,
            description: non_blank(input.description),
            color,
            icon: non_blank(input.icon),
            sort_order,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&category).await.context("Failed to create category")?;

        self.invalidate_cache().await;

        Ok(created)
    }

    /// Get category by ID
    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, CategoryServiceError> {
        let categories = self.list().await?;
        Ok(categories.into_iter().find(|c| c.slug == slug))
    }

    /// List all categories in display order
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(categories) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(categories);
        }

        let categories = self.repo.list().await.context("Failed to list categories")?;
        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_LIST, &categories, self.cache_ttl)
            .await;

        Ok(categories)
    }

    /// Partial update. Absent fields keep their value.
    pub async fn update(&self, id: i64, input: UpdateCategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.get(id).await?;

        if let Some(slug) = input.slug {
            let slug = slug.trim().to_string();
            if slug != category.slug {
                if self
                    .repo
                    .get_by_slug(&slug)
                    .await
                    .context("Failed to check slug uniqueness")?
                    .is_some()
                {
                    return Err(CategoryServiceError::DuplicateSlug(slug));
                }
                self.ensure_unused(&category.slug, "Impossible de modifier le slug d'une catégorie utilisée par des articles")
                    .await?;
                category.slug = slug;
            }
        }
        if let Some(label) = input.label {
            category.label = label.trim().to_string();
        }
        if let Some(color) = input.color {
            category.color = color.trim().to_string();
        }
        if let Some(description) = input.description {
            category.description = non_blank(description);
        }
        if let Some(icon) = input.icon {
            category.icon = non_blank(icon);
        }
        if let Some(order) = input.sort_order {
            category.sort_order = order;
        }
        validate_fields(&category.slug, &category.label, &category.color)?;

        category.updated_at = Utc::now();
        let updated = self.repo.update(&category).await.context("Failed to update category")?;

        self.invalidate_cache().await;

        Ok(updated)
    }

    /// Delete a category that no post uses
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.get(id).await?;
        self.ensure_unused(&category.slug, "Impossible de supprimer une catégorie qui contient des articles")
            .await?;

        self.repo.delete(id).await.context("Failed to delete category")?;

        self.invalidate_cache().await;

        Ok(())
    }

    /// Apply a new display order: the position in `ids` becomes the order
    pub async fn reorder(&self, ids: &[i64]) -> Result<(), CategoryServiceError> {
        self.repo.reorder(ids).await.context("Failed to reorder categories")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Insert the default categories that are missing.
    ///
    /// Existing categories are left untouched. Returns how many were inserted.
    pub async fn seed_defaults(&self) -> Result<usize, CategoryServiceError> {
        let mut inserted = 0;
        for (index, default) in DEFAULT_CATEGORIES.iter().enumerate() {
            if self
                .repo
                .insert_default(default, index as i32)
                .await
                .context("Failed to seed category")?
            {
                inserted += 1;
            }
        }

        tracing::info!("Seeded {} default categories", inserted);
        self.invalidate_cache().await;

        Ok(inserted)
    }

    async fn ensure_unused(&self, slug: &str, message: &str) -> Result<(), CategoryServiceError> {
        let count = self
            .posts
            .count_by_category(slug)
            .await
            .context("Failed to count category posts")?;
        if count > 0 {
            return Err(CategoryServiceError::InUse(message.to_string()));
        }
        Ok(())
    }

    /// Invalidate all category-related cache entries
    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate_fields(slug: &str, label: &str, color: &str) -> Result<(), CategoryServiceError> {
    let invalid = |msg: &str| Err(CategoryServiceError::ValidationError(msg.to_string()));

    if slug.is_empty() {
        return invalid("Le slug est requis");
    }
    if char_len(slug) > 100 || !is_valid_slug(slug) {
        return invalid("Slug invalide");
    }
    if label.is_empty() {
        return invalid("Le libellé est requis");
    }
    if char_len(label) > 200 {
        return invalid("Le libellé ne peut pas dépasser 200 caractères");
    }
    if color.is_empty() {
        return invalid("La couleur est requise");
    }
    Ok(())
}
