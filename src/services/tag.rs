//! Tag service
//!
//! Tags offered in the post editor:
//! - Create with a given or generated slug
//! - Partial update (the slug follows a renamed tag)
//! - Batch creation that skips existing names and slugs
//!
//! The tag list is cached under `tags:all`.

use crate::cache::Cache;
use crate::db::repositories::TagRepository;
use crate::models::{CreateTagInput, Tag, UpdateTagInput};
use crate::services::validation::{char_len, is_valid_slug};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Default cache TTL for the tag list
const TAG_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_TAGS: &str = "tags:all";
const CACHE_NAMESPACE: &str = "tags";

const MAX_NAME_LEN: usize = 100;
const MAX_SLUG_LEN: usize = 100;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag introuvable")]
    NotFound(i64),

    #[error("{0}")]
    ValidationError(String),

    /// Name or slug already taken
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(TAG_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn TagRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        let tags = self
            .cache
            .get_or_load(CACHE_KEY_TAGS, self.cache_ttl, || async {
                self.repo.list().await.context("Failed to list tags")
            })
            .await?;
        Ok(tags)
    }

    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or(TagServiceError::NotFound(id))
    }

    /// Create a tag. The slug is generated from the name when not given.
    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        let name = validate_name(&input.name)?;
        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => generate_slug(&name),
        };
        validate_slug(&slug)?;

        self.ensure_available(&name, &slug, None).await?;

        let color = input.color.filter(|c| !c.trim().is_empty());
        let created = self
            .repo
            .create(&Tag::new(name, slug, color))
            .await
            .context("Failed to create tag")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Partial update.
    ///
    /// A new name without an explicit slug regenerates the slug.
    pub async fn update(&self, id: i64, input: UpdateTagInput) -> Result<Tag, TagServiceError> {
        let mut tag = self.get(id).await?;

        if let Some(name) = input.name {
            let name = validate_name(&name)?;
            if name != tag.name && input.slug.is_none() {
                tag.slug = generate_slug(&name);
            }
            tag.name = name;
        }
        if let Some(slug) = input.slug {
            tag.slug = slug.trim().to_string();
        }
        validate_slug(&tag.slug)?;
        if let Some(color) = input.color {
            tag.color = color.filter(|c| !c.trim().is_empty());
        }

        self.ensure_available(&tag.name, &tag.slug, Some(id)).await?;

        let updated = self.repo.update(&tag).await.context("Failed to update tag")?;
        self.invalidate_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete tag")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Create a tag per name, skipping names or slugs that already exist.
    ///
    /// Returns how many tags were created.
    pub async fn create_many(&self, names: &[String]) -> Result<usize, TagServiceError> {
        let mut seen = HashSet::new();
        let mut created = 0;

        for raw in names {
            let name = raw.trim();
            if name.is_empty() || char_len(name) > MAX_NAME_LEN {
                continue;
            }
            let slug = generate_slug(name);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }

            if self.repo.get_by_name(name).await.context("Failed to check tag name")?.is_some()
                || self.repo.get_by_slug(&slug).await.context("Failed to check tag slug")?.is_some()
            {
                continue;
            }

            self.repo
                .create(&Tag::new(name.to_string(), slug, None))
                .await
                .context("Failed to create tag")?;
            created += 1;
        }

        if created > 0 {
            self.invalidate_cache().await;
        }
        Ok(created)
    }

    async fn ensure_available(
        &self,
        name: &str,
        slug: &str,
        current: Option<i64>,
    ) -> Result<(), TagServiceError> {
        let taken_by_other = |tag: Option<Tag>| tag.is_some_and(|t| Some(t.id) != current);

        if taken_by_other(self.repo.get_by_name(name).await.context("Failed to check tag name")?) {
            return Err(TagServiceError::Conflict(
                "Un tag avec ce nom existe déjà".to_string(),
            ));
        }
        if taken_by_other(self.repo.get_by_slug(slug).await.context("Failed to check tag slug")?) {
            return Err(TagServiceError::Conflict(
                "Un tag avec ce slug existe déjà".to_string(),
            ));
        }
        Ok(())
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate_name(name: &str) -> Result<String, TagServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagServiceError::ValidationError("Le nom est requis".to_string()));
    }
    if char_len(name) > MAX_NAME_LEN {
        return Err(TagServiceError::ValidationError(format!(
            "Le nom ne peut pas dépasser {} caractères",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_slug(slug: &str) -> Result<(), TagServiceError> {
    if slug.is_empty() {
        return Err(TagServiceError::ValidationError("Le slug est requis".to_string()));
    }
    if char_len(slug) > MAX_SLUG_LEN || !is_valid_slug(slug) {
        return Err(TagServiceError::ValidationError("Slug invalide".to_string()));
    }
    Ok(())
}

/// Generate a URL-friendly slug from a name.
///
/// Lowercases, decomposes (NFD) and drops combining marks so any accented
/// letter keeps its base letter, expands the œ/æ/ß ligatures, turns every run
/// of other characters into a single `-` and trims hyphens at both ends.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        let mut buf = [0u8; 4];
        let part = match c {
            'a'..='z' | '0'..='9' => Some(&*c.encode_utf8(&mut buf)),
            'æ' => Some("ae"),
            'œ' => Some("oe"),
            'ß' => Some("ss"),
            _ => None,
        };

        match part {
            Some(part) => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push_str(part);
            }
            None => pending_hyphen = true,
        }
    }

    slug
}
