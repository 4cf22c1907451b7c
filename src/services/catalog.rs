//! Catalog service
//!
//! The organization's offerings (the `Service` entity) shown in the home
//! page carousel. Only active offerings are public; the public list is cached
//! under `services:public`.

use crate::cache::Cache;
use crate::db::repositories::ServiceRepository;
use crate::models::{Service, ServiceInput};
use crate::services::validation::{char_len, is_valid_slug};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const CATALOG_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_PUBLIC: &str = "services:public";
const CACHE_NAMESPACE: &str = "services";

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("Service introuvable")]
    NotFound(i64),

    #[error("{0}")]
    ValidationError(String),

    #[error("Un service avec ce slug existe déjà")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Offerings management
pub struct CatalogService {
    repo: Arc<dyn ServiceRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn ServiceRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(CATALOG_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn ServiceRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    /// Offerings by display order. The public list (active only) is cached.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Service>, CatalogServiceError> {
        if include_inactive {
            return Ok(self.repo.list(true).await.context("Failed to list services")?);
        }

        let services = self
            .cache
            .get_or_load(CACHE_KEY_PUBLIC, self.cache_ttl, || async {
                self.repo.list(false).await.context("Failed to list services")
            })
            .await?;
        Ok(services)
    }

    pub async fn get(&self, id: i64) -> Result<Service, CatalogServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get service")?
            .ok_or(CatalogServiceError::NotFound(id))
    }

    /// Create an offering, appended to the list when no order is given
    pub async fn create(&self, input: ServiceInput) -> Result<Service, CatalogServiceError> {
        let input = validate(input)?;
        self.ensure_slug_free(&input.slug, None).await?;

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute service order")?,
        };

        let now = Utc::now();
        let service = Service {
            id: 0,
            slug: input.slug,
            title: input.title,
            description: input.description,
            icon: input.icon,
            features: input.features,
            sort_order,
            active: input.active,
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&service).await.context("Failed to create service")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Replace the fields of an offering. An absent order keeps the current one.
    pub async fn update(&self, id: i64, input: ServiceInput) -> Result<Service, CatalogServiceError> {
        let mut service = self.get(id).await?;
        let input = validate(input)?;
        self.ensure_slug_free(&input.slug, Some(id)).await?;

        service.slug = input.slug;
        service.title = input.title;
        service.description = input.description;
        service.icon = input.icon;
        service.features = input.features;
        service.active = input.active;
        if let Some(order) = input.sort_order {
            service.sort_order = order;
        }
        service.updated_at = Utc::now();

        let updated = self.repo.update(&service).await.context("Failed to update service")?;

        self.invalidate_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CatalogServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete service")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Show or hide an offering on the public site
    pub async fn toggle_active(&self, id: i64) -> Result<Service, CatalogServiceError> {
        let mut service = self.get(id).await?;
        service.active = !service.active;
        self.repo
            .set_active(id, service.active)
            .await
            .context("Failed to toggle service")?;

        self.invalidate_cache().await;
        Ok(service)
    }

    /// The position in `ids` becomes the display order
    pub async fn reorder(&self, ids: &[i64]) -> Result<(), CatalogServiceError> {
        self.repo.reorder(ids).await.context("Failed to reorder services")?;
        self.invalidate_cache().await;
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, current: Option<i64>) -> Result<(), CatalogServiceError> {
        let existing = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?;
        match existing {
            Some(other) if Some(other.id) != current => {
                Err(CatalogServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate(input: ServiceInput) -> Result<ServiceInput, CatalogServiceError> {
    let invalid = |msg: &str| Err(CatalogServiceError::ValidationError(msg.to_string()));

    let slug = input.slug.trim().to_string();
    let title = input.title.trim().to_string();
    let description = input.description.trim().to_string();
    let icon = input.icon.trim().to_string();

    if slug.is_empty() {
        return invalid("Le slug est requis");
    }
    if char_len(&slug) > 100 || !is_valid_slug(&slug) {
        return invalid("Slug invalide");
    }
    if title.is_empty() {
        return invalid("Le titre est requis");
    }
    if char_len(&title) > 200 {
        return invalid("Le titre ne peut pas dépasser 200 caractères");
    }
    if description.is_empty() {
        return invalid("La description est requise");
    }
    if icon.is_empty() {
        return invalid("L'icône est requise");
    }

    let features = input
        .features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ServiceInput {
        slug,
        title,
        description,
        icon,
        features,
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxServiceRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CatalogService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default()).expect("Failed to create cache");
        CatalogService::new(SqlxServiceRepository::boxed(pool), cache)
    }

    fn input(slug: &str) -> ServiceInput {
        ServiceInput {
            slug: slug.to_string(),
            title: "Audit de sécurité".to_string(),
            description: "Évaluation complète de votre système d'information".to_string(),
            icon: "Shield".to_string(),
            features: vec![" Pentest ".to_string(), "".to_string(), "Rapport".to_string()],
            sort_order: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_appends_and_cleans_features() {
        let service = setup_test_service().await;
        let first = service.create(input("audit")).await.unwrap();
        let second = service.create(input("formation")).await.unwrap();

        assert_eq!(first.features, vec!["Pentest", "Rapport"]);
        assert_eq!(second.sort_order, first.sort_order + 1);
    }

    #[tokio::test]
    async fn test_validation() {
        let service = setup_test_service().await;

        let mut bad = input("audit");
        bad.title = "x".repeat(201);
        assert_eq!(
            service.create(bad).await.unwrap_err().to_string(),
            "Le titre ne peut pas dépasser 200 caractères"
        );

        let mut bad = input("audit");
        bad.icon = String::new();
        assert_eq!(service.create(bad).await.unwrap_err().to_string(), "L'icône est requise");

        assert_eq!(
            service.create(input("Audit Web")).await.unwrap_err().to_string(),
            "Slug invalide"
        );
    }

    #[tokio::test]
    async fn test_duplicate_slug() {
        let service = setup_test_service().await;
        service.create(input("audit")).await.unwrap();
        let other = service.create(input("formation")).await.unwrap();

        assert!(matches!(
            service.create(input("audit")).await,
            Err(CatalogServiceError::DuplicateSlug(_))
        ));
        assert!(matches!(
            service.update(other.id, input("audit")).await,
            Err(CatalogServiceError::DuplicateSlug(_))
        ));
    }

    #[tokio::test]
    async fn test_public_list_hides_inactive() {
        let service = setup_test_service().await;
        let audit = service.create(input("audit")).await.unwrap();
        service.create(input("formation")).await.unwrap();
        assert_eq!(service.list(false).await.unwrap().len(), 2);

        let toggled = service.toggle_active(audit.id).await.unwrap();
        assert!(!toggled.active);

        let public = service.list(false).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].slug, "formation");
        assert_eq!(service.list(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_order_when_absent() {
        let service = setup_test_service().await;
        service.create(input("audit")).await.unwrap();
        let formation = service.create(input("formation")).await.unwrap();

        let mut changed = input("formation");
        changed.title = "Sensibilisation".to_string();
        let updated = service.update(formation.id, changed).await.unwrap();

        assert_eq!(updated.title, "Sensibilisation");
        assert_eq!(updated.sort_order, formation.sort_order);
    }

    #[tokio::test]
    async fn test_reorder() {
        let service = setup_test_service().await;
        let a = service.create(input("a")).await.unwrap();
        let b = service.create(input("b")).await.unwrap();
        let c = service.create(input("c")).await.unwrap();

        service.reorder(&[c.id, a.id, b.id]).await.unwrap();
        let slugs: Vec<String> = service.list(false).await.unwrap().into_iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let service = setup_test_service().await;
        assert!(matches!(service.get(42).await, Err(CatalogServiceError::NotFound(42))));
        assert!(matches!(service.toggle_active(42).await, Err(CatalogServiceError::NotFound(42))));
        assert!(matches!(service.delete(42).await, Err(CatalogServiceError::NotFound(42))));
    }
}
