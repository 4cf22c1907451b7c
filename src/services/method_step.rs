//! Method step service
//!
//! Steps of the engagement method shown on the home page.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::MethodStepRepository;
use crate::models::{MethodStep, MethodStepInput};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const METHOD_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_PUBLIC: &str = "method_steps:public";
const CACHE_NAMESPACE: &str = "method_steps";

#[derive(Debug, thiserror::Error)]
pub enum MethodStepServiceError {
    #[error("Étape introuvable")]
    NotFound(i64),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct MethodStepService {
    repo: Arc<dyn MethodStepRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl MethodStepService {
    pub fn new(repo: Arc<dyn MethodStepRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(METHOD_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn MethodStepRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    /// Active steps in display order (public)
    pub async fn list_public(&self) -> Result<Vec<MethodStep>, MethodStepServiceError> {
        if let Some(steps) = self
            .cache
            .get::<Vec<MethodStep>>(CACHE_KEY_PUBLIC)
            .await
            .ok()
            .flatten()
        {
            return Ok(steps);
        }

        let steps = self.repo.list(false).await.context("Failed to list method steps")?;
        let _ = self.cache.set(CACHE_KEY_PUBLIC, &steps, self.cache_ttl).await;
        Ok(steps)
    }

    /// Every step, inactive included (admin)
    pub async fn list_all(&self) -> Result<Vec<MethodStep>, MethodStepServiceError> {
        Ok(self.repo.list(true).await.context("Failed to list method steps")?)
    }

    pub async fn get(&self, id: i64) -> Result<MethodStep, MethodStepServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get method step")?
            .ok_or(MethodStepServiceError::NotFound(id))
    }

    pub async fn create(&self, input: MethodStepInput) -> Result<MethodStep, MethodStepServiceError> {
        let input = validate(input)?;
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute method step order")?,
        };

        let step = MethodStep {
            id: 0,
            step_number: input.step_number,
            title: input.title,
            description: input.description,
            icon: input.icon,
            sort_order,
            active: input.active,
        };
        let created = self.repo.create(&step).await.context("Failed to create method step")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: MethodStepInput) -> Result<MethodStep, MethodStepServiceError> {
        let mut step = self.get(id).await?;
        let input = validate(input)?;

        step.step_number = input.step_number;
        step.title = input.title;
        step.description = input.description;
        step.icon = input.icon;
        step.active = input.active;
        if let Some(order) = input.sort_order {
            step.sort_order = order;
        }

        let updated = self.repo.update(&step).await.context("Failed to update method step")?;

        self.invalidate_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), MethodStepServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete method step")?;
        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate(input: MethodStepInput) -> Result<MethodStepInput, MethodStepServiceError> {
    let invalid = |msg: &str| Err(MethodStepServiceError::ValidationError(msg.to_string()));

    let title = input.title.trim().to_string();
    let description = input.description.trim().to_string();
    let icon = input.icon.trim().to_string();

    if input.step_number < 1 {
        return invalid("Le numéro d'étape doit être positif");
    }
    if title.is_empty() {
        return invalid("Le titre est requis");
    }
    if description.is_empty() {
        return invalid("La description est requise");
    }
    if icon.is_empty() {
        return invalid("L'icône est requise");
    }

    Ok(MethodStepInput {
        title,
        description,
        icon,
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxMethodStepRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> MethodStepService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default()).expect("Failed to create cache");
        MethodStepService::new(SqlxMethodStepRepository::boxed(pool), cache)
    }

    fn input(step_number: i32, title: &str) -> MethodStepInput {
        MethodStepInput {
            step_number,
            title: title.to_string(),
            description: "Suivi après mission".to_string(),
            icon: "LifeBuoy".to_string(),
            sort_order: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_seeded_steps() {
        let service = setup_test_service().await;
        let titles: Vec<String> = service
            .list_public()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Analyse", "Audit", "Rapport", "Accompagnement"]);
    }

    #[tokio::test]
    async fn test_create_appends() {
        let service = setup_test_service().await;
        let step = service.create(input(5, "Suivi")).await.unwrap();
        assert_eq!(step.sort_order, 4);
        assert_eq!(service.list_public().await.unwrap().last().unwrap().title, "Suivi");
    }

    #[tokio::test]
    async fn test_inactive_hidden_from_public() {
        let service = setup_test_service().await;
        let first = service.list_all().await.unwrap().remove(0);

        let mut hidden = input(first.step_number, &first.title);
        hidden.active = false;
        service.update(first.id, hidden).await.unwrap();

        assert_eq!(service.list_public().await.unwrap().len(), 3);
        assert_eq!(service.list_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let service = setup_test_service().await;
        assert_eq!(
            service.create(input(0, "Zéro")).await.unwrap_err().to_string(),
            "Le numéro d'étape doit être positif"
        );
        assert_eq!(
            service.create(input(5, " ")).await.unwrap_err().to_string(),
            "Le titre est requis"
        );
        assert!(matches!(service.delete(99).await, Err(MethodStepServiceError::NotFound(99))));
    }
}
