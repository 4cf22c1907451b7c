//! Site statistics service
//!
//! Counters of the home page stats band. The list is cached under
//! `stats:all`.

use crate::cache::Cache;
use crate::db::repositories::SiteStatRepository;
use crate::models::{SiteStat, SiteStatInput, DEFAULT_STATS};
use crate::services::validation::{char_len, non_blank};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const STATS_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_STATS: &str = "stats:all";
const CACHE_NAMESPACE: &str = "stats";

#[derive(Debug, thiserror::Error)]
pub enum StatsServiceError {
    #[error("Statistique introuvable")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Une statistique avec cette clé existe déjà")]
    DuplicateKey(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Site statistics management
pub struct StatsService {
    repo: Arc<dyn SiteStatRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl StatsService {
    pub fn new(repo: Arc<dyn SiteStatRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(STATS_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn SiteStatRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    /// All statistics in display order
    pub async fn list(&self) -> Result<Vec<SiteStat>, StatsServiceError> {
        let stats = self
            .cache
            .get_or_load(CACHE_KEY_STATS, self.cache_ttl, || async {
                self.repo.list().await.context("Failed to list stats")
            })
            .await?;
        Ok(stats)
    }

    pub async fn get(&self, id: i64) -> Result<SiteStat, StatsServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get stat")?
            .ok_or_else(|| StatsServiceError::NotFound(id.to_string()))
    }

    pub async fn create(&self, input: SiteStatInput) -> Result<SiteStat, StatsServiceError> {
        let input = validate(input)?;
        self.ensure_key_free(&input.key, None).await?;

        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute stat order")?,
        };

        let stat = SiteStat {
            id: 0,
            key: input.key,
            value: input.value,
            suffix: input.suffix,
            label: input.label,
            sort_order,
            updated_at: Utc::now(),
        };
        let created = self.repo.create(&stat).await.context("Failed to create stat")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: SiteStatInput) -> Result<SiteStat, StatsServiceError> {
        let mut stat = self.get(id).await?;
        let input = validate(input)?;
        self.ensure_key_free(&input.key, Some(id)).await?;

        stat.key = input.key;
        stat.value = input.value;
        stat.suffix = input.suffix;
        stat.label = input.label;
        if let Some(order) = input.sort_order {
            stat.sort_order = order;
        }
        stat.updated_at = Utc::now();

        let updated = self.repo.update(&stat).await.context("Failed to update stat")?;

        self.invalidate_cache().await;
        Ok(updated)
    }

    /// Set the value of the statistic identified by `key`
    pub async fn update_value(&self, key: &str, value: i32) -> Result<SiteStat, StatsServiceError> {
        if !self
            .repo
            .update_value(key, value)
            .await
            .context("Failed to update stat value")?
        {
            return Err(StatsServiceError::NotFound(key.to_string()));
        }

        self.invalidate_cache().await;

        self.repo
            .get_by_key(key)
            .await
            .context("Failed to get stat by key")?
            .ok_or_else(|| StatsServiceError::NotFound(key.to_string()))
    }

    pub async fn delete(&self, id: i64) -> Result<(), StatsServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete stat")?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn reorder(&self, ids: &[i64]) -> Result<(), StatsServiceError> {
        self.repo.reorder(ids).await.context("Failed to reorder stats")?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Upsert the default statistics.
    ///
    /// Missing ones are created; existing ones only get their value reset.
    pub async fn seed_defaults(&self) -> Result<usize, StatsServiceError> {
        for (index, stat) in DEFAULT_STATS.iter().enumerate() {
            self.repo
                .upsert_default(stat, index as i32)
                .await
                .context("Failed to seed stat")?;
        }

        tracing::info!("Seeded {} default stats", DEFAULT_STATS.len());
        self.invalidate_cache().await;

        Ok(DEFAULT_STATS.len())
    }

    async fn ensure_key_free(&self, key: &str, current: Option<i64>) -> Result<(), StatsServiceError> {
        match self.repo.get_by_key(key).await.context("Failed to check stat key")? {
            Some(other) if Some(other.id) != current => {
                Err(StatsServiceError::DuplicateKey(key.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate(input: SiteStatInput) -> Result<SiteStatInput, StatsServiceError> {
    let invalid = |msg: &str| Err(StatsServiceError::ValidationError(msg.to_string()));

    let key = input.key.trim().to_string();
    let label = input.label.trim().to_string();
    let suffix = non_blank(input.suffix);

    if key.is_empty() {
        return invalid("La clé est requise");
    }
    if char_len(&key) > 100 {
        return invalid("La clé ne peut pas dépasser 100 caractères");
    }
    if suffix.as_deref().is_some_and(|s| char_len(s) > 10) {
        return invalid("Le suffixe ne peut pas dépasser 10 caractères");
    }
    if label.is_empty() {
        return invalid("Le libellé est requis");
    }
    if char_len(&label) > 200 {
        return invalid("Le libellé ne peut pas dépasser 200 caractères");
    }

    Ok(SiteStatInput {
        key,
        label,
        suffix,
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxSiteStatRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> StatsService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default()).expect("Failed to create cache");
        StatsService::new(SqlxSiteStatRepository::boxed(pool), cache)
    }

    fn input(key: &str) -> SiteStatInput {
        SiteStatInput {
            key: key.to_string(),
            value: 3,
            suffix: Some("".to_string()),
            label: "Prix remportés".to_string(),
            sort_order: None,
        }
    }

    #[tokio::test]
    async fn test_seeded_stats() {
        let service = setup_test_service().await;
        let stats = service.list().await.unwrap();
        let keys: Vec<&str> = stats.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["missions", "satisfaction", "members", "partners"]);
        assert_eq!(stats[1].display_value(), "98%");
    }

    #[tokio::test]
    async fn test_create_and_duplicate_key() {
        let service = setup_test_service().await;
        let stat = service.create(input("awards")).await.unwrap();
        assert_eq!(stat.sort_order, 4);
        assert!(stat.suffix.is_none());

        let err = service.create(input("awards")).await.unwrap_err();
        assert_eq!(err.to_string(), "Une statistique avec cette clé existe déjà");
    }

    #[tokio::test]
    async fn test_suffix_too_long() {
        let service = setup_test_service().await;
        let mut bad = input("awards");
        bad.suffix = Some("x".repeat(11));
        assert_eq!(
            service.create(bad).await.unwrap_err().to_string(),
            "Le suffixe ne peut pas dépasser 10 caractères"
        );
    }

    #[tokio::test]
    async fn test_update_value_by_key() {
        let service = setup_test_service().await;
        assert_eq!(service.list().await.unwrap()[0].value, 15);

        let stat = service.update_value("missions", 20).await.unwrap();
        assert_eq!(stat.value, 20);
        // Cache was invalidated
        assert_eq!(service.list().await.unwrap()[0].value, 20);

        assert!(matches!(
            service.update_value("inconnue", 1).await,
            Err(StatsServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_resets_values_only() {
        let service = setup_test_service().await;
        let missions = service.list().await.unwrap().remove(0);

        let mut changed = input("missions");
        changed.value = 40;
        changed.label = "Missions".to_string();
        service.update(missions.id, changed).await.unwrap();

        let deleted = service.list().await.unwrap().pop().unwrap();
        service.delete(deleted.id).await.unwrap();

        assert_eq!(service.seed_defaults().await.unwrap(), 4);
        let stats = service.list().await.unwrap();
        assert_eq!(stats.len(), 4);
        let missions = stats.iter().find(|s| s.key == "missions").unwrap();
        assert_eq!(missions.value, 15);
        assert_eq!(missions.label, "Missions");
    }

    #[tokio::test]
    async fn test_reorder() {
        let service = setup_test_service().await;
        let mut ids: Vec<i64> = service.list().await.unwrap().iter().map(|s| s.id).collect();
        ids.rotate_left(1);
        service.reorder(&ids).await.unwrap();

        let keys: Vec<String> = service.list().await.unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["satisfaction", "members", "partners", "missions"]);
    }
}
