//! Team service
//!
//! Members shown in the home page team section. The public list (active
//! members only) is cached under `team:public`.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TeamMemberRepository;
use crate::models::{TeamMember, TeamMemberInput};
use crate::services::validation::{char_len, is_http_url, non_blank};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const TEAM_CACHE_TTL_SECS: u64 = 60;

const CACHE_KEY_PUBLIC: &str = "team:public";
const CACHE_NAMESPACE: &str = "team";

#[derive(Debug, thiserror::Error)]
pub enum TeamServiceError {
    #[error("Membre introuvable")]
    NotFound(i64),

    #[error("{0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Team members management
pub struct TeamService {
    repo: Arc<dyn TeamMemberRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl TeamService {
    pub fn new(repo: Arc<dyn TeamMemberRepository>, cache: Arc<Cache>) -> Self {
        Self::with_cache_ttl(repo, cache, Duration::from_secs(TEAM_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(repo: Arc<dyn TeamMemberRepository>, cache: Arc<Cache>, cache_ttl: Duration) -> Self {
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<TeamMember>, TeamServiceError> {
        if include_inactive {
            return Ok(self.repo.list(true).await.context("Failed to list team members")?);
        }

        if let Some(members) = self
            .cache
            .get::<Vec<TeamMember>>(CACHE_KEY_PUBLIC)
            .await
            .ok()
            .flatten()
        {
            return Ok(members);
        }

        let members = self.repo.list(false).await.context("Failed to list team members")?;
        let _ = self.cache.set(CACHE_KEY_PUBLIC, &members, self.cache_ttl).await;
        Ok(members)
    }

    pub async fn get(&self, id: i64) -> Result<TeamMember, TeamServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get team member")?
            .ok_or(TeamServiceError::NotFound(id))
    }

    pub async fn create(&self, input: TeamMemberInput) -> Result<TeamMember, TeamServiceError> {
        let input = validate(input)?;
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => self
                .repo
                .next_sort_order()
                .await
                .context("Failed to compute team order")?,
        };

        let now = Utc::now();
        let member = TeamMember {
            id: 0,
            name: input.name,
            role: input.role,
            description: input.description,
            linkedin: input.linkedin,
            photo: input.photo,
            sort_order,
            active: input.active,
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&member).await.context("Failed to create team member")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: TeamMemberInput) -> Result<TeamMember, TeamServiceError> {
        let mut member = self.get(id).await?;
        let input = validate(input)?;

        member.name = input.name;
        member.role = input.role;
        member.description = input.description;
        member.linkedin = input.linkedin;
        member.photo = input.photo;
        member.active = input.active;
        if let Some(order) = input.sort_order {
            member.sort_order = order;
        }
        member.updated_at = Utc::now();

        let updated = self.repo.update(&member).await.context("Failed to update team member")?;

        self.invalidate_cache().await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TeamServiceError> {
        self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete team member")?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn toggle_active(&self, id: i64) -> Result<TeamMember, TeamServiceError> {
        let mut member = self.get(id).await?;
        member.active = !member.active;
        self.repo
            .set_active(id, member.active)
            .await
            .context("Failed to toggle team member")?;

        self.invalidate_cache().await;
        Ok(member)
    }

    pub async fn reorder(&self, ids: &[i64]) -> Result<(), TeamServiceError> {
        self.repo.reorder(ids).await.context("Failed to reorder team")?;
        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

fn validate(input: TeamMemberInput) -> Result<TeamMemberInput, TeamServiceError> {
    let invalid = |msg: &str| Err(TeamServiceError::ValidationError(msg.to_string()));

    let name = input.name.trim().to_string();
    let role = input.role.trim().to_string();
    let description = input.description.trim().to_string();

    if name.is_empty() {
        return invalid("Le nom est requis");
    }
    if char_len(&name) > 200 {
        return invalid("Le nom ne peut pas dépasser 200 caractères");
    }
    if role.is_empty() {
        return invalid("Le rôle est requis");
    }
    if char_len(&role) > 200 {
        return invalid("Le rôle ne peut pas dépasser 200 caractères");
    }
    if description.is_empty() {
        return invalid("La description est requise");
    }

    // An empty link clears it
    let linkedin = non_blank(input.linkedin);
    if let Some(ref url) = linkedin {
        if !is_http_url(url) {
            return invalid("L'URL LinkedIn est invalide");
        }
    }

    Ok(TeamMemberInput {
        name,
        role,
        description,
        linkedin,
        photo: non_blank(input.photo),
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxTeamMemberRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> TeamService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default()).expect("Failed to create cache");
        TeamService::new(SqlxTeamMemberRepository::boxed(pool), cache)
    }

    fn input(name: &str) -> TeamMemberInput {
        TeamMemberInput {
            name: name.to_string(),
            role: "Président".to_string(),
            description: "Étudiant en master cybersécurité".to_string(),
            linkedin: Some("https://www.linkedin.com/in/exemple".to_string()),
            photo: None,
            sort_order: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_empty_linkedin_becomes_none() {
        let service = setup_test_service().await;
        let mut member = input("Camille");
        member.linkedin = Some("".to_string());
        let created = service.create(member).await.unwrap();
        assert!(created.linkedin.is_none());
    }

    #[tokio::test]
    async fn test_invalid_linkedin() {
        let service = setup_test_service().await;
        let mut member = input("Camille");
        member.linkedin = Some("linkedin.com/in/camille".to_string());
        assert_eq!(
            service.create(member).await.unwrap_err().to_string(),
            "L'URL LinkedIn est invalide"
        );
    }

    #[tokio::test]
    async fn test_required_fields() {
        let service = setup_test_service().await;

        assert_eq!(service.create(input(" ")).await.unwrap_err().to_string(), "Le nom est requis");

        let mut member = input("Camille");
        member.role = String::new();
        assert_eq!(service.create(member).await.unwrap_err().to_string(), "Le rôle est requis");

        let mut member = input("Camille");
        member.description = String::new();
        assert_eq!(
            service.create(member).await.unwrap_err().to_string(),
            "La description est requise"
        );
    }

    #[tokio::test]
    async fn test_order_toggle_and_reorder() {
        let service = setup_test_service().await;
        let a = service.create(input("Alice")).await.unwrap();
        let b = service.create(input("Bastien")).await.unwrap();
        assert_eq!(b.sort_order, a.sort_order + 1);

        service.reorder(&[b.id, a.id]).await.unwrap();
        let names: Vec<String> = service.list(false).await.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Bastien", "Alice"]);

        service.toggle_active(b.id).await.unwrap();
        let names: Vec<String> = service.list(false).await.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Alice"]);
        assert_eq!(service.list(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = setup_test_service().await;
        let member = service.create(input("Alice")).await.unwrap();

        let mut changed = input("Alice Martin");
        changed.linkedin = None;
        let updated = service.update(member.id, changed).await.unwrap();
        assert_eq!(updated.name, "Alice Martin");
        assert!(updated.linkedin.is_none());

        service.delete(member.id).await.unwrap();
        assert!(matches!(service.get(member.id).await, Err(TeamServiceError::NotFound(_))));
    }
}
