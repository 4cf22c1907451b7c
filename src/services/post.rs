//! Post service
//!
//! Implements business logic for journal posts:
//! - Validation of the editor input
//! - Slug uniqueness
//! - Publication toggling
//! - Cached public reads (journal list, latest posts, single post)

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{Admin, Post, PostInput};
use crate::services::validation::{is_http_url, is_valid_slug, non_blank};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for public post reads
const POST_CACHE_TTL_SECS: u64 = 60;

/// Number of posts on the home page
pub const HOME_LATEST_POSTS: i64 = 12;

const CACHE_KEY_PUBLISHED: &str = "posts:published:";
const CACHE_KEY_LATEST: &str = "posts:latest:";
const CACHE_KEY_BY_SLUG: &str = "posts:slug:";
const CACHE_NAMESPACE: &str = "posts";

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Article introuvable")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    /// Slug used by another post
    #[error("{0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self::with_cache_ttl(repo, categories, cache, Duration::from_secs(POST_CACHE_TTL_SECS))
    }

    pub fn with_cache_ttl(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            categories,
            cache,
            cache_ttl,
        }
    }

    /// Create a post authored by `author`
    ///
    /// # Errors
    /// - `ValidationError` for invalid input (first failing field)
    /// - `DuplicateSlug` if another post already uses the slug
    pub async fn create(&self, input: PostInput, author: &Admin) -> Result<Post, PostServiceError> {
        let input = self.validate(input).await?;

        if self
            .repo
            .get_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
            .is_some()
        {
            return Err(PostServiceError::DuplicateSlug(
                "Un article avec ce slug existe déjà".to_string(),
            ));
        }

        let post = Post::from_input(input, Some(author.id), Some(author.name.clone()));
        let created = self.repo.create(&post).await.context("Failed to create post")?;

        tracing::info!("Post '{}' created by {}", created.slug, author.email);
        self.invalidate_cache().await;

        Ok(created)
    }

    /// Replace every editable field of a post
    pub async fn update(&self, id: i64, input: PostInput) -> Result<Post, PostServiceError> {
        let mut post = self.get(id).await?;
        let input = self.validate(input).await?;

        if let Some(other) = self
            .repo
            .get_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            if other.id != id {
                return Err(PostServiceError::DuplicateSlug(
                    "Un autre article avec ce slug existe déjà".to_string(),
                ));
            }
        }

        post.apply(input);
        let updated = self.repo.update(&post).await.context("Failed to update post")?;

        self.invalidate_cache().await;

        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self.get(id).await?;
        self.repo.delete(id).await.context("Failed to delete post")?;

        tracing::info!("Post '{}' deleted", post.slug);
        self.invalidate_cache().await;

        Ok(())
    }

    /// Flip the published flag, returning the post in its new state
    pub async fn toggle_publish(&self, id: i64) -> Result<Post, PostServiceError> {
        let mut post = self.get(id).await?;
        post.published = !post.published;
        self.repo
            .set_published(id, post.published)
            .await
            .context("Failed to toggle post publication")?;

        self.invalidate_cache().await;

        Ok(post)
    }

    /// Get any post by ID (admin)
    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(id.to_string()))
    }

    /// Every post, newest first (admin)
    pub async fn list_all(&self) -> Result<Vec<Post>, PostServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list posts")?)
    }

    /// The most recently created posts (dashboard)
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .repo
            .list_recent(limit)
            .await
            .context("Failed to list recent posts")?)
    }

    /// Published posts, featured first.
    ///
    /// `None` and `"all"` both mean every category.
    pub async fn list_published(&self, category: Option<&str>) -> Result<Vec<Post>, PostServiceError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty() && *c != "all");
        let cache_key = format!("{}{}", CACHE_KEY_PUBLISHED, category.unwrap_or("all"));
        let posts = self
            .cache
            .get_or_load(&cache_key, self.cache_ttl, || async {
                self.repo
                    .list_published(category)
                    .await
                    .context("Failed to list published posts")
            })
            .await?;
        Ok(posts)
    }

    /// A published post by slug; unpublished posts are not visible
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_BY_SLUG, slug);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(Some(post));
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?
            .filter(|p| p.published);

        if let Some(ref post) = post {
            let _ = self.cache.set(&cache_key, post, self.cache_ttl).await;
        }

        Ok(post)
    }

    /// The most recently published posts
    pub async fn latest_published(&self, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_LATEST, limit);
        let posts = self
            .cache
            .get_or_load(&cache_key, self.cache_ttl, || async {
                self.repo
                    .latest_published(limit)
                    .await
                    .context("Failed to list latest posts")
            })
            .await?;
        Ok(posts)
    }

    /// (total, published)
    pub async fn counts(&self) -> Result<(i64, i64), PostServiceError> {
        let total = self.repo.count().await.context("Failed to count posts")?;
        let published = self
            .repo
            .count_published()
            .await
            .context("Failed to count published posts")?;
        Ok((total, published))
    }

    /// Check and normalize editor input. Reports the first failing field.
    async fn validate(&self, input: PostInput) -> Result<PostInput, PostServiceError> {
        let invalid = |msg: &str| Err(PostServiceError::ValidationError(msg.to_string()));

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return invalid("Le titre est requis");
        }
        let slug = input.slug.trim().to_string();
        if slug.is_empty() {
            return invalid("Le slug est requis");
        }
        if !is_valid_slug(&slug) {
            return invalid("Slug invalide");
        }
        let excerpt = input.excerpt.trim().to_string();
        if excerpt.is_empty() {
            return invalid("L'extrait est requis");
        }
        if input.content.trim().is_empty() {
            return invalid("Le contenu est requis");
        }
        if input.reading_time < 1 {
            return invalid("Le temps de lecture doit être d'au moins 1 minute");
        }

        let category = input.category.trim().to_string();
        if category.is_empty()
            || self
                .categories
                .get_by_slug(&category)
                .await
                .context("Failed to check post category")?
                .is_none()
        {
            return invalid("Catégorie invalide");
        }

        let event_url = non_blank(input.event_url);
        if let Some(ref url) = event_url {
            if !is_http_url(url) {
                return invalid("L'URL de l'événement est invalide");
            }
        }

        Ok(PostInput {
            slug,
            title,
            excerpt,
            category,
            tags: clean_tags(input.tags),
            ctf_name: non_blank(input.ctf_name),
            ranking: non_blank(input.ranking),
            event_location: non_blank(input.event_location),
            event_url,
            ..input
        })
    }

    async fn invalidate_cache(&self) {
        self.cache.invalidate(CACHE_NAMESPACE).await;
    }
}

/// Split the comma-separated tag field of the editor form
pub fn parse_tags(raw: &str) -> Vec<String> {
    clean_tags(raw.split(',').map(str::to_string).collect())
}

/// Trim tags, dropping empty ones and repeats
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AdminRole, Difficulty};

    async fn setup_test_service() -> PostService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default()).expect("Failed to create cache");
        PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool),
            cache,
        )
    }

    fn author() -> Admin {
        let mut admin = Admin::new(
            "redaction@jcpc.fr".to_string(),
            "hash".to_string(),
            "Rédaction".to_string(),
            AdminRole::Editor,
        );
        admin.id = 1;
        admin
    }

    fn input(slug: &str, category: &str) -> PostInput {
        PostInput {
            slug: slug.to_string(),
            title: "Writeup du challenge".to_string(),
            excerpt: "Résumé".to_string(),
            content: "## Étape 1\n\n```python\nprint('flag')\n```".to_string(),
            category: category.to_string(),
            tags: vec!["web".to_string(), " ".to_string(), "web".to_string(), " sqli ".to_string()],
            reading_time: 6,
            featured: false,
            published: true,
            ctf_name: Some("404CTF".to_string()),
            ctf_date: None,
            ranking: Some("  ".to_string()),
            difficulty: Some(Difficulty::Medium),
            event_date: None,
            event_location: None,
            event_url: None,
        }
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" web, sqli ,,web , "), vec!["web", "sqli"]);
        assert!(parse_tags("").is_empty());
    }

    #[tokio::test]
    async fn test_create_normalizes_input() {
        let service = setup_test_service().await;
        let post = service.create(input("writeup-sqli", "writeup"), &author()).await.unwrap();

        assert!(post.id > 0);
        assert_eq!(post.tags, vec!["web", "sqli"]);
        assert!(post.ranking.is_none());
        assert_eq!(post.author_id, Some(1));
        assert_eq!(post.author_name.as_deref(), Some("Rédaction"));
    }

    #[tokio::test]
    async fn test_create_validation_messages() {
        let service = setup_test_service().await;
        let cases: Vec<(Box<dyn Fn(&mut PostInput)>, &str)> = vec![
            (Box::new(|i: &mut PostInput| i.title = " ".to_string()), "Le titre est requis"),
            (Box::new(|i: &mut PostInput| i.slug = "Avec Espaces".to_string()), "Slug invalide"),
            (Box::new(|i: &mut PostInput| i.excerpt = String::new()), "L'extrait est requis"),
            (Box::new(|i: &mut PostInput| i.content = "\n".to_string()), "Le contenu est requis"),
            (Box::new(|i: &mut PostInput| i.category = "inconnue".to_string()), "Catégorie invalide"),
            (Box::new(|i: &mut PostInput| i.reading_time = 0), "Le temps de lecture doit être d'au moins 1 minute"),
            (
                Box::new(|i: &mut PostInput| i.event_url = Some("javascript:alert(1)".to_string())),
                "L'URL de l'événement est invalide",
            ),
        ];

        for (mutate, expected) in cases {
            let mut input = input("valid-slug", "ctf");
            mutate(&mut input);
            let err = service.create(input, &author()).await.unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_messages() {
        let service = setup_test_service().await;
        service.create(input("a", "ctf"), &author()).await.unwrap();
        let b = service.create(input("b", "ctf"), &author()).await.unwrap();

        let err = service.create(input("a", "ctf"), &author()).await.unwrap_err();
        assert_eq!(err.to_string(), "Un article avec ce slug existe déjà");

        let err = service.update(b.id, input("a", "ctf")).await.unwrap_err();
        assert_eq!(err.to_string(), "Un autre article avec ce slug existe déjà");

        // Keeping its own slug is fine
        assert!(service.update(b.id, input("b", "event")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unpublished_post_hidden_from_public() {
        let service = setup_test_service().await;
        let mut draft = input("brouillon", "ctf");
        draft.published = false;
        let post = service.create(draft, &author()).await.unwrap();

        assert!(service.get_published_by_slug("brouillon").await.unwrap().is_none());
        assert!(service.list_published(None).await.unwrap().is_empty());

        let toggled = service.toggle_publish(post.id).await.unwrap();
        assert!(toggled.published);
        assert!(service.get_published_by_slug("brouillon").await.unwrap().is_some());
        assert_eq!(service.list_published(Some("all")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_published_by_category_and_featured_first() {
        let service = setup_test_service().await;
        service.create(input("ctf-1", "ctf"), &author()).await.unwrap();
        let mut featured = input("ctf-2", "ctf");
        featured.featured = true;
        service.create(featured, &author()).await.unwrap();
        service.create(input("event-1", "event"), &author()).await.unwrap();

        let ctf: Vec<String> = service
            .list_published(Some("ctf"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(ctf, vec!["ctf-2", "ctf-1"]);
        assert_eq!(service.list_published(None).await.unwrap().len(), 3);
        assert_eq!(service.latest_published(HOME_LATEST_POSTS).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_delete() {
        let service = setup_test_service().await;
        let post = service.create(input("ephemere", "ctf"), &author()).await.unwrap();
        assert_eq!(service.list_published(None).await.unwrap().len(), 1);
        assert!(service.get_published_by_slug("ephemere").await.unwrap().is_some());

        service.delete(post.id).await.unwrap();
        assert!(service.list_published(None).await.unwrap().is_empty());
        assert!(service.get_published_by_slug("ephemere").await.unwrap().is_none());
        assert!(matches!(service.delete(post.id).await, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_counts() {
        let service = setup_test_service().await;
        service.create(input("a", "ctf"), &author()).await.unwrap();
        let mut draft = input("b", "ctf");
        draft.published = false;
        service.create(draft, &author()).await.unwrap();

        assert_eq!(service.counts().await.unwrap(), (2, 1));
    }
}
