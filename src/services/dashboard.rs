//! Dashboard overview
//!
//! Counters and latest activity shown on the admin landing page.

use crate::db::repositories::{ContactRepository, PostRepository};
use crate::models::{Contact, Post};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

/// Posts listed on the dashboard
pub const RECENT_POSTS: i64 = 10;
/// Contact messages listed on the dashboard
pub const RECENT_CONTACTS: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_posts: i64,
    pub published_posts: i64,
    pub total_contacts: i64,
    pub unread_contacts: i64,
    pub recent_posts: Vec<Post>,
    pub recent_contacts: Vec<Contact>,
}

pub struct DashboardService {
    posts: Arc<dyn PostRepository>,
    contacts: Arc<dyn ContactRepository>,
}

impl DashboardService {
    pub fn new(posts: Arc<dyn PostRepository>, contacts: Arc<dyn ContactRepository>) -> Self {
        Self { posts, contacts }
    }

    /// Gather the overview. Never cached: admins expect fresh numbers.
    pub async fn summary(&self) -> Result<DashboardSummary> {
        let (total_posts, published_posts, total_contacts, unread_contacts, recent_posts, recent_contacts) = tokio::try_join!(
            async { self.posts.count().await.context("Failed to count posts") },
            async { self.posts.count_published().await.context("Failed to count published posts") },
            async { self.contacts.count().await.context("Failed to count contacts") },
            async { self.contacts.count_unread().await.context("Failed to count unread contacts") },
            async { self.posts.list_recent(RECENT_POSTS).await.context("Failed to list recent posts") },
            async {
                self.contacts
                    .list_recent(RECENT_CONTACTS)
                    .await
                    .context("Failed to list recent contacts")
            },
        )?;

        Ok(DashboardSummary {
            total_posts,
            published_posts,
            total_contacts,
            unread_contacts,
            recent_posts,
            recent_contacts,
        })
    }
}
