//! Shared API response types
//!
//! List endpoints wrap their items in a named field so responses can grow
//! without breaking clients.

use serde::Serialize;

use crate::models::{
    Category, Contact, MethodStep, Post, Service, SiteStat, Tag, TeamMember,
};
use crate::services::MarkdownRenderer;

/// Single post with its rendered body
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_label: Option<&'static str>,
}

impl PostResponse {
    pub fn render(post: Post, markdown: &MarkdownRenderer) -> Self {
        let content_html = markdown.render(&post.content);
        let difficulty_label = post.difficulty.map(|d| d.label());
        Self {
            post,
            content_html,
            difficulty_label,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<Service>,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: Vec<SiteStat>,
}

#[derive(Debug, Serialize)]
pub struct MethodStepsResponse {
    pub steps: Vec<MethodStep>,
}

#[derive(Debug, Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
}
