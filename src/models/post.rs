//! Post model
//!
//! Journal entries: CTF reports, writeups, hardening guides, tutorials and
//! event announcements. The content is markdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Journal post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    /// Short summary shown on cards
    pub excerpt: String,
    /// Markdown body
    pub content: String,
    /// Slug of the article category
    pub category: String,
    /// Free-form tag names
    #[serde(default)]
    pub tags: Vec<String>,
    /// Estimated reading time in minutes
    pub reading_time: i32,
    pub featured: bool,
    pub published: bool,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub published_at: DateTime<Utc>,
    // CTF specific
    pub ctf_name: Option<String>,
    pub ctf_date: Option<DateTime<Utc>>,
    pub ranking: Option<String>,
    pub difficulty: Option<Difficulty>,
    // Event specific
    pub event_date: Option<DateTime<Utc>>,
    pub event_location: Option<String>,
    pub event_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Build a post from validated input. The ID is assigned by the database.
    pub fn from_input(input: PostInput, author_id: Option<i64>, author_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug: input.slug,
            title: input.title,
            excerpt: input.excerpt,
            content: input.content,
            category: input.category,
            tags: input.tags,
            reading_time: input.reading_time,
            featured: input.featured,
            published: input.published,
            author_id,
            author_name,
            published_at: now,
            ctf_name: input.ctf_name,
            ctf_date: input.ctf_date,
            ranking: input.ranking,
            difficulty: input.difficulty,
            event_date: input.event_date,
            event_location: input.event_location,
            event_url: input.event_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field with the input, keeping identity and authorship
    pub fn apply(&mut self, input: PostInput) {
        self.slug = input.slug;
        self.title = input.title;
        self.excerpt = input.excerpt;
        self.content = input.content;
        self.category = input.category;
        self.tags = input.tags;
        self.reading_time = input.reading_time;
        self.featured = input.featured;
        self.published = input.published;
        self.ctf_name = input.ctf_name;
        self.ctf_date = input.ctf_date;
        self.ranking = input.ranking;
        self.difficulty = input.difficulty;
        self.event_date = input.event_date;
        self.event_location = input.event_location;
        self.event_url = input.event_url;
        self.updated_at = Utc::now();
    }
}

/// CTF challenge difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Label shown on the public site
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Facile",
            Difficulty::Medium => "Moyen",
            Difficulty::Hard => "Difficile",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(anyhow::anyhow!("Invalid difficulty: {}", s)),
        }
    }
}

/// Input for creating or fully replacing a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInput {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_reading_time")]
    pub reading_time: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub ctf_name: Option<String>,
    #[serde(default)]
    pub ctf_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ranking: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_location: Option<String>,
    #[serde(default)]
    pub event_url: Option<String>,
}

fn default_reading_time() -> i32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PostInput {
        serde_json::from_value(serde_json::json!({
            "slug": "flag-hunt",
            "title": "Flag hunt",
            "excerpt": "Short",
            "content": "# Body",
            "category": "ctf",
            "difficulty": "hard"
        }))
        .unwrap()
    }

    #[test]
    fn test_input_defaults() {
        let input = input();
        assert_eq!(input.reading_time, 5);
        assert!(input.tags.is_empty());
        assert!(!input.published);
        assert_eq!(input.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn test_from_input_and_apply() {
        let mut post = Post::from_input(input(), Some(3), Some("Alice".to_string()));
        assert_eq!(post.id, 0);
        assert_eq!(post.author_id, Some(3));

        let mut changed = input();
        changed.title = "Renamed".to_string();
        changed.published = true;
        post.apply(changed);

        assert_eq!(post.title, "Renamed");
        assert!(post.published);
        assert_eq!(post.author_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(Difficulty::Easy.label(), "Facile");
        assert_eq!(Difficulty::Medium.label(), "Moyen");
        assert_eq!(Difficulty::Hard.label(), "Difficile");
        assert_eq!("MEDIUM".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
