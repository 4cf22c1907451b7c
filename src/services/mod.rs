//! Services layer - Business logic
//!
//! This module contains the business logic of the JCPC site.
//! Services are responsible for:
//! - Validating input and producing the French messages shown to users
//! - Coordinating between repositories and cache
//! - Invalidating cached public reads after each mutation

pub mod auth;
pub mod catalog;
pub mod category;
pub mod contact;
pub mod dashboard;
pub mod email;
pub mod markdown;
pub mod method_step;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod stats;
pub mod tag;
pub mod team;
pub mod validation;

pub use auth::{generate_token, AuthError, AuthService, LoginOutcome};
pub use catalog::{CatalogService, CatalogServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use contact::{ContactService, ContactServiceError, FieldError};
pub use dashboard::{DashboardService, DashboardSummary};
pub use email::EmailService;
pub use markdown::MarkdownRenderer;
pub use method_step::{MethodStepService, MethodStepServiceError};
pub use password::{hash_password, verify_password};
pub use post::{parse_tags, PostService, PostServiceError, HOME_LATEST_POSTS};
pub use rate_limiter::LoginRateLimiter;
pub use stats::{StatsService, StatsServiceError};
pub use tag::{generate_slug, TagService, TagServiceError};
pub use team::{TeamService, TeamServiceError};
