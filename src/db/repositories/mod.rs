//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod admin;
pub mod category;
pub mod contact;
pub mod method_step;
mod ordering;
pub mod post;
pub mod service;
pub mod session;
pub mod site_stat;
pub mod tag;
pub mod team_member;

pub use admin::{AdminRepository, SqlxAdminRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use method_step::{MethodStepRepository, SqlxMethodStepRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use service::{ServiceRepository, SqlxServiceRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use site_stat::{SiteStatRepository, SqlxSiteStatRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use team_member::{SqlxTeamMemberRepository, TeamMemberRepository};
