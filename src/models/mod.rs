//! Data models
//!
//! This module contains the data structures used throughout the JCPC site:
//! - Database entities (Post, Service, TeamMember, Tag, Category, SiteStat,
//!   MethodStep, Contact, Admin, Session)
//! - Input types accepted by the services and the JSON API

mod admin;
mod category;
mod contact;
mod method_step;
mod post;
mod service;
mod session;
mod site_stat;
mod tag;
mod team_member;

pub use admin::{Admin, AdminRole};
pub use category::{
    Category, CreateCategoryInput, DefaultCategory, UpdateCategoryInput, DEFAULT_CATEGORIES,
};
pub use contact::{Contact, ContactInput};
pub use method_step::{MethodStep, MethodStepInput};
pub use post::{Difficulty, Post, PostInput};
pub use service::{Service, ServiceInput};
pub use session::Session;
pub use site_stat::{DefaultStat, SiteStat, SiteStatInput, DEFAULT_STATS};
pub use tag::{CreateTagInput, Tag, UpdateTagInput};
pub use team_member::{TeamMember, TeamMemberInput};
