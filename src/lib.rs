//! JCPC - site vitrine et back-office de la Junior Cybersécurité Paris Cité
//!
//! Public pages (accueil, services, équipe, journal, mentions légales), a JSON
//! API and an admin dashboard backed by SQLite or MySQL.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
