//! Configuration management
//!
//! This module handles loading and parsing configuration for the JCPC site.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Admin session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Outgoing mail configuration
    #[serde(default)]
    pub mail: MailConfig,
    /// Public site identity
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Pool size, driver default when unset. In-memory SQLite always uses one.
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: None,
        }
    }
}

fn default_database_url() -> String {
    "data/jcpc.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver
    #[serde(default)]
    pub driver: CacheDriver,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    60
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-memory cache (default)
    #[default]
    Memory,
}

/// Admin session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
    /// Add the `Secure` attribute to the cookie (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_days: default_session_ttl_days(),
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    /// Session lifetime in seconds, used for the cookie Max-Age
    pub fn max_age_seconds(&self) -> i64 {
        self.ttl_days * 24 * 60 * 60
    }
}

fn default_cookie_name() -> String {
    "jcpc_admin_session".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

/// SMTP configuration for contact notifications.
///
/// Notifications are disabled while `smtp_host` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Sender address, defaults to the site contact email
    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: None,
        }
    }
}

impl MailConfig {
    /// Whether an SMTP relay is configured
    pub fn is_enabled(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|h| !h.trim().is_empty())
    }
}

fn default_smtp_port() -> u16 {
    465
}

/// Public identity of the organization, shown in page headers and legal notices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_site_full_name")]
    pub full_name: String,
    #[serde(default = "default_site_description")]
    pub description: String,
    #[serde(default = "default_site_url")]
    pub url: String,
    #[serde(default = "default_contact_email")]
    pub email: String,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_linkedin")]
    pub linkedin: String,
    #[serde(default)]
    pub legal: LegalConfig,
    /// Subjects offered by the contact form
    #[serde(default = "default_contact_subjects")]
    pub contact_subjects: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            full_name: default_site_full_name(),
            description: default_site_description(),
            url: default_site_url(),
            email: default_contact_email(),
            address: default_address(),
            linkedin: default_linkedin(),
            legal: LegalConfig::default(),
            contact_subjects: default_contact_subjects(),
        }
    }
}

fn default_site_name() -> String {
    "JCPC".to_string()
}

fn default_site_full_name() -> String {
    "Junior Cybersécurité Paris Cité".to_string()
}

fn default_site_description() -> String {
    "Junior-Entreprise de cybersécurité rattachée à l'Université Paris Cité".to_string()
}

fn default_site_url() -> String {
    "https://jcpc.fr".to_string()
}

fn default_contact_email() -> String {
    "contact@jcpc.fr".to_string()
}

fn default_address() -> String {
    "45 Rue des Saints-Pères, 75006 Paris, France".to_string()
}

fn default_linkedin() -> String {
    "https://www.linkedin.com/company/jcpc-junior-cybers%C3%A9curit%C3%A9-paris-cit%C3%A9/"
        .to_string()
}

fn default_contact_subjects() -> Vec<String> {
    [
        "Demande de devis",
        "Information sur les services",
        "Partenariat",
        "Recrutement",
        "Autre",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Legal identifiers shown on the legal notices page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalConfig {
    #[serde(default = "default_siret")]
    pub siret: String,
    #[serde(default = "default_rna")]
    pub rna: String,
    #[serde(default = "default_tva")]
    pub tva: String,
    #[serde(default = "default_host_provider")]
    pub host_provider: String,
}

impl Default for LegalConfig {
    fn default() -> Self {
        Self {
            siret: default_siret(),
            rna: default_rna(),
            tva: default_tva(),
            host_provider: default_host_provider(),
        }
    }
}

fn default_siret() -> String {
    "En cours d'immatriculation".to_string()
}

fn default_rna() -> String {
    "En cours".to_string()
}

fn default_tva() -> String {
    "Non assujetti".to_string()
}

fn default_host_provider() -> String {
    "Auto-hébergé".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - JCPC_SERVER_HOST
    /// - JCPC_SERVER_PORT
    /// - JCPC_SERVER_CORS_ORIGIN
    /// - JCPC_DATABASE_DRIVER
    /// - JCPC_DATABASE_URL
    /// - JCPC_DATABASE_MAX_CONNECTIONS
    /// - JCPC_CACHE_TTL_SECONDS
    /// - JCPC_SESSION_SECURE_COOKIE
    /// - JCPC_MAIL_SMTP_HOST
    /// - JCPC_MAIL_SMTP_PORT
    /// - JCPC_MAIL_SMTP_USERNAME
    /// - JCPC_MAIL_SMTP_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_days <= 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_days must be positive".to_string(),
            ));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.cookie_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("JCPC_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("JCPC_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("JCPC_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("JCPC_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("JCPC_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = std::env::var("JCPC_DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.database.max_connections = Some(max);
        }

        // Cache configuration
        if let Ok(ttl) = std::env::var("JCPC_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        // Session configuration
        if let Ok(secure) = std::env::var("JCPC_SESSION_SECURE_COOKIE") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.session.secure_cookie = true,
                "0" | "false" | "no" => self.session.secure_cookie = false,
                _ => {}
            }
        }

        // Mail configuration
        if let Ok(host) = std::env::var("JCPC_MAIL_SMTP_HOST") {
            self.mail.smtp_host = Some(host);
        }
        if let Ok(port) = std::env::var("JCPC_MAIL_SMTP_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mail.smtp_port = port;
            }
        }
        if let Ok(username) = std::env::var("JCPC_MAIL_SMTP_USERNAME") {
            self.mail.smtp_username = Some(username);
        }
        if let Ok(password) = std::env::var("JCPC_MAIL_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(password);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "JCPC_SERVER_HOST",
    "JCPC_SERVER_PORT",
    "JCPC_SERVER_CORS_ORIGIN",
    "JCPC_DATABASE_DRIVER",
    "JCPC_DATABASE_URL",
    "JCPC_DATABASE_MAX_CONNECTIONS",
    "JCPC_CACHE_TTL_SECONDS",
    "JCPC_SESSION_SECURE_COOKIE",
    "JCPC_MAIL_SMTP_HOST",
    "JCPC_MAIL_SMTP_PORT",
    "JCPC_MAIL_SMTP_USERNAME",
    "JCPC_MAIL_SMTP_PASSWORD",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/jcpc.db");
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.session.cookie_name, "jcpc_admin_session");
        assert_eq!(config.session.ttl_days, 7);
        assert!(!config.mail.is_enabled());
        assert_eq!(config.site.name, "JCPC");
        assert_eq!(config.site.contact_subjects.len(), 5);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.email, "contact@jcpc.fr");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nsite:\n  name: \"JCPC Test\"\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.site.name, "JCPC Test");
        assert_eq!(config.site.full_name, "Junior Cybersécurité Paris Cité");
        assert_eq!(config.site.legal.tva, "Non assujetti");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "0.0.0.0"
  port: 9000
  cors_origin: "https://jcpc.fr"
database:
  driver: mysql
  url: "mysql://jcpc@localhost/jcpc"
cache:
  driver: memory
  ttl_seconds: 120
session:
  cookie_name: "sid"
  ttl_days: 1
  secure_cookie: true
mail:
  smtp_host: "smtp.example.com"
  smtp_port: 587
  smtp_username: "bot"
  smtp_password: "secret"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.session.max_age_seconds(), 86400);
        assert!(config.session.secure_cookie);
        assert!(config.mail.is_enabled());
        assert_eq!(config.mail.smtp_port, 587);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("line"), "error should carry a location: {}", msg);
    }

    #[test]
    fn test_load_rejects_non_positive_session_ttl() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "session:\n  ttl_days: 0\n").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ttl_days"));
    }

    #[test]
    fn test_blank_smtp_host_is_disabled() {
        let mail = MailConfig {
            smtp_host: Some("  ".to_string()),
            ..MailConfig::default()
        };
        assert!(!mail.is_enabled());
    }

    #[test]
    fn test_env_override_server_config() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: \"0.0.0.0\"\n  port: 8080\n").unwrap();

        std::env::set_var("JCPC_SERVER_HOST", "192.168.1.1");
        std::env::set_var("JCPC_SERVER_PORT", "4000");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);

        clear_env();
    }

    #[test]
    fn test_env_override_database_and_mail() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        std::env::set_var("JCPC_DATABASE_DRIVER", "mysql");
        std::env::set_var("JCPC_DATABASE_URL", "mysql://test@localhost/db");
        std::env::set_var("JCPC_MAIL_SMTP_HOST", "smtp.example.com");
        std::env::set_var("JCPC_SESSION_SECURE_COOKIE", "true");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://test@localhost/db");
        assert!(config.mail.is_enabled());
        assert!(config.session.secure_cookie);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        clear_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\n").unwrap();

        std::env::set_var("JCPC_SERVER_PORT", "not_a_port");
        std::env::set_var("JCPC_DATABASE_DRIVER", "postgres");
        std::env::set_var("JCPC_CACHE_TTL_SECONDS", "-5");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.cache.ttl_seconds, 60);

        clear_env();
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_server_config_strategy() -> impl Strategy<Value = ServerConfig> {
        (
            prop_oneof![
                Just("127.0.0.1".to_string()),
                Just("0.0.0.0".to_string()),
                "[a-z]{3,10}\\.local",
            ],
            1u16..=65535,
        )
            .prop_map(|(host, port)| ServerConfig {
                host,
                port,
                cors_origin: default_cors_origin(),
            })
    }

    fn malformed_yaml_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("server:\n  port: [1, 2\n".to_string()),
            Just("server: {host: \n".to_string()),
            Just("cache:\n  ttl_seconds: forever\n".to_string()),
            Just("database:\n  driver: oracle\n".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a config and loading it back yields the same values
        #[test]
        fn config_roundtrip(server in valid_server_config_strategy(), ttl in 1u64..86400) {
            let config = Config {
                server,
                cache: CacheConfig { driver: CacheDriver::Memory, ttl_seconds: ttl },
                ..Config::default()
            };

            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.server.host, parsed.server.host);
            prop_assert_eq!(config.server.port, parsed.server.port);
            prop_assert_eq!(config.cache.ttl_seconds, parsed.cache.ttl_seconds);
            prop_assert_eq!(config.site.full_name, parsed.site.full_name);
        }

        /// Malformed files always produce a descriptive error
        #[test]
        fn invalid_config_error_handling(yaml in malformed_yaml_strategy()) {
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let result = Config::load(file.path());
            prop_assert!(result.is_err());
            prop_assert!(result.unwrap_err().to_string().len() > 10);
        }
    }
}
