//! Theme engine
//!
//! Server-side rendering of the public site and the admin pages with Tera.
//! Features:
//! - Templates embedded in the binary (rust-embed), inheritance included
//! - Standard template variables (site identity, request path, year)
//! - French date filter
//! - Fallback to an error page when a template fails

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera, Value};

use crate::config::SiteConfig;
use crate::models::Admin;

mod error;

pub use error::ThemeError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template rendered when another template fails
const ERROR_TEMPLATE: &str = "error.html";

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("templates", &self.template_names())
            .finish()
    }
}

impl ThemeEngine {
    /// Create the engine from the embedded templates
    pub fn new() -> Result<Self> {
        let mut templates = Vec::new();
        for name in EmbeddedTemplates::iter() {
            let file = EmbeddedTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let source = String::from_utf8(file.data.into_owned())
                .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?;
            templates.push((name.to_string(), source));
        }

        let engine = Self::from_templates(templates)?;
        tracing::debug!("Loaded {} embedded templates", engine.tera.get_template_names().count());
        Ok(engine)
    }

    /// Create the engine from `(name, source)` pairs
    ///
    /// Tera resolves `{% extends %}` chains once every template is added.
    pub fn from_templates<N, S>(templates: Vec<(N, S)>) -> Result<Self>
    where
        N: AsRef<str>,
        S: AsRef<str>,
    {
        let mut tera = Tera::default();
        tera.register_filter("date_fr", date_fr_filter);
        tera.add_raw_templates(
            templates
                .iter()
                .map(|(name, source)| (name.as_ref(), source.as_ref())),
        )
        .map_err(|e| ThemeError::TemplateError(error_chain("Failed to load templates", &e)))?;

        Ok(Self { tera })
    }

    /// Render a template with context
    ///
    /// # Arguments
    /// * `template` - Template name (e.g., "index.html", "admin/login.html")
    /// * `context` - Tera context with template variables
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()).into());
        }

        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
                .into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        standard_vars.insert_into(&mut full_context);
        self.render(template, &full_context)
    }

    /// Render a page, falling back to the error template and then to a
    /// plain HTML page. Always returns markup.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        match self.render_with_standard_vars(template, context, standard_vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);

                let mut error_context = TeraContext::new();
                error_context.insert("error_message", "Une erreur est survenue lors de l'affichage de la page.");
                error_context.insert("requested_template", template);

                match self.render_with_standard_vars(ERROR_TEMPLATE, &error_context, standard_vars) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("Failed to render error template: {}", error_template_err);
                        Self::simple_error_page()
                    }
                }
            }
        }
    }

    /// Whether a template with this name is loaded
    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Names of the loaded templates, sorted
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Last resort page, when even the error template fails
    fn simple_error_page() -> String {
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Erreur</title>
    <style>
        body { font-family: system-ui, sans-serif; background: #050816; color: #e2e8f0; max-width: 600px; margin: 80px auto; padding: 20px; }
        h1 { color: #22d3ee; }
        a { color: #a78bfa; }
    </style>
</head>
<body>
    <h1>Erreur</h1>
    <p>La page n'a pas pu être affichée. Réessayez dans quelques instants.</p>
    <p><a href="/">Retour à l'accueil</a></p>
</body>
</html>"#
            .to_string()
    }
}

/// Walk the source chain of a Tera error into one message
fn error_chain(prefix: &str, e: &tera::Error) -> String {
    let mut error_msg = format!("{}: {}", prefix, e);
    let mut source = e.source();
    while let Some(s) = source {
        error_msg.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    error_msg
}

/// Long French date, e.g. "3 mars 2025"
pub fn format_date_fr(date: &DateTime<Utc>) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

/// `{{ post.published_at | date_fr }}`
///
/// Accepts RFC 3339 strings, which is how chrono dates serialize.
fn date_fr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("date_fr expects a date string"))?;
    let date = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| tera::Error::msg(format!("date_fr: invalid date '{}': {}", raw, e)))?;
    Ok(Value::String(format_date_fr(&date.with_timezone(&Utc))))
}

/// Standard template variables, available in every page
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    /// Site identity (name, contact details, legal identifiers)
    pub site: SiteConfig,
    /// Current request path
    pub request_path: String,
    /// Current year (for copyright)
    pub year: i32,
    /// Signed-in admin, on admin pages
    pub current_admin: Option<CurrentAdmin>,
}

/// Signed-in admin as shown in templates
#[derive(Debug, Clone, Serialize)]
pub struct CurrentAdmin {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&Admin> for CurrentAdmin {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name.clone(),
            email: admin.email.clone(),
            role: admin.role.to_string(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(site: &SiteConfig, request_path: impl Into<String>) -> Self {
        Self {
            site: site.clone(),
            request_path: request_path.into(),
            year: Utc::now().year(),
            current_admin: None,
        }
    }

    /// Set the signed-in admin
    pub fn with_admin(mut self, admin: &Admin) -> Self {
        self.current_admin = Some(CurrentAdmin::from(admin));
        self
    }

    fn insert_into(&self, context: &mut TeraContext) {
        context.insert("site", &self.site);
        context.insert("request_path", &self.request_path);
        context.insert("year", &self.year);
        if let Some(ref admin) = self.current_admin {
            context.insert("current_admin", admin);
        }
    }
}
