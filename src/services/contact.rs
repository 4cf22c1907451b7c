//! Contact service
//!
//! Public contact form submissions and their handling in the dashboard.
//! Every field is checked so the form can flag all invalid fields at once.

use crate::db::repositories::ContactRepository;
use crate::models::{Contact, ContactInput};
use crate::services::email::EmailService;
use crate::services::validation::{
    is_valid_email, is_valid_phone, len_between, non_blank, strip_spaces,
};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Invalid form field and the message shown next to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error("Message introuvable")]
    NotFound(i64),

    #[error("{}", first_message(.0))]
    ValidationError(Vec<FieldError>),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn first_message(errors: &[FieldError]) -> &str {
    errors
        .first()
        .map(|e| e.message.as_str())
        .unwrap_or("Formulaire invalide")
}

/// Contact messages service
pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
    email: EmailService,
    subjects: Vec<String>,
}

impl ContactService {
    /// `subjects` lists the accepted values of the subject field
    pub fn new(repo: Arc<dyn ContactRepository>, email: EmailService, subjects: Vec<String>) -> Self {
        Self {
            repo,
            email,
            subjects,
        }
    }

    /// Validate and store a submission, then notify the team by email.
    ///
    /// The notification is sent in the background; a failure is only logged.
    pub async fn submit(&self, input: ContactInput) -> Result<Contact, ContactServiceError> {
        let contact = self.validate(input)?;
        let created = self.repo.create(&contact).await.context("Failed to store contact")?;

        tracing::info!("Contact message {} received ({})", created.id, created.subject);

        if self.email.is_enabled() {
            let email = self.email.clone();
            let contact = created.clone();
            tokio::spawn(async move {
                if let Err(e) = email.send_contact_notification(&contact).await {
                    tracing::warn!("Failed to send notification for contact {}: {}", contact.id, e);
                }
            });
        }

        Ok(created)
    }

    /// Every message, newest first
    pub async fn list(&self) -> Result<Vec<Contact>, ContactServiceError> {
        Ok(self.repo.list().await.context("Failed to list contacts")?)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Contact>, ContactServiceError> {
        Ok(self
            .repo
            .list_recent(limit)
            .await
            .context("Failed to list recent contacts")?)
    }

    pub async fn mark_as_read(&self, id: i64) -> Result<(), ContactServiceError> {
        if !self
            .repo
            .mark_as_read(id)
            .await
            .context("Failed to mark contact as read")?
        {
            return Err(ContactServiceError::NotFound(id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContactServiceError> {
        if self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get contact")?
            .is_none()
        {
            return Err(ContactServiceError::NotFound(id));
        }
        self.repo.delete(id).await.context("Failed to delete contact")?;
        Ok(())
    }

    /// (total, unread)
    pub async fn counts(&self) -> Result<(i64, i64), ContactServiceError> {
        let total = self.repo.count().await.context("Failed to count contacts")?;
        let unread = self
            .repo
            .count_unread()
            .await
            .context("Failed to count unread contacts")?;
        Ok((total, unread))
    }

    fn validate(&self, input: ContactInput) -> Result<Contact, ContactServiceError> {
        let mut errors = Vec::new();
        let mut fail = |field: &'static str, message: &str| {
            errors.push(FieldError {
                field,
                message: message.to_string(),
            })
        };

        let company = non_blank(input.company).unwrap_or_default();
        if !len_between(&company, 2, usize::MAX) {
            fail("company", "Le nom de l'entreprise doit contenir au moins 2 caractères");
        } else if !len_between(&company, 2, 100) {
            fail("company", "Le nom de l'entreprise ne peut pas dépasser 100 caractères");
        }

        let name = input.name.trim().to_string();
        if !len_between(&name, 2, usize::MAX) {
            fail("name", "Le nom doit contenir au moins 2 caractères");
        } else if !len_between(&name, 2, 100) {
            fail("name", "Le nom ne peut pas dépasser 100 caractères");
        }

        let email = input.email.trim().to_string();
        if !is_valid_email(&email) {
            fail("email", "Veuillez entrer une adresse email valide");
        }

        let phone = non_blank(input.phone).map(|p| strip_spaces(&p));
        if phone.as_deref().is_some_and(|p| !is_valid_phone(p)) {
            fail("phone", "Numéro de téléphone invalide");
        }

        let subject = input.subject.trim().to_string();
        if !self.subjects.iter().any(|s| *s == subject) {
            fail("subject", "Veuillez sélectionner un sujet");
        }

        let message = input.message.trim().to_string();
        if !len_between(&message, 20, usize::MAX) {
            fail("message", "Le message doit contenir au moins 20 caractères");
        } else if !len_between(&message, 20, 2000) {
            fail("message", "Le message ne peut pas dépasser 2000 caractères");
        }

        if !input.consent {
            fail("consent", "Vous devez accepter la politique de confidentialité");
        }

        if !errors.is_empty() {
            return Err(ContactServiceError::ValidationError(errors));
        }

        Ok(Contact {
            id: 0,
            company: Some(company),
            name,
            email,
            phone,
            subject,
            message,
            read: false,
            created_at: Utc::now(),
        })
    }
}
