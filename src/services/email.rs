//! Contact notification email
//!
//! Sends a plain-text copy of each contact form submission to the site
//! contact address over SMTP. Delivery is best effort: callers log the
//! error and carry on.

use crate::config::{MailConfig, SiteConfig};
use crate::models::Contact;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// SMTP notifier for contact messages
#[derive(Debug, Clone)]
pub struct EmailService {
    mail: MailConfig,
    site_name: String,
    recipient: String,
}

impl EmailService {
    pub fn new(mail: MailConfig, site: &SiteConfig) -> Self {
        Self {
            mail,
            site_name: site.name.clone(),
            recipient: site.email.clone(),
        }
    }

    /// Whether an SMTP relay is configured
    pub fn is_enabled(&self) -> bool {
        self.mail.is_enabled()
    }

    /// Send the notification for a stored contact message
    pub async fn send_contact_notification(&self, contact: &Contact) -> Result<()> {
        let host = self
            .mail
            .smtp_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| anyhow!("SMTP host not configured"))?;

        let email = self.build_message(contact)?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.mail.smtp_port);
        if let (Some(user), Some(password)) = (&self.mail.smtp_username, &self.mail.smtp_password) {
            transport = transport.credentials(Credentials::new(user.clone(), password.clone()));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }

    fn build_message(&self, contact: &Contact) -> Result<Message> {
        let from = self.mail.from_address.as_deref().unwrap_or(&self.recipient);
        let from = format!("{} <{}>", self.site_name, from);

        Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .reply_to(
                contact
                    .email
                    .parse()
                    .map_err(|e| anyhow!("Invalid reply-to address: {}", e))?,
            )
            .to(self
                .recipient
                .parse()
                .map_err(|e| anyhow!("Invalid recipient address: {}", e))?)
            .subject(format!("[{}] Nouveau message : {}", self.site_name, contact.subject))
            .header(ContentType::TEXT_PLAIN)
            .body(notification_body(contact))
            .map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}

fn notification_body(contact: &Contact) -> String {
    format!(
        "Nouveau message reçu via le formulaire de contact.\n\n\
         Entreprise : {}\n\
         Nom : {}\n\
         Email : {}\n\
         Téléphone : {}\n\
         Sujet : {}\n\n\
         {}\n",
        contact.company.as_deref().unwrap_or("-"),
        contact.name,
        contact.email,
        contact.phone.as_deref().unwrap_or("-"),
        contact.subject,
        contact.message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contact() -> Contact {
        Contact {
            id: 1,
            company: Some("ACME".to_string()),
            name: "Jeanne".to_string(),
            email: "jeanne@example.com".to_string(),
            phone: None,
            subject: "Audit de sécurité".to_string(),
            message: "Nous aimerions auditer notre infrastructure.".to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_notification_body() {
        let body = notification_body(&contact());
        assert!(body.contains("Entreprise : ACME"));
        assert!(body.contains("Téléphone : -"));
        assert!(body.contains("auditer notre infrastructure"));
    }

    #[test]
    fn test_build_message() {
        let service = EmailService::new(MailConfig::default(), &SiteConfig::default());
        assert!(!service.is_enabled());
        assert!(service.build_message(&contact()).is_ok());
    }

    #[tokio::test]
    async fn test_send_without_host_fails() {
        let service = EmailService::new(MailConfig::default(), &SiteConfig::default());
        assert!(service.send_contact_notification(&contact()).await.is_err());
    }
}
