//! Invitation email delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport. If `SMTP_HOST`
//! is not set, [`EmailConfig::from_env`] returns `None` and the invite
//! dispatcher logs acceptance links instead of mailing them.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use taxdesk_core::types::Timestamp;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@taxdesk.local";

/// Default firm name used in email copy when `FIRM_NAME` is not set.
const DEFAULT_FIRM_NAME: &str = "Taxdesk";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Firm name shown in the subject and greeting.
    pub firm_name: String,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                  |
    /// |-----------------|----------|--------------------------|
    /// | `SMTP_HOST`     | yes      | --                       |
    /// | `SMTP_PORT`     | no       | `587`                    |
    /// | `SMTP_FROM`     | no       | `noreply@taxdesk.local`  |
    /// | `SMTP_USER`     | no       | --                       |
    /// | `SMTP_PASSWORD` | no       | --                       |
    /// | `FIRM_NAME`     | no       | `Taxdesk`                |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            firm_name: std::env::var("FIRM_NAME")
                .unwrap_or_else(|_| DEFAULT_FIRM_NAME.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

/// Subject and plain-text body of an invitation email.
pub fn invite_message(
    firm_name: &str,
    recipient_name: Option<&str>,
    link: &str,
    expires_at: Timestamp,
) -> (String, String) {
    let greeting = match recipient_name {
        Some(name) if !name.trim().is_empty() => format!("Hello {},", name.trim()),
        _ => "Hello,".to_string(),
    };
    let subject = format!("[{firm_name}] You're invited to your client portal");
    let body = format!(
        "{greeting}\n\n\
         {firm_name} has invited you to the client portal, where you can sign your \
         engagement letter, upload tax documents and message your preparer.\n\n\
         Accept your invitation here:\n{link}\n\n\
         This link expires on {}.\n",
        expires_at.format("%B %-d, %Y")
    );
    (subject, body)
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends invitation emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            config,
        })
    }

    /// Send an invitation carrying the acceptance `link`.
    pub async fn send_invite(
        &self,
        to_email: &str,
        recipient_name: Option<&str>,
        link: &str,
        expires_at: Timestamp,
    ) -> Result<(), EmailError> {
        let (subject, body) =
            invite_message(&self.config.firm_name, recipient_name, link, expires_at);

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.mailer.send(email).await?;

        tracing::info!(to = to_email, "Invitation email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn invite_message_includes_link_and_expiry() {
        let expires = chrono::Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        let (subject, body) = invite_message(
            "Smith & Co",
            Some(" Jane "),
            "https://portal.example.com/invite/accept?token=abc",
            expires,
        );
        assert_eq!(subject, "[Smith & Co] You're invited to your client portal");
        assert!(body.starts_with("Hello Jane,"));
        assert!(body.contains("https://portal.example.com/invite/accept?token=abc"));
        assert!(body.contains("March 5, 2026"));
    }

    #[test]
    fn invite_message_without_name() {
        let (_, body) = invite_message("Firm", None, "link", chrono::Utc::now());
        assert!(body.starts_with("Hello,\n"));
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
