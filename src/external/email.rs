//! SMTP join-notification mailer built on `lettre`.
//!
//! The transport is blocking, so sends run on the blocking thread pool.
//! The roster dispatches each notification as a detached task and only
//! logs failures; nothing here may abort a committed roster change.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::EmailNotifier;
use crate::config::GatewayConfig;
use crate::domain::{EventRecord, UserRecord};

/// SMTP-backed [`EmailNotifier`].
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: String,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Builds the transport from configuration. Empty credentials select
    /// an unauthenticated connection (e.g. MailDev in development).
    ///
    /// # Errors
    ///
    /// Returns an error when the relay transport cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let mailer = if config.smtp_username.is_empty() || config.smtp_password.is_empty() {
            tracing::info!(
                smtp_host = %config.smtp_host,
                smtp_port = config.smtp_port,
                "SMTP credentials not configured, using unauthenticated connection"
            );
            SmtpTransport::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            SmtpTransport::relay(&config.smtp_host)?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from: config.smtp_from.clone(),
        })
    }
}

#[async_trait]
impl EmailNotifier for SmtpNotifier {
    async fn send_join_notification(
        &self,
        user: &UserRecord,
        event: &EventRecord,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Hello {},\n\n\
             You have been registered for \"{}\".\n\
             Starts: {}\n\
             Ends:   {}\n\n\
             See you there!",
            user.name,
            event.title,
            event.start_time.to_rfc3339(),
            event.end_time.to_rfc3339(),
        );

        let message = Message::builder()
            .from(self.from.parse()?)
            .to(user.email.parse()?)
            .subject(format!("Registered: {}", event.title))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&message)).await??;
        Ok(())
    }
}
