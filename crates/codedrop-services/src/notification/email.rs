//! SMTP notifier

use std::sync::Arc;

use async_trait::async_trait;
use codedrop_core::Config;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{AccessNotice, Notifier, NotifyError};

/// Sends each recipient their access code by email.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Create from config. Returns `None` if notifications are disabled or SMTP is incomplete.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_notifications_enabled() {
            tracing::debug!("Email notifications disabled (EMAIL_NOTIFICATIONS_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host()?;
        let from: Mailbox = match config.smtp_from()?.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid SMTP_FROM; email notifications disabled");
                return None;
            }
        };
        let port = config.smtp_port();
        let credentials = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.to_string(), p.to_string())),
            _ => None,
        };

        let mailer = if config.smtp_tls() {
            let builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(builder) => builder.port(port),
                Err(e) => {
                    tracing::warn!(error = %e, host = %host, "Invalid SMTP relay; email notifications disabled");
                    return None;
                }
            };
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP with STARTTLS)");
            builder.build()
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP)");
            builder.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    fn build_message(&self, notice: &AccessNotice) -> Result<Message, NotifyError> {
        let to: Mailbox = notice
            .recipient
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(notice.recipient.clone()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject(notice))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(notice))
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

fn subject(notice: &AccessNotice) -> String {
    format!("Secure file access: {}", notice.file_name)
}

fn render_body(notice: &AccessNotice) -> String {
    format!(
        "A file has been securely shared with you.\n\
         \n\
         Shared by: {} <{}>\n\
         File: {}\n\
         \n\
         Your access code: {}\n\
         \n\
         The file stays available for {} minutes after your first download.\n\
         \n\
         Do not share this code with anyone.\n",
        notice.owner_name,
        notice.owner_email,
        notice.file_name,
        notice.access_code.expose(),
        notice.expiry_duration_minutes,
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notice: &AccessNotice) -> Result<(), NotifyError> {
        let message = self.build_message(notice)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::info!(
            recipient = %notice.recipient,
            file_name = %notice.file_name,
            "Access code email sent"
        );
        Ok(())
    }
}
