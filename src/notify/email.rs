use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Digest, Notifier};
use crate::config::EmailConfig;

/// HTML email over SMTP with implicit TLS (port 465).
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .with_context(|| format!("Invalid SMTP host {}", config.smtp_host))?
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();
        Ok(Self {
            mailer,
            from: config.user.parse().context("EMAIL_USER is not a valid address")?,
            to: config.to.parse().context("EMAIL_TO is not a valid address")?,
        })
    }

    fn message(&self, digest: &Digest) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest.title.clone())
            .header(ContentType::TEXT_HTML)
            .body(digest.body.clone())
            .context("Failed to build email")
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let message = self.message(digest)?;
        self.mailer.send(message).await.context("SMTP send failed")?;
        Ok(())
    }
}
