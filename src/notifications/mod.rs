use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MailConfig;

pub mod templates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub kind: &'static str,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mail task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotificationError>;
}

/// Sends one notification; failures are logged and never reach the caller.
pub async fn deliver(mailer: &dyn Mailer, email: OutgoingEmail) {
    let kind = email.kind;
    match mailer.send(email).await {
        Ok(()) => debug!(kind, "notification sent"),
        Err(e) => warn!(kind, error = %e, "notification failed"),
    }
}

pub fn from_config(cfg: Option<&MailConfig>) -> anyhow::Result<Arc<dyn Mailer>> {
    match cfg {
        Some(cfg) => Ok(Arc::new(SmtpMailer::new(cfg)?)),
        None => {
            info!("SMTP_HOST not set; outbound mail disabled");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let mut builder = SmtpTransport::starttls_relay(&cfg.host)?.port(cfg.port);
        if !cfg.username.is_empty() {
            builder =
                builder.credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()));
        }
        let transport = builder.build();
        let from = format!("Course Platform <{}>", cfg.from).parse::<Mailbox>()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotificationError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)?;

        // lettre's SmtpTransport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message)).await??;
        Ok(())
    }
}

/// Stand-in used when no SMTP relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotificationError> {
        info!(kind = email.kind, to = %email.to, subject = %email.subject, "mail disabled; dropping notification");
        Ok(())
    }
}
