use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::config::Config;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Outbound notification channel.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    retry_delay_ms: u64,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish()
    }
}

impl SmtpMailer {
    /// Plain SMTP when no credentials are configured (local MailHog), STARTTLS otherwise.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };

        let from = config
            .mail_from
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(config.mail_from.clone()))?;

        Ok(SmtpMailer {
            transport,
            from,
            retry_delay_ms: RETRY_DELAY_MS,
        })
    }

    async fn send_once(&self, to: &Mailbox, subject: &str, html: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|_| MailError::InvalidAddress(to.to_string()))?;

        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_once(&recipient, subject, html).await {
                Ok(()) => {
                    tracing::info!("✓ Email sent successfully to {}", to);
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                    if attempt < MAX_RETRIES {
                        let delay = self.retry_delay_ms * (2_u64.pow(attempt - 1)); // Exponential backoff
                        tracing::warn!(
                            "Email send attempt {} failed for {}. Retrying in {}ms...",
                            attempt,
                            to,
                            delay
                        );
                        sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        let last = last_error.unwrap_or_else(|| "Unknown email sending error".to_string());
        tracing::error!("✗ Email failed for {}: {}", to, last);
        Err(MailError::Exhausted {
            attempts: MAX_RETRIES,
            last,
        })
    }
}
