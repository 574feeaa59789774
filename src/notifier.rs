// src/notifier.rs
//
// Outbound email for new leads.

use async_trait::async_trait;
use htmlescape::encode_minimal as escape_html;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials as SmtpCredentials,
    AsyncSmtpTransport, AsyncTransport, Message as MailMessage, Tokio1Executor,
};
use log::{info, warn};
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::Lead;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(String),
    #[error("smtp: {0}")]
    Smtp(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), NotifyError>;

    /// Recipient for operator notifications.
    fn admin_address(&self) -> Option<&str>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, user: &str, password: &str) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(config.port)
            .credentials(SmtpCredentials::new(user.to_string(), password.to_string()))
            .build();
        let from = user
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(e.to_string()))?;
        Ok(Self {
            transport,
            from,
            admin: config.admin_email.clone().unwrap_or_else(|| user.to_string()),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(e.to_string()))?;
        let message = MailMessage::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        info!("Email sent to {}", email.to);
        Ok(())
    }

    fn admin_address(&self) -> Option<&str> {
        Some(&self.admin)
    }
}

/// Stand-in used when SMTP credentials are not configured.
pub struct LogNotifier {
    admin: Option<String>,
}

impl LogNotifier {
    pub fn new(admin: Option<String>) -> Self {
        Self { admin }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        info!("[EMAIL] Would send to {}: {}", email.to, email.subject);
        Ok(())
    }

    fn admin_address(&self) -> Option<&str> {
        self.admin.as_deref()
    }
}

/// Picks the SMTP notifier when credentials exist, else the logging one.
pub fn from_config(config: &SmtpConfig) -> Box<dyn Notifier> {
    match config.credentials() {
        Some((user, password)) => match SmtpNotifier::new(config, user, password) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                warn!("SMTP notifier disabled: {}", e);
                Box::new(LogNotifier::new(config.admin_email.clone()))
            }
        },
        None => Box::new(LogNotifier::new(config.admin_email.clone())),
    }
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        escape_html(value)
    }
}

pub fn lead_email(to: &str, lead: &Lead) -> Email {
    let name = if lead.name.trim().is_empty() { "Unknown" } else { lead.name.as_str() };
    let html_body = format!(
        "<html>\n<body>\n\
         <h2>New Lead Received</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Mobile:</strong> {}</p>\n\
         <p><strong>Project:</strong> {}</p>\n\
         <p><strong>Project Type:</strong> {}</p>\n\
         <p><strong>Project Details:</strong> {}</p>\n\
         <hr>\n\
         <p><em>Please contact this lead as soon as possible.</em></p>\n\
         </body>\n</html>\n",
        or_na(&lead.name),
        or_na(&lead.email),
        or_na(&lead.mobile),
        or_na(&lead.project),
        or_na(&lead.project_type),
        or_na(&lead.project_details),
    );
    Email {
        to: to.to_string(),
        subject: format!("New Lead: {}", name),
        html_body,
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every email; optionally fails each send.
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Email>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, email: Email) -> Result<(), NotifyError> {
            self.sent.lock().await.push(email);
            if self.fail {
                return Err(NotifyError::Smtp("connection refused".into()));
            }
            Ok(())
        }

        fn admin_address(&self) -> Option<&str> {
            Some("admin@example.com")
        }
    }
}
