//! SMTP delivery
//!
//! Delivery walks the SMTP conversation one stage at a time so that each
//! failure can be reported as the stage it happened in:
//!
//! ```text
//! connect (implicit TLS, else plain + STARTTLS) -> AUTH? -> MAIL FROM -> RCPT TO -> DATA -> QUIT
//! ```
//!
//! Nothing is retried.

use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::Error as SmtpError;
use lettre::Message;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to connect to SMTP server {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: SmtpError,
    },

    #[error("failed to start TLS: {0}")]
    StartTls(#[source] SmtpError),

    #[error("failed to authenticate: {0}")]
    Auth(#[source] SmtpError),

    #[error("failed to set sender: {0}")]
    Sender(#[source] SmtpError),

    #[error("failed to set recipient: {0}")]
    Recipient(#[source] SmtpError),

    #[error("failed to send message data: {0}")]
    Data(#[source] SmtpError),

    #[error("failed to close SMTP session: {0}")]
    Quit(#[source] SmtpError),

    #[error("failed to read SMTP password file {}: {source}", path.display())]
    PasswordFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no sender email address configured")]
    MissingSender,

    #[error("no recipient email address configured")]
    MissingRecipient,

    #[error("invalid email address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("failed to build email: {0}")]
    Compose(#[source] lettre::error::Error),

    #[error("failed to render email template: {0}")]
    Render(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// SMTP server coordinates with the password already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpServer {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
}

impl SmtpServer {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A composed message, before MIME encoding
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    /// May include a display name: `Backups <backup@example.com>`
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingMail {
    /// Encode as a multipart/alternative message
    pub fn to_message(&self) -> Result<Message, NotifyError> {
        Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(&self.to)?)
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                self.html.clone(),
            ))
            .map_err(NotifyError::Compose)
    }
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| NotifyError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Abstraction over mail delivery, enabling mocking in tests
pub trait MailTransport: Send + Sync {
    fn send(&self, server: &SmtpServer, mail: &OutgoingMail) -> Result<(), NotifyError>;
}

/// Real delivery over SMTP
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }

    fn connect(server: &SmtpServer) -> Result<SmtpConnection, NotifyError> {
        let address = server.address();
        let hello = ClientId::default();
        let connect_err = |source| NotifyError::Connect {
            address: address.clone(),
            source,
        };

        if server.tls {
            let tls = TlsParameters::new(server.host.clone()).map_err(NotifyError::StartTls)?;

            // Implicit TLS (port 465 style) first
            match SmtpConnection::connect(
                (server.host.as_str(), server.port),
                None,
                &hello,
                Some(&tls),
                None,
            ) {
                Ok(conn) => {
                    debug!("Connected to {} with implicit TLS", address);
                    return Ok(conn);
                }
                Err(e) => debug!("Implicit TLS to {} failed ({}), trying STARTTLS", address, e),
            }

            let mut conn = SmtpConnection::connect(
                (server.host.as_str(), server.port),
                None,
                &hello,
                None,
                None,
            )
            .map_err(connect_err)?;
            conn.starttls(&tls, &hello).map_err(NotifyError::StartTls)?;
            return Ok(conn);
        }

        let mut conn = SmtpConnection::connect(
            (server.host.as_str(), server.port),
            None,
            &hello,
            None,
            None,
        )
        .map_err(connect_err)?;

        // Upgrade opportunistically when the server offers it
        if conn.can_starttls() {
            let tls = TlsParameters::new(server.host.clone()).map_err(NotifyError::StartTls)?;
            conn.starttls(&tls, &hello).map_err(NotifyError::StartTls)?;
        }
        Ok(conn)
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, server: &SmtpServer, mail: &OutgoingMail) -> Result<(), NotifyError> {
        let from = parse_mailbox(&mail.from)?;
        let to = parse_mailbox(&mail.to)?;
        let body = mail.to_message()?.formatted();

        let mut conn = Self::connect(server)?;

        if !server.username.is_empty() {
            let credentials = Credentials::new(server.username.clone(), server.password.clone());
            conn.auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
                .map_err(NotifyError::Auth)?;
        }

        conn.command(Mail::new(Some(from.email), vec![]))
            .map_err(NotifyError::Sender)?;
        conn.command(Rcpt::new(to.email, vec![]))
            .map_err(NotifyError::Recipient)?;
        conn.command(Data).map_err(NotifyError::Data)?;
        conn.message(&body).map_err(NotifyError::Data)?;
        conn.quit().map_err(NotifyError::Quit)?;

        info!("Sent email '{}' to {}", mail.subject, mail.to);
        Ok(())
    }
}

/// A mock transport for testing that records sent mail
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub sent: Arc<Mutex<Vec<(SmtpServer, OutgoingMail)>>>,
        failure: Option<String>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every send fails with [`NotifyError::Transport`]
        pub fn failing(message: &str) -> Self {
            Self {
                sent: Arc::default(),
                failure: Some(message.to_string()),
            }
        }

        pub fn sent(&self) -> Vec<(SmtpServer, OutgoingMail)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn send_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl MailTransport for MockTransport {
        fn send(&self, server: &SmtpServer, mail: &OutgoingMail) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((server.clone(), mail.clone()));
            match self.failure {
                Some(ref message) => Err(NotifyError::Transport(message.clone())),
                None => Ok(()),
            }
        }
    }
}
