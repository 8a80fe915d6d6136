//! Outgoing mail over SMTP

use crate::config::{AccountConfig, ServerConfig, TlsMode};
use crate::error::{Error, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A plain-text message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

/// Sends messages for one account.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Send`] if the message cannot be built or the
    /// server rejects it.
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// [`MailSender`] backed by a `lettre` SMTP transport.
#[derive(Debug, Clone)]
pub struct SmtpSender {
    from: Mailbox,
    server: ServerConfig,
}

impl SmtpSender {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `email_address` is not a valid
    /// address.
    pub fn new(full_name: &str, email_address: &str, server: ServerConfig) -> Result<Self> {
        let address = email_address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid sender address {email_address}: {e}")))?;
        let name = (!full_name.is_empty()).then(|| full_name.to_string());
        Ok(Self {
            from: Mailbox::new(name, address),
            server,
        })
    }

    /// # Errors
    ///
    /// Same as [`SmtpSender::new`].
    pub fn from_account(account: &AccountConfig) -> Result<Self> {
        Self::new(
            &account.full_name,
            &account.email_address,
            account.outgoing.clone(),
        )
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        if email.recipients.is_empty() {
            return Err(Error::Send("At least one recipient is required".into()));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        builder = add_all(builder, &email.recipients, MessageBuilder::to)?;
        builder = add_all(builder, &email.cc, MessageBuilder::cc)?;
        builder = add_all(builder, &email.bcc, MessageBuilder::bcc)?;

        builder
            .body(email.body.clone())
            .map_err(|e| Error::Send(format!("Failed to build message: {e}")))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let parameters = TlsParameters::builder(self.server.host.clone())
            .dangerous_accept_invalid_certs(self.server.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Send(format!("TLS setup failed: {e}")))?;
        let tls = match self.server.tls {
            TlsMode::Implicit => Tls::Wrapper(parameters),
            TlsMode::StartTls => Tls::Required(parameters),
        };

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.server.host.as_str())
                .port(self.server.port)
                .tls(tls)
                .credentials(Credentials::new(
                    self.server.username.clone(),
                    self.server.password.clone(),
                ))
                .build(),
        )
    }
}

fn add_all(
    mut builder: MessageBuilder,
    addresses: &[String],
    add: fn(MessageBuilder, Mailbox) -> MessageBuilder,
) -> Result<MessageBuilder> {
    for address in addresses {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|e| Error::Send(format!("Invalid address {address}: {e}")))?;
        builder = add(builder, mailbox);
    }
    Ok(builder)
}

#[async_trait]
impl MailSender for SmtpSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.build_message(email)?;
        debug!(
            "Sending via {}:{} ({})",
            self.server.host, self.server.port, self.server.tls
        );

        self.transport()?
            .send(message)
            .await
            .map_err(|e| Error::Send(e.to_string()))?;

        info!(
            "Sent '{}' to {} recipients",
            email.subject,
            email.recipients.len() + email.cc.len() + email.bcc.len()
        );
        Ok(())
    }
}
