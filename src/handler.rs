//! Account-level mail handler
//!
//! A [`MailHandler`] is what a dispatcher resolves an account name to.
//! [`ClassicHandler`] serves classic IMAP/SMTP accounts; other
//! backends implement the same trait.

use crate::client::MailClient;
use crate::config::AccountConfig;
use crate::connection::ImapConnector;
use crate::error::Result;
use crate::folder::FolderInfo;
use crate::operation::OperationResult;
use crate::query::{PageQuery, PageResult};
use crate::session::Connector;
use crate::smtp::{MailSender, OutgoingEmail, SmtpSender};
use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::debug;

/// Mailbox operations for one configured account.
#[async_trait]
pub trait MailHandler: Send + Sync {
    /// One page of matching messages plus the total match count.
    async fn get_emails(&self, query: PageQuery) -> Result<PageResult>;

    async fn send_email(&self, email: &OutgoingEmail) -> Result<()>;

    async fn list_folders(&self) -> Result<Vec<FolderInfo>>;

    async fn create_folder(&self, name: &str) -> Result<bool>;

    async fn copy_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult>;

    async fn move_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult>;
}

/// IMAP for reading and organizing, SMTP for sending.
pub struct ClassicHandler<C: Connector, M: MailSender> {
    client: MailClient<C>,
    sender: M,
}

impl<C: Connector, M: MailSender> ClassicHandler<C, M> {
    pub const fn new(client: MailClient<C>, sender: M) -> Self {
        Self { client, sender }
    }

    pub const fn client(&self) -> &MailClient<C> {
        &self.client
    }
}

impl ClassicHandler<ImapConnector, SmtpSender> {
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the account's
    /// sender address is invalid.
    pub fn from_account(account: &AccountConfig) -> Result<Self> {
        let client = MailClient::new(ImapConnector::new(account.incoming.clone()))
            .with_mailbox(account.mailbox.clone());
        Ok(Self::new(client, SmtpSender::from_account(account)?))
    }
}

#[async_trait]
impl<C: Connector, M: MailSender> MailHandler for ClassicHandler<C, M> {
    async fn get_emails(&self, query: PageQuery) -> Result<PageResult> {
        query.validate()?;
        let offset = query.offset();

        let mut emails = Vec::new();
        let stream = self.client.stream_messages(query.clone());
        futures::pin_mut!(stream);
        let mut position = 0;
        while let Some(email) = stream.try_next().await? {
            if position >= offset {
                emails.push(email);
            }
            position += 1;
        }

        let total = self.client.count_matching(&query).await?;
        debug!(
            "Page {} of size {}: {} emails, {} total",
            query.page,
            query.page_size,
            emails.len(),
            total
        );
        Ok(PageResult {
            query,
            emails,
            total,
        })
    }

    async fn send_email(&self, email: &OutgoingEmail) -> Result<()> {
        self.sender.send(email).await
    }

    async fn list_folders(&self) -> Result<Vec<FolderInfo>> {
        self.client.list_folders().await
    }

    async fn create_folder(&self, name: &str) -> Result<bool> {
        self.client.create_folder(name).await
    }

    async fn copy_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult> {
        self.client.copy_emails(uids, destination).await
    }

    async fn move_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult> {
        self.client.move_emails(uids, destination).await
    }
}
