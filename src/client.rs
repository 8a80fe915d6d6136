//! Mail client
//!
//! Every public method opens its own session through the
//! [`Connector`], does its work, and logs out before returning. No
//! session outlives the call that opened it.

use crate::error::Result;
use crate::flag::Flag;
use crate::folder::FolderInfo;
use crate::message::EmailMessage;
use crate::operation::{BulkKind, OperationResult, Tally};
use crate::query::PageQuery;
use crate::session::{Connector, MailSession, SessionGuard};
use async_stream::try_stream;
use futures::Stream;
use tracing::{debug, info, warn};

/// Mailbox operations for one account.
pub struct MailClient<C: Connector> {
    connector: C,
    mailbox: String,
}

impl<C: Connector> MailClient<C> {
    /// Client searching and moving out of `INBOX`.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            mailbox: "INBOX".to_string(),
        }
    }

    /// Use `mailbox` as the source of search, count, copy and move.
    #[must_use]
    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    async fn open(&self) -> Result<SessionGuard<C::Session>> {
        let session = self.connector.connect().await?;
        Ok(SessionGuard::new(session))
    }

    /// List every folder on the server.
    ///
    /// Lines that cannot be parsed are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login or LIST fails.
    pub async fn list_folders(&self) -> Result<Vec<FolderInfo>> {
        let mut guard = self.open().await?;
        let lines = guard.session()?.list("", "*").await;
        guard.close().await;

        let folders: Vec<FolderInfo> = lines?
            .iter()
            .filter_map(|line| {
                FolderInfo::parse(line)
                    .map_err(|e| warn!("Skipping folder: {}", e))
                    .ok()
            })
            .collect();
        debug!("Listed {} folders", folders.len());
        Ok(folders)
    }

    /// Create a folder. A refusal (name taken, invalid name) is
    /// reported as `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or login fails, or if the
    /// CREATE command fails at the transport level.
    pub async fn create_folder(&self, name: &str) -> Result<bool> {
        let mut guard = self.open().await?;
        let reply = guard.session()?.create(name).await;
        guard.close().await;

        let reply = reply?;
        if reply.is_ok() {
            info!("Created folder {}", name);
        } else {
            warn!("Folder {} not created: {}", name, reply);
        }
        Ok(reply.is_ok())
    }

    /// Messages matching `query`'s filters in its sort order, at most
    /// `page * page_size` of them.
    ///
    /// Each message is fetched whole (`BODY.PEEK[]`), so the cost grows
    /// with [`PageQuery::limit`], not with the page size. Bodies that
    /// cannot be decoded are skipped. Dropping the stream before it
    /// ends still logs the session out.
    pub fn stream_messages(&self, query: PageQuery) -> impl Stream<Item = Result<EmailMessage>> + Send + '_ {
        try_stream! {
            let mut guard = self.open().await?;
            let uids = self.matching_uids(guard.session()?, &query).await?;
            let limit = query.limit();
            let mut produced = 0;

            for uid in uids {
                if produced >= limit {
                    break;
                }
                let Some(raw) = guard.session()?.uid_fetch(uid).await? else {
                    warn!("UID {} returned no body, skipping", uid);
                    continue;
                };
                match EmailMessage::from_raw(&raw) {
                    Ok(email) => {
                        produced += 1;
                        yield email;
                    }
                    Err(e) => warn!("Skipping undecodable message: {}", e),
                }
            }

            guard.close().await;
        }
    }

    /// Number of messages matching `query`'s filters, ignoring the
    /// page window.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, SELECT or SEARCH
    /// fails.
    pub async fn count_matching(&self, query: &PageQuery) -> Result<usize> {
        let mut guard = self.open().await?;
        let uids = self.matching_uids(guard.session()?, query).await;
        guard.close().await;
        Ok(uids?.len())
    }

    async fn matching_uids(&self, session: &mut C::Session, query: &PageQuery) -> Result<Vec<u32>> {
        session.select(&self.mailbox).await?;
        let criteria = query.search_criteria();
        let mut uids = session.uid_search(&criteria).await?;
        query.order.sort(&mut uids);
        debug!("{} messages match '{}'", uids.len(), criteria);
        Ok(uids)
    }

    /// Copy each UID to `destination`, in order. A refused UID is
    /// recorded and the rest are still attempted.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login or SELECT fails.
    pub async fn copy_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult> {
        let mut guard = self.open().await?;
        let outcome = self.copy_in(guard.session()?, uids, destination).await;
        guard.close().await;
        outcome
    }

    async fn copy_in(
        &self,
        session: &mut C::Session,
        uids: &[String],
        destination: &str,
    ) -> Result<OperationResult> {
        session.select(&self.mailbox).await?;

        let mut tally = Tally::new(BulkKind::Copy);
        for raw_uid in uids {
            let Some(uid) = parse_uid(raw_uid) else {
                warn!("Invalid UID {:?}", raw_uid);
                tally.fail(raw_uid);
                continue;
            };
            match session.uid_copy(uid, destination).await {
                Ok(reply) if reply.is_ok() => tally.succeed(),
                Ok(reply) => {
                    warn!("UID COPY {} to {} refused: {}", uid, destination, reply);
                    tally.fail(raw_uid);
                }
                Err(e) => {
                    warn!("UID COPY {} to {} failed: {}", uid, destination, e);
                    tally.fail(raw_uid);
                }
            }
        }

        let result = tally.finish();
        info!("{}", result.message);
        Ok(result)
    }

    /// Move each UID to `destination`, in order, then expunge once.
    ///
    /// Each UID is tried with `UID MOVE` first; if that is refused or
    /// raises, the UID is copied and flagged `\Deleted` instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login or SELECT fails.
    pub async fn move_emails(&self, uids: &[String], destination: &str) -> Result<OperationResult> {
        let mut guard = self.open().await?;
        let outcome = self.move_in(guard.session()?, uids, destination).await;
        guard.close().await;
        outcome
    }

    async fn move_in(
        &self,
        session: &mut C::Session,
        uids: &[String],
        destination: &str,
    ) -> Result<OperationResult> {
        session.select(&self.mailbox).await?;

        let mut tally = Tally::new(BulkKind::Move);
        for raw_uid in uids {
            let Some(uid) = parse_uid(raw_uid) else {
                warn!("Invalid UID {:?}", raw_uid);
                tally.fail(raw_uid);
                continue;
            };
            if move_one(session, uid, destination).await {
                tally.succeed();
            } else {
                tally.fail(raw_uid);
            }
        }

        // Purges fallback originals; runs even when every UID moved
        // natively.
        if let Err(e) = session.expunge().await {
            warn!("Expunge after move failed: {}", e);
            tally.note(format!("expunge failed: {e}"));
        }

        let result = tally.finish();
        info!("{}", result.message);
        Ok(result)
    }
}

async fn move_one<S: MailSession>(session: &mut S, uid: u32, destination: &str) -> bool {
    match session.uid_move(uid, destination).await {
        Ok(reply) if reply.is_ok() => return true,
        Ok(reply) => debug!("UID MOVE {} refused ({}), falling back to COPY", uid, reply),
        Err(e) => debug!("UID MOVE {} failed ({}), falling back to COPY", uid, e),
    }

    match session.uid_copy(uid, destination).await {
        Ok(reply) if reply.is_ok() => {}
        Ok(reply) => {
            warn!("UID COPY {} to {} refused: {}", uid, destination, reply);
            return false;
        }
        Err(e) => {
            warn!("UID COPY {} to {} failed: {}", uid, destination, e);
            return false;
        }
    }

    let delete = Flag::Deleted.add_silent();
    match session.uid_store(uid, &delete).await {
        Ok(reply) if reply.is_ok() => true,
        Ok(reply) => {
            warn!("UID STORE {} refused after copy: {}", uid, reply);
            false
        }
        Err(e) => {
            warn!("UID STORE {} failed after copy: {}", uid, e);
            false
        }
    }
}

/// A UID is a positive 32-bit decimal; anything else (ranges, `*`,
/// signs) is rejected before it reaches the wire.
fn parse_uid(uid: &str) -> Option<u32> {
    if uid.is_empty() || !uid.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    uid.parse().ok().filter(|&n| n > 0)
}
