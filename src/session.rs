//! Transport session capability
//!
//! The mail client never talks to a concrete protocol library. It
//! drives a [`MailSession`], obtained from a [`Connector`] and owned
//! through a [`SessionGuard`] for exactly one logical operation. The
//! `async-imap` backed [`ImapSession`] is the reference
//! implementation.

use crate::error::{Error, Result};
use async_imap::types::{Fetch, Name, NameAttribute};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::fmt;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use tracing::{debug, warn};

/// Status token of a tagged server reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    No,
    Bad,
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        })
    }
}

/// Tagged completion of a command that may legitimately be refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: ReplyStatus,
    pub text: String,
}

impl Reply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: ReplyStatus::Ok,
            text: String::new(),
        }
    }

    #[must_use]
    pub fn no(text: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::No,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn bad(text: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Bad,
            text: text.into(),
        }
    }

    /// Only an `OK` status counts as acceptance.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} {}", self.status, self.text)
        }
    }
}

/// A message as returned by `UID FETCH`, before decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub uid: u32,
    pub body: Vec<u8>,
    pub internal_date: Option<DateTime<Utc>>,
}

/// An authenticated protocol session.
///
/// Methods returning [`Reply`] report a server refusal as
/// `Ok(reply)` with a non-OK status; `Err` means the command raised
/// (transport fault, unsupported command, malformed response).
#[async_trait]
pub trait MailSession: Send {
    async fn select(&mut self, mailbox: &str) -> Result<()>;

    async fn uid_search(&mut self, criteria: &str) -> Result<Vec<u32>>;

    async fn uid_fetch(&mut self, uid: u32) -> Result<Option<RawMessage>>;

    async fn uid_copy(&mut self, uid: u32, mailbox: &str) -> Result<Reply>;

    async fn uid_move(&mut self, uid: u32, mailbox: &str) -> Result<Reply>;

    /// Issue `UID STORE <uid> <query>`, e.g. `+FLAGS.SILENT (\Deleted)`.
    async fn uid_store(&mut self, uid: u32, query: &str) -> Result<Reply>;

    /// LIST reply lines in `(<attributes>) "<delimiter>" "<name>"` form.
    async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>>;

    async fn create(&mut self, name: &str) -> Result<Reply>;

    async fn expunge(&mut self) -> Result<()>;

    async fn logout(&mut self) -> Result<()>;
}

/// Opens authenticated sessions for one account.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: MailSession + 'static;

    /// Connect and authenticate.
    async fn connect(&self) -> Result<Self::Session>;
}

/// Exclusive ownership of one session for the span of one operation.
///
/// [`SessionGuard::close`] logs out exactly once. A guard dropped
/// without closing (cancelled future, abandoned stream, early return)
/// hands the session to a background task that logs it out.
pub struct SessionGuard<S: MailSession + 'static> {
    session: Option<S>,
}

impl<S: MailSession + 'static> SessionGuard<S> {
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The guarded session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] once the session has been released.
    pub fn session(&mut self) -> Result<&mut S> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Connection("Session already released".into()))
    }

    /// Log out and release the session.
    pub async fn close(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.logout().await {
                warn!("Logout failed: {}", e);
            }
        }
    }
}

impl<S: MailSession + 'static> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        debug!("Session released without close, logging out in background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = session.logout().await {
                    warn!("Background logout failed: {}", e);
                }
            });
        }
    }
}

/// A TLS stream as consumed by `async-imap`.
pub type TlsStream = Compat<tokio_rustls::client::TlsStream<TcpStream>>;

/// [`MailSession`] over an `async-imap` session.
pub struct ImapSession {
    inner: async_imap::Session<TlsStream>,
}

impl fmt::Debug for ImapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSession").finish_non_exhaustive()
    }
}

impl ImapSession {
    #[must_use]
    pub const fn new(inner: async_imap::Session<TlsStream>) -> Self {
        Self { inner }
    }
}

/// Fold a per-item command outcome into a [`Reply`]; only faults that
/// are not a tagged server answer stay errors.
fn into_reply(command: &str, outcome: async_imap::error::Result<()>) -> Result<Reply> {
    match outcome {
        Ok(()) => Ok(Reply::ok()),
        Err(async_imap::error::Error::No(text)) => Ok(Reply::no(text)),
        Err(async_imap::error::Error::Bad(text)) => Ok(Reply::bad(text)),
        Err(e) => Err(Error::Protocol(format!("{command} failed: {e}"))),
    }
}

fn render_list_line(name: &Name) -> String {
    let attributes: Vec<String> = name.attributes().iter().map(attribute_token).collect();
    let delimiter = name
        .delimiter()
        .map_or_else(|| "NIL".to_string(), quote);
    format!(
        "({}) {} {}",
        attributes.join(" "),
        delimiter,
        quote(name.name())
    )
}

fn attribute_token(attribute: &NameAttribute<'_>) -> String {
    match attribute {
        NameAttribute::Extension(ext) => format!("\\{}", ext.trim_start_matches('\\')),
        other => format!("\\{other:?}"),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn decode_fetch(uid: u32, fetch: &Fetch) -> Option<RawMessage> {
    let body = fetch.body()?;
    Some(RawMessage {
        uid: fetch.uid.unwrap_or(uid),
        body: body.to_vec(),
        internal_date: fetch.internal_date().map(|d| d.with_timezone(&Utc)),
    })
}

#[async_trait]
impl MailSession for ImapSession {
    async fn select(&mut self, mailbox: &str) -> Result<()> {
        self.inner
            .select(mailbox)
            .await
            .map_err(|e| Error::Protocol(format!("Failed to select {mailbox}: {e}")))?;
        Ok(())
    }

    async fn uid_search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let uids = self
            .inner
            .uid_search(criteria)
            .await
            .map_err(|e| Error::Protocol(format!("Search failed: {e}")))?;
        Ok(uids.into_iter().collect())
    }

    async fn uid_fetch(&mut self, uid: u32) -> Result<Option<RawMessage>> {
        let uid_set = uid.to_string();
        let fetches: Vec<Fetch> = self
            .inner
            .uid_fetch(uid_set.as_str(), "(UID INTERNALDATE BODY.PEEK[])")
            .await
            .map_err(|e| Error::Protocol(format!("Fetch failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| Error::Protocol(format!("Fetch error: {e}")))?;

        Ok(fetches.iter().find_map(|fetch| decode_fetch(uid, fetch)))
    }

    async fn uid_copy(&mut self, uid: u32, mailbox: &str) -> Result<Reply> {
        let uid_set = uid.to_string();
        let outcome = self.inner.uid_copy(uid_set.as_str(), mailbox).await;
        into_reply("UID COPY", outcome)
    }

    async fn uid_move(&mut self, uid: u32, mailbox: &str) -> Result<Reply> {
        let uid_set = uid.to_string();
        let outcome = self.inner.uid_mv(uid_set.as_str(), mailbox).await;
        into_reply("UID MOVE", outcome)
    }

    async fn uid_store(&mut self, uid: u32, query: &str) -> Result<Reply> {
        let uid_set = uid.to_string();
        let outcome = match self.inner.uid_store(uid_set.as_str(), query).await {
            Ok(updates) => updates.try_collect::<Vec<Fetch>>().await.map(|_| ()),
            Err(e) => Err(e),
        };
        into_reply("UID STORE", outcome)
    }

    async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>> {
        let names: Vec<Name> = self
            .inner
            .list(Some(reference), Some(pattern))
            .await
            .map_err(|e| Error::Protocol(format!("List folders failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| Error::Protocol(format!("List folders failed: {e}")))?;

        Ok(names.iter().map(render_list_line).collect())
    }

    async fn create(&mut self, name: &str) -> Result<Reply> {
        let outcome = self.inner.create(name).await;
        into_reply("CREATE", outcome)
    }

    async fn expunge(&mut self) -> Result<()> {
        let expunged: Vec<u32> = self
            .inner
            .expunge()
            .await
            .map_err(|e| Error::Protocol(format!("Expunge failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| Error::Protocol(format!("Expunge failed: {e}")))?;
        debug!("Expunged {} messages", expunged.len());
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        self.inner
            .logout()
            .await
            .map_err(|e| Error::Protocol(format!("Logout failed: {e}")))
    }
}
