//! Mail client core for IMAP/SMTP accounts
//!
//! Each configured account is served by a [`MailHandler`]. The
//! classic implementation, [`ClassicHandler`], reads and organizes
//! mail over IMAP through a [`MailClient`] and sends over SMTP.
//!
//! The client opens a fresh authenticated session for every call and
//! logs it out on every exit path. Searches are streamed and
//! paginated after filtering. Bulk copy and move record per-UID
//! failures in an [`OperationResult`] instead of aborting, and move
//! falls back to COPY + `\Deleted` + EXPUNGE on servers without the
//! MOVE extension.

mod client;
mod config;
mod connection;
mod error;
mod flag;
mod folder;
mod handler;
mod message;
mod operation;
mod query;
mod session;
mod smtp;

#[cfg(test)]
mod testing;

pub use client::MailClient;
pub use config::{AccountConfig, ServerConfig, TlsMode};
pub use connection::ImapConnector;
pub use error::{Error, Result};
pub use folder::FolderInfo;
pub use handler::{ClassicHandler, MailHandler};
pub use message::EmailMessage;
pub use operation::OperationResult;
pub use query::{PageQuery, PageResult, SortOrder};
pub use session::{Connector, ImapSession, MailSession, RawMessage, Reply, ReplyStatus, SessionGuard};
pub use smtp::{MailSender, OutgoingEmail, SmtpSender};
