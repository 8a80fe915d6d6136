//! In-process IMAP server for integration tests
//!
//! Speaks just enough IMAP4rev1 to drive `ImapSession` end to end:
//! greeting, STARTTLS, LOGIN, LIST, CREATE, SELECT, UID SEARCH,
//! UID FETCH, UID COPY, UID STORE, EXPUNGE and LOGOUT. It does not
//! advertise or implement MOVE, so `UID MOVE` gets a `BAD` and the
//! client has to fall back to COPY + STORE.
//!
//! - `server`: listener, TLS upgrade, command loop
//! - `handlers/`: one file per command, each returning a `Response`
//! - `mailbox`: folder/message state and its builder
//! - `response`: response buffer shared by the handlers

#![allow(dead_code)]

pub mod mailbox;

pub use mailbox::MailboxBuilder;
pub use server::FakeImapServer;
