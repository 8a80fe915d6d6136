//! Scripted in-memory transport for unit tests.
//!
//! `ScriptedSession` answers every command from a `Script` and
//! records it in a shared `CallLog`, so tests can assert on the exact
//! command sequence a client operation produced.

use crate::error::{Error, Result};
use crate::session::{Connector, MailSession, RawMessage, Reply};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    Select(String),
    Search(String),
    Fetch(u32),
    Copy(u32, String),
    Move(u32, String),
    Store(u32, String),
    List(String, String),
    Create(String),
    Expunge,
    Logout,
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }
}

/// Scripted outcome of a per-item command.
#[derive(Debug, Clone)]
pub enum Outcome {
    Reply(Reply),
    Raise(String),
}

impl Outcome {
    fn resolve(&self) -> Result<Reply> {
        match self {
            Self::Reply(reply) => Ok(reply.clone()),
            Self::Raise(msg) => Err(Error::Protocol(msg.clone())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub list_lines: Vec<String>,
    pub create: Option<Reply>,
    pub messages: BTreeMap<u32, Vec<u8>>,
    pub copy: HashMap<u32, Outcome>,
    pub moves: HashMap<u32, Outcome>,
    pub store: HashMap<u32, Outcome>,
    pub reject_select: bool,
    pub fail_fetch: bool,
    pub fail_expunge: bool,
}

impl Script {
    pub fn message(mut self, uid: u32, raw: &[u8]) -> Self {
        self.messages.insert(uid, raw.to_vec());
        self
    }

    pub fn copy(mut self, uid: u32, outcome: Outcome) -> Self {
        self.copy.insert(uid, outcome);
        self
    }

    pub fn moves(mut self, uid: u32, outcome: Outcome) -> Self {
        self.moves.insert(uid, outcome);
        self
    }

    pub fn store(mut self, uid: u32, outcome: Outcome) -> Self {
        self.store.insert(uid, outcome);
        self
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    script: Script,
    log: CallLog,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            script: Script::default(),
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

fn scripted(table: &HashMap<u32, Outcome>, uid: u32) -> Result<Reply> {
    table.get(&uid).map_or_else(|| Ok(Reply::ok()), Outcome::resolve)
}

#[async_trait]
impl MailSession for ScriptedSession {
    async fn select(&mut self, mailbox: &str) -> Result<()> {
        self.log.push(Call::Select(mailbox.to_string()));
        if self.script.reject_select {
            return Err(Error::Protocol(format!("Failed to select {mailbox}: NO")));
        }
        Ok(())
    }

    async fn uid_search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        self.log.push(Call::Search(criteria.to_string()));
        Ok(self.script.messages.keys().copied().collect())
    }

    async fn uid_fetch(&mut self, uid: u32) -> Result<Option<RawMessage>> {
        self.log.push(Call::Fetch(uid));
        if self.script.fail_fetch {
            return Err(Error::Protocol("Fetch failed: connection reset".into()));
        }
        Ok(self.script.messages.get(&uid).map(|body| RawMessage {
            uid,
            body: body.clone(),
            internal_date: Some(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()),
        }))
    }

    async fn uid_copy(&mut self, uid: u32, mailbox: &str) -> Result<Reply> {
        self.log.push(Call::Copy(uid, mailbox.to_string()));
        scripted(&self.script.copy, uid)
    }

    async fn uid_move(&mut self, uid: u32, mailbox: &str) -> Result<Reply> {
        self.log.push(Call::Move(uid, mailbox.to_string()));
        scripted(&self.script.moves, uid)
    }

    async fn uid_store(&mut self, uid: u32, query: &str) -> Result<Reply> {
        self.log.push(Call::Store(uid, query.to_string()));
        scripted(&self.script.store, uid)
    }

    async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<String>> {
        self.log
            .push(Call::List(reference.to_string(), pattern.to_string()));
        Ok(self.script.list_lines.clone())
    }

    async fn create(&mut self, name: &str) -> Result<Reply> {
        self.log.push(Call::Create(name.to_string()));
        Ok(self.script.create.clone().unwrap_or_else(Reply::ok))
    }

    async fn expunge(&mut self) -> Result<()> {
        self.log.push(Call::Expunge);
        if self.script.fail_expunge {
            return Err(Error::Protocol("Expunge failed: NO".into()));
        }
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        self.log.push(Call::Logout);
        Ok(())
    }
}

/// Hands out `ScriptedSession`s that share one script and one log.
pub struct ScriptedConnector {
    script: Script,
    log: CallLog,
    reject_login: bool,
    unreachable: bool,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: CallLog::default(),
            reject_login: false,
            unreachable: false,
        }
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self) -> Result<ScriptedSession> {
        if self.unreachable {
            return Err(Error::Connection("connection refused".into()));
        }
        self.log.push(Call::Login);
        if self.reject_login {
            return Err(Error::Protocol("Login failed: NO".into()));
        }
        Ok(ScriptedSession {
            script: self.script.clone(),
            log: self.log.clone(),
        })
    }
}

/// Minimal RFC 5322 message.
pub fn raw_email(from: &str, subject: &str, body: &str, date: &str) -> Vec<u8> {
    format!(
        "From: {from}\r\n\
         To: me@example.com\r\n\
         Subject: {subject}\r\n\
         Date: {date}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}"
    )
    .into_bytes()
}
