//! Outcome of bulk copy and move operations

use serde::{Deserialize, Serialize};

/// Per-call result of a bulk copy or move.
///
/// `success` holds exactly when `failed_uids` is empty. Counts only
/// include UIDs the server confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub moved_count: usize,
    #[serde(default)]
    pub copied_count: usize,
    #[serde(default)]
    pub failed_uids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BulkKind {
    Copy,
    Move,
}

impl BulkKind {
    const fn verb(self) -> &'static str {
        match self {
            Self::Copy => "copied",
            Self::Move => "moved",
        }
    }
}

/// Accumulates per-UID outcomes in input order.
#[derive(Debug)]
pub(crate) struct Tally {
    kind: BulkKind,
    succeeded: usize,
    failed: Vec<String>,
    note: Option<String>,
}

impl Tally {
    pub(crate) const fn new(kind: BulkKind) -> Self {
        Self {
            kind,
            succeeded: 0,
            failed: Vec::new(),
            note: None,
        }
    }

    pub(crate) const fn succeed(&mut self) {
        self.succeeded += 1;
    }

    pub(crate) fn fail(&mut self, uid: &str) {
        self.failed.push(uid.to_string());
    }

    /// Extra clause appended to the summary message.
    pub(crate) fn note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
    }

    pub(crate) fn finish(self) -> OperationResult {
        let verb = self.kind.verb();
        let total = self.succeeded + self.failed.len();
        let mut message = if self.failed.is_empty() {
            format!("Successfully {verb} {} emails", self.succeeded)
        } else {
            let mut capitalized = verb.to_string();
            capitalized[..1].make_ascii_uppercase();
            format!(
                "{capitalized} {} of {total} emails, {} failed",
                self.succeeded,
                self.failed.len()
            )
        };
        if let Some(note) = self.note {
            message.push_str("; ");
            message.push_str(&note);
        }

        let (moved_count, copied_count) = match self.kind {
            BulkKind::Copy => (0, self.succeeded),
            BulkKind::Move => (self.succeeded, 0),
        };

        OperationResult {
            success: self.failed.is_empty(),
            message,
            moved_count,
            copied_count,
            failed_uids: self.failed,
        }
    }
}
