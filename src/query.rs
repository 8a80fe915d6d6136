//! Search filters and pagination

use crate::error::{Error, Result};
use crate::message::EmailMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order in which matching messages are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Sort UIDs in place; UIDs grow with arrival order.
    pub fn sort(self, uids: &mut [u32]) {
        match self {
            Self::Asc => uids.sort_unstable(),
            Self::Desc => uids.sort_unstable_by(|a, b| b.cmp(a)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::InvalidQuery(format!("Unknown sort order: {other}"))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// One page request with its filters.
///
/// Filters narrow the mailbox first; `page` and `page_size` then
/// select a window of the filtered, sorted sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub before: Option<DateTime<Utc>>,
    #[serde(rename = "since")]
    pub after: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub text: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            before: None,
            after: None,
            subject: None,
            body: None,
            text: None,
            from_address: None,
            to_address: None,
            order: SortOrder::default(),
        }
    }
}

impl PageQuery {
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if `page` or `page_size` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(Error::InvalidQuery("page must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidQuery("page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of matches preceding this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.page_size as usize
    }

    /// Number of matches needed to fill this page.
    ///
    /// Every one of them is fetched in full, including those before
    /// [`offset`](Self::offset) that are only counted and dropped, so
    /// late pages cost `page * page_size` message downloads.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.page as usize * self.page_size as usize
    }

    /// `UID SEARCH` criteria for the filters, `ALL` when there are none.
    #[must_use]
    pub fn search_criteria(&self) -> String {
        let mut criteria = Vec::new();
        if let Some(after) = self.after {
            criteria.push(format!("SINCE {}", imap_date(after)));
        }
        if let Some(before) = self.before {
            criteria.push(format!("BEFORE {}", imap_date(before)));
        }
        let strings = [
            ("SUBJECT", &self.subject),
            ("BODY", &self.body),
            ("TEXT", &self.text),
            ("FROM", &self.from_address),
            ("TO", &self.to_address),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                criteria.push(format!("{key} {}", quote(value)));
            }
        }

        if criteria.is_empty() {
            "ALL".to_string()
        } else {
            criteria.join(" ")
        }
    }
}

fn imap_date(date: DateTime<Utc>) -> String {
    date.format("%-d-%b-%Y").to_string()
}

fn quote(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    format!("\"{}\"", cleaned.replace('\\', "\\\\").replace('"', "\\\""))
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(flatten)]
    pub query: PageQuery,
    pub emails: Vec<EmailMessage>,
    /// Matches across all pages.
    pub total: usize,
}
