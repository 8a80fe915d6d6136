//! Fetched messages

use crate::error::{Error, Result};
use crate::session::RawMessage;
use chrono::{DateTime, Utc};
use mail_parser::{Addr, MessageParser, MimeHeaders};
use serde::{Deserialize, Serialize};

/// A decoded message as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    /// `Name <address>`, or the bare address when no display name is
    /// present.
    pub sender: String,
    pub body: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Attachment file names in MIME order.
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
}

impl EmailMessage {
    /// Decode an RFC 5322 message.
    ///
    /// The timestamp comes from the `Date:` header, then from the
    /// server's INTERNALDATE, then the Unix epoch. The body is the
    /// first text part, falling back to the first HTML part rendered
    /// as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are empty or not a
    /// message.
    pub fn from_raw(raw: &RawMessage) -> Result<Self> {
        if raw.body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Parse(format!("UID {}: empty message", raw.uid)));
        }

        let message = MessageParser::default()
            .parse(&raw.body)
            .ok_or_else(|| Error::Parse(format!("UID {}: not an RFC 5322 message", raw.uid)))?;

        let sender = message
            .from()
            .and_then(|from| from.first())
            .map(format_address)
            .unwrap_or_default();

        let body = message
            .body_text(0)
            .or_else(|| message.body_html(0))
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default();

        let timestamp = message
            .date()
            .and_then(|date| DateTime::<Utc>::from_timestamp(date.to_timestamp(), 0))
            .or(raw.internal_date)
            .unwrap_or(DateTime::UNIX_EPOCH);

        let attachments = message
            .attachments()
            .filter_map(|part| part.attachment_name().map(str::to_string))
            .collect();

        Ok(Self {
            subject: message.subject().unwrap_or_default().to_string(),
            sender,
            body,
            timestamp,
            attachments,
            uid: Some(raw.uid),
        })
    }
}

fn format_address(addr: &Addr<'_>) -> String {
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) if !name.is_empty() => format!("{name} <{address}>"),
        (_, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => String::new(),
    }
}
