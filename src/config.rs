//! Account and server configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// How TLS is negotiated with a mail server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// TLS from the first byte (IMAPS 993, SMTPS 465).
    #[default]
    Implicit,
    /// Plain connection upgraded with STARTTLS (IMAP 143, SMTP 587).
    StartTls,
}

impl TlsMode {
    #[must_use]
    pub const fn default_imap_port(self) -> u16 {
        match self {
            Self::Implicit => 993,
            Self::StartTls => 143,
        }
    }

    #[must_use]
    pub const fn default_smtp_port(self) -> u16 {
        match self {
            Self::Implicit => 465,
            Self::StartTls => 587,
        }
    }
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implicit" | "tls" | "ssl" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!("Unknown TLS mode: {other}"))),
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Implicit => "implicit",
            Self::StartTls => "starttls",
        })
    }
}

/// Connection parameters for one IMAP or SMTP server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub tls: TlsMode,
    /// Accept self-signed or otherwise unverifiable certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// One configured mail account: identity plus incoming and outgoing
/// servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_name: String,
    pub full_name: String,
    pub email_address: String,
    /// Mailbox searched and used as the source of copy/move.
    pub mailbox: String,
    pub incoming: ServerConfig,
    pub outgoing: ServerConfig,
}

impl AccountConfig {
    /// Load account configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `MAIL_EMAIL_ADDRESS`
    /// - `IMAP_HOST`
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `MAIL_ACCOUNT_NAME` (default: `default`)
    /// - `MAIL_FULL_NAME` (default: empty)
    /// - `MAIL_MAILBOX` (default: `INBOX`)
    /// - `IMAP_TLS` (`implicit` or `starttls`, default: `implicit`)
    /// - `IMAP_PORT` (default: 993 or 143 depending on `IMAP_TLS`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_TLS`,
    ///   `SMTP_ACCEPT_INVALID_CERTS` (default: the IMAP value)
    /// - `SMTP_PORT` (default: 465 or 587 depending on `SMTP_TLS`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or
    /// a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AccountConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} not set")));

        let imap_tls = lookup("IMAP_TLS").map_or(Ok(TlsMode::default()), |v| v.parse())?;
        let incoming = ServerConfig {
            host: required("IMAP_HOST")?,
            port: parse_port(lookup("IMAP_PORT"), "IMAP_PORT", imap_tls.default_imap_port())?,
            username: required("IMAP_USERNAME")?,
            password: required("IMAP_PASSWORD")?,
            tls: imap_tls,
            accept_invalid_certs: parse_bool(
                lookup("IMAP_ACCEPT_INVALID_CERTS"),
                "IMAP_ACCEPT_INVALID_CERTS",
                false,
            )?,
        };

        let smtp_tls = lookup("SMTP_TLS").map_or(Ok(incoming.tls), |v| v.parse())?;
        let outgoing = ServerConfig {
            host: lookup("SMTP_HOST").unwrap_or_else(|| incoming.host.clone()),
            port: parse_port(lookup("SMTP_PORT"), "SMTP_PORT", smtp_tls.default_smtp_port())?,
            username: lookup("SMTP_USERNAME").unwrap_or_else(|| incoming.username.clone()),
            password: lookup("SMTP_PASSWORD").unwrap_or_else(|| incoming.password.clone()),
            tls: smtp_tls,
            accept_invalid_certs: parse_bool(
                lookup("SMTP_ACCEPT_INVALID_CERTS"),
                "SMTP_ACCEPT_INVALID_CERTS",
                incoming.accept_invalid_certs,
            )?,
        };

        Ok(Self {
            account_name: lookup("MAIL_ACCOUNT_NAME").unwrap_or_else(|| "default".to_string()),
            full_name: lookup("MAIL_FULL_NAME").unwrap_or_default(),
            email_address: required("MAIL_EMAIL_ADDRESS")?,
            mailbox: lookup("MAIL_MAILBOX").unwrap_or_else(|| "INBOX".to_string()),
            incoming,
            outgoing,
        })
    }
}

fn parse_port(value: Option<String>, key: &str, default: u16) -> Result<u16> {
    value.map_or(Ok(default), |v| {
        v.trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
    })
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(v) = value else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid {key}: {other}"))),
    }
}
