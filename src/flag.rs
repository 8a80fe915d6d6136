//! `STORE` data items for the move fallback

/// A flag the client sets on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Marked for removal by the next EXPUNGE.
    Deleted,
}

impl Flag {
    const fn as_imap_str(self) -> &'static str {
        match self {
            Self::Deleted => "\\Deleted",
        }
    }

    /// `+FLAGS.SILENT (<flag>)`: add the flag without an untagged FETCH
    /// echo.
    pub fn add_silent(self) -> String {
        format!("+FLAGS.SILENT ({})", self.as_imap_str())
    }
}
