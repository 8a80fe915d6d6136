//! UID FETCH. Whatever items are asked for, each hit is answered with
//! `UID`, `INTERNALDATE` and the whole message as a `BODY[]` literal:
//!
//! ```text
//! * 2 FETCH (UID 7 INTERNALDATE "14-Nov-2023 22:13:20 +0000" BODY[] {312}
//! <312 bytes>)
//! ```
//!
//! The internal date is taken from the `Date:` header, or the Unix
//! epoch when there is none.

use super::resolve_uids;
use crate::fake_imap::mailbox::Mailbox;
use crate::fake_imap::response::Response;
use chrono::{DateTime, Utc};
use imap_codec::imap_types::sequence::SequenceSet;

pub fn handle_uid_fetch(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected: Option<&str>,
) -> Response {
    let Some(folder) = selected.and_then(|name| mailbox.get_folder(name)) else {
        return Response::new().bad(tag, "No mailbox selected");
    };

    let mut response = Response::new();
    for uid in resolve_uids(sequence_set, &folder.uids()) {
        let Some(seq) = folder.emails.iter().position(|e| e.uid == uid) else {
            continue;
        };
        let email = &folder.emails[seq];
        let header = format!(
            "{} FETCH (UID {uid} INTERNALDATE \"{}\" BODY[] {{{}}}\r\n",
            seq + 1,
            internal_date(&email.raw),
            email.raw.len()
        );
        response = response.raw(b"* ").raw(header.as_bytes()).raw(&email.raw).raw(b")\r\n");
    }
    response.ok(tag, "FETCH completed")
}

fn internal_date(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| line.strip_prefix("Date:"))
        .and_then(|value| DateTime::parse_from_rfc2822(value.trim()).ok())
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset())
        .format("%d-%b-%Y %H:%M:%S %z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::{raw_email, uid_set};
    use crate::fake_imap::mailbox::MailboxBuilder;

    #[test]
    fn body_is_sent_as_counted_literal() {
        let raw = raw_email("Hello");
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(4, b"placeholder")
            .email(7, &raw)
            .build();

        let text = handle_uid_fetch("A6", &uid_set(&[7]), &mailbox, Some("INBOX")).text();

        let expected_header = format!(
            "* 2 FETCH (UID 7 INTERNALDATE \"14-Nov-2023 22:13:20 +0000\" BODY[] {{{}}}\r\n",
            raw.len()
        );
        assert!(text.starts_with(&expected_header));
        assert!(text.contains("Subject: Hello"));
        assert!(text.ends_with(")\r\nA6 OK FETCH completed\r\n"));
    }

    #[test]
    fn missing_uid_only_completes() {
        let mailbox = MailboxBuilder::new().folder("INBOX").email(1, b"x").build();
        let text = handle_uid_fetch("A6", &uid_set(&[99]), &mailbox, Some("INBOX")).text();
        assert_eq!(text, "A6 OK FETCH completed\r\n");
    }

    #[test]
    fn undated_message_uses_epoch() {
        assert_eq!(internal_date(b"Subject: x\r\n\r\nbody"), "01-Jan-1970 00:00:00 +0000");
    }
}
