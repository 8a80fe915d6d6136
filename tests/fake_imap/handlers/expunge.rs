//! EXPUNGE. Each removal is reported by its sequence number at the
//! moment it is removed, so later numbers shift down.

use crate::fake_imap::mailbox::Mailbox;
use crate::fake_imap::response::Response;

pub fn handle_expunge(tag: &str, mailbox: &mut Mailbox, selected: Option<&str>) -> Response {
    let Some(folder) = selected.and_then(|name| mailbox.get_folder_mut(name)) else {
        return Response::new().bad(tag, "No mailbox selected");
    };

    let mut response = Response::new();
    let mut seq = 1;
    for email in &folder.emails {
        if email.deleted {
            response = response.untagged(&format!("{seq} EXPUNGE"));
        } else {
            seq += 1;
        }
    }
    folder.emails.retain(|e| !e.deleted);
    response.ok(tag, "EXPUNGE completed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::raw_email;
    use crate::fake_imap::mailbox::MailboxBuilder;

    #[test]
    fn removes_marked_messages_with_shifting_numbers() {
        let mut mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &raw_email("a"))
            .email(2, &raw_email("b"))
            .email(3, &raw_email("c"))
            .build();
        for email in &mut mailbox.get_folder_mut("INBOX").unwrap().emails {
            email.deleted = email.uid != 2;
        }

        let text = handle_expunge("A9", &mut mailbox, Some("INBOX")).text();

        assert_eq!(text, "* 1 EXPUNGE\r\n* 2 EXPUNGE\r\nA9 OK EXPUNGE completed\r\n");
        assert_eq!(mailbox.get_folder("INBOX").unwrap().uids(), vec![2]);
    }

    #[test]
    fn nothing_marked_only_completes() {
        let mut mailbox = MailboxBuilder::new().folder("INBOX").email(1, &raw_email("a")).build();
        let text = handle_expunge("A9", &mut mailbox, Some("INBOX")).text();
        assert_eq!(text, "A9 OK EXPUNGE completed\r\n");
    }
}
