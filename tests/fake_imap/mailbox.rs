//! Folder and message state of the fake server
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(1, raw_rfc5322_bytes)
//!         .email(2, raw_rfc5322_bytes)
//!     .folder("Archive")
//!     .build();
//! ```

#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    /// Answer every LOGIN with `NO`.
    pub reject_login: bool,
}

impl Mailbox {
    /// Case-sensitive, like real IMAP servers (except INBOX).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    pub fn add_folder(&mut self, name: &str) {
        self.folders.push(Folder::new(name));
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
    /// UID assigned to the next appended or copied message.
    pub next_uid: u32,
}

impl Folder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            emails: Vec::new(),
            next_uid: 1,
        }
    }

    /// Store a copy of `email` under a fresh UID.
    pub fn append_copy(&mut self, email: &TestEmail) -> u32 {
        let uid = self.next_uid;
        self.next_uid += 1;
        self.emails.push(TestEmail {
            uid,
            deleted: false,
            raw: email.raw.clone(),
        });
        uid
    }

    pub fn uids(&self) -> Vec<u32> {
        self.emails.iter().map(|e| e.uid).collect()
    }
}

#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    /// `\Deleted` is set; removed by the next EXPUNGE.
    pub deleted: bool,
    pub raw: Vec<u8>,
}

pub struct MailboxBuilder {
    mailbox: Mailbox,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            mailbox: Mailbox::default(),
        }
    }

    /// Start a folder; following `.email()` calls add to it.
    pub fn folder(mut self, name: &str) -> Self {
        self.mailbox.add_folder(name);
        self
    }

    /// # Panics
    ///
    /// Panics if no folder was started yet.
    pub fn email(mut self, uid: u32, raw: &[u8]) -> Self {
        let folder = self
            .mailbox
            .folders
            .last_mut()
            .expect("call .folder() before .email()");
        folder.emails.push(TestEmail {
            uid,
            deleted: false,
            raw: raw.to_vec(),
        });
        folder.next_uid = folder.next_uid.max(uid + 1);
        self
    }

    pub fn reject_login(mut self) -> Self {
        self.mailbox.reject_login = true;
        self
    }

    pub fn build(self) -> Mailbox {
        self.mailbox
    }
}
