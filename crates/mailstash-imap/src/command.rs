//! IMAP command construction.
//!
//! Only the commands the mailstash fetch cycle needs are modeled:
//! LOGIN, EXAMINE, FETCH (envelope summaries and text bodies) and LOGOUT.

/// A client command, serialized to the wire with a tag prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate with LOGIN.
    Login {
        /// Account username.
        username: String,
        /// Account password.
        password: String,
    },
    /// Open a mailbox read-only.
    Examine {
        /// Mailbox name, e.g. `INBOX`.
        mailbox: String,
    },
    /// Fetch UID and ENVELOPE for a sequence-number range.
    FetchSummaries {
        /// First sequence number (inclusive, 1-based).
        first: u32,
        /// Last sequence number (inclusive).
        last: u32,
    },
    /// Fetch the plain text body section of a single message by UID.
    ///
    /// Uses `BODY.PEEK` so the fetch does not set `\Seen`, matching the
    /// read-only access mode of the mailbox.
    UidFetchText {
        /// Message UID.
        uid: u32,
    },
    /// Gracefully end the session.
    Logout,
}

impl Command {
    /// Serializes the command with the given tag, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox);
            }
            Self::FetchSummaries { first, last } => {
                buf.extend_from_slice(format!("FETCH {first}:{last} (UID ENVELOPE)").as_bytes());
            }
            Self::UidFetchText { uid } => {
                buf.extend_from_slice(format!("UID FETCH {uid} (UID BODY.PEEK[TEXT])").as_bytes());
            }
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Writes an astring (atom or quoted string).
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Returns true if the byte forces the string into quoted form.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*') || b < 0x20 || b == 0x7F
}

/// Generator for unique command tags ("A0000", "A0001", ...).
#[derive(Debug, Default, Clone)]
pub struct TagGenerator {
    counter: u32,
}

impl TagGenerator {
    /// Creates a fresh generator starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Returns the next tag.
    pub fn next(&mut self) -> String {
        let tag = format!("A{:04}", self.counter);
        self.counter = self.counter.wrapping_add(1);
        tag
    }
}
