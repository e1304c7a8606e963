//! High-level services.

mod mail;

pub use mail::{
    DEFAULT_FETCH_WINDOW, ImapConfig, ImapSource, MailCache, MailSource, MessageSummary,
};
