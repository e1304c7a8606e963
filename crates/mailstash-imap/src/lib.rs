//! # mailstash-imap
//!
//! A deliberately small async IMAP client: exactly the protocol surface the
//! mailstash fetch cycle needs, nothing more.
//!
//! - Implicit TLS via rustls (no OpenSSL)
//! - Type-state connection: `NotAuthenticated` → `Authenticated` → `Selected`
//! - LOGIN, EXAMINE (read-only), FETCH of envelope summaries and plain text
//!   bodies, LOGOUT
//! - CRLF/literal framing with bounded buffers
//!
//! ```ignore
//! let stream = mailstash_imap::connect_tls("imap.example.com", 993).await?;
//! let client = mailstash_imap::Client::from_stream(stream).await?;
//! let client = client.login("user@example.com", "password").await?;
//! let (mut client, status) = client.examine("INBOX").await?;
//! let summaries = client.fetch_summaries(1, status.exists).await?;
//! client.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
mod connect;
mod error;
pub mod framed;
pub mod parse;

mod client;

pub use client::{Authenticated, Client, MailboxStatus, NotAuthenticated, Selected};
pub use command::{Command, TagGenerator};
pub use connect::{TlsImapStream, connect_tls, tls_connector};
pub use error::{Error, Result};
pub use parse::{Address, Envelope, FetchRecord, Response, Status};
