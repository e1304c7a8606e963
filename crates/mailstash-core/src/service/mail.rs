//! The mail cache service: fetch new messages, merge into the cache,
//! persist, return the full known set.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use mailstash_imap::{Address, Client, FetchRecord, Selected, TlsImapStream, connect_tls};

use crate::message::{DATE_FORMAT, EmailMessage};
use crate::store::CacheStore;
use crate::Result;

/// Default fetch window: summaries for at most this many of the most recent
/// messages are requested per cycle.
///
/// The window is a positional slice of the mailbox, not a since-timestamp
/// query: messages that fall out of the window between calls are never seen.
pub const DEFAULT_FETCH_WINDOW: u32 = 100;

/// The mailbox every fetch cycle reads.
const INBOX: &str = "INBOX";

/// IMAP connection parameters.
///
/// All fields are required; nothing is defaulted or validated beyond what
/// the server itself enforces.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (implicit TLS, typically 993).
    pub port: u16,
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Summary metadata for one mailbox message.
#[derive(Debug, Clone, Default)]
pub struct MessageSummary {
    /// Protocol UID, used to fetch the full body.
    pub uid: u32,
    /// Message-ID header; `None` when the message has none, in which case it
    /// cannot be deduplicated and is skipped.
    pub message_id: Option<String>,
    /// Comma-joined From addresses.
    pub from: String,
    /// Comma-joined To addresses.
    pub to: String,
    /// Parsed Date header, when parseable.
    pub date: Option<DateTime<FixedOffset>>,
    /// Subject line.
    pub subject: String,
}

/// A mailbox the cache can pull from.
///
/// The production implementation is [`ImapSource`]; tests substitute a
/// scripted fake.
#[async_trait]
pub trait MailSource: Send {
    /// Returns summaries for up to `window` of the most recent messages,
    /// in server order.
    async fn recent_summaries(&mut self, window: u32) -> Result<Vec<MessageSummary>>;

    /// Fetches the plain text body for one message.
    async fn text_body(&mut self, uid: u32) -> Result<String>;

    /// Releases the source, sending a graceful logout where applicable.
    async fn disconnect(self: Box<Self>) -> Result<()>;
}

/// [`MailSource`] backed by an IMAP connection with INBOX open read-only.
pub struct ImapSource {
    client: Client<TlsImapStream, Selected>,
    exists: u32,
}

impl ImapSource {
    /// Connects over TLS, authenticates, and opens INBOX read-only.
    ///
    /// # Errors
    ///
    /// Network, TLS and authentication failures propagate unchanged; there
    /// is no retry.
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        let stream = connect_tls(&config.host, config.port).await?;
        let client = Client::from_stream(stream).await?;
        let client = client.login(&config.username, &config.password).await?;
        let (client, status) = client.examine(INBOX).await?;
        Ok(Self {
            client,
            exists: status.exists,
        })
    }
}

#[async_trait]
impl MailSource for ImapSource {
    async fn recent_summaries(&mut self, window: u32) -> Result<Vec<MessageSummary>> {
        if self.exists == 0 || window == 0 {
            return Ok(Vec::new());
        }
        let first = self.exists.saturating_sub(window - 1).max(1);
        let records = self.client.fetch_summaries(first, self.exists).await?;
        Ok(records.into_iter().filter_map(summarize).collect())
    }

    async fn text_body(&mut self, uid: u32) -> Result<String> {
        let body = self.client.uid_fetch_text(uid).await?;
        Ok(body
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default())
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        self.client.logout().await?;
        Ok(())
    }
}

fn summarize(record: FetchRecord) -> Option<MessageSummary> {
    let uid = record.uid?;
    let envelope = record.envelope.unwrap_or_default();
    Some(MessageSummary {
        uid,
        message_id: envelope.message_id,
        from: join_addresses(&envelope.from),
        to: join_addresses(&envelope.to),
        date: envelope
            .date
            .and_then(|d| DateTime::parse_from_rfc2822(&d).ok()),
        subject: envelope.subject.unwrap_or_default(),
    })
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(Address::display)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Durable local mirror of fetched mail.
///
/// Owns a [`CacheStore`] and a fetch window; each [`fetch_all`] call is one
/// sequential cycle: lock, load, dedup against known ids, fetch new bodies
/// one at a time, append in server-fetch order, logout, overwrite the
/// document, return everything known.
///
/// [`fetch_all`]: MailCache::fetch_all
#[derive(Debug)]
pub struct MailCache<S> {
    store: S,
    window: u32,
}

impl<S: CacheStore> MailCache<S> {
    /// Creates a cache over the given store with the default fetch window.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            window: DEFAULT_FETCH_WINDOW,
        }
    }

    /// Overrides the fetch window.
    #[must_use]
    pub const fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs one fetch cycle against an IMAP server.
    ///
    /// # Errors
    ///
    /// Connection, authentication, storage and deserialization failures all
    /// propagate unchanged; no partial result is returned. On error paths
    /// the dropped connection closes the socket without a LOGOUT.
    pub async fn fetch_all(&self, config: &ImapConfig) -> Result<Vec<EmailMessage>> {
        let source = ImapSource::connect(config).await?;
        self.fetch_from(Box::new(source)).await
    }

    /// Runs one fetch cycle against any [`MailSource`].
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_all`].
    pub async fn fetch_from(&self, mut source: Box<dyn MailSource>) -> Result<Vec<EmailMessage>> {
        let _lock = self.store.lock().await?;

        let mut messages = self.store.load().await?;
        let mut known: HashSet<String> = messages.iter().map(|m| m.id.clone()).collect();

        let summaries = source.recent_summaries(self.window).await?;
        debug!(
            window = self.window,
            summaries = summaries.len(),
            cached = messages.len(),
            "comparing mailbox against cache"
        );

        let mut fetched = 0usize;
        for summary in summaries {
            let Some(id) = summary.message_id else {
                debug!(uid = summary.uid, "skipping message without Message-ID");
                continue;
            };
            if known.contains(&id) {
                continue;
            }

            let body = source.text_body(summary.uid).await?;
            messages.push(EmailMessage {
                id: id.clone(),
                from: summary.from,
                to: summary.to,
                date: summary
                    .date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default(),
                subject: summary.subject,
                body,
            });
            known.insert(id);
            fetched += 1;
        }

        source.disconnect().await?;
        self.store.save(&messages).await?;

        info!(fetched, total = messages.len(), "fetch cycle complete");
        Ok(messages)
    }
}
