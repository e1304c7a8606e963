//! Fetch-cycle scenarios against the real JSON file store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;

use mailstash_core::{
    EmailMessage, JsonFileStore, MailCache, MailSource, MessageSummary, Result,
};

/// Mailbox stub serving a fixed set of summaries and bodies.
struct StubMailbox {
    summaries: Vec<MessageSummary>,
    bodies: HashMap<u32, String>,
}

impl StubMailbox {
    fn new(entries: &[(u32, &str, &str)]) -> Self {
        let summaries = entries
            .iter()
            .map(|&(uid, id, subject)| MessageSummary {
                uid,
                message_id: Some(id.to_string()),
                from: "sender@example.com".to_string(),
                to: "me@example.com".to_string(),
                date: DateTime::parse_from_rfc2822("Mon, 25 Aug 2025 08:00:00 +0000").ok(),
                subject: subject.to_string(),
            })
            .collect();
        let bodies = entries
            .iter()
            .map(|&(uid, _, subject)| (uid, format!("full text of {subject}")))
            .collect();
        Self { summaries, bodies }
    }
}

#[async_trait]
impl MailSource for StubMailbox {
    async fn recent_summaries(&mut self, window: u32) -> Result<Vec<MessageSummary>> {
        let skip = self.summaries.len().saturating_sub(window as usize);
        Ok(self.summaries.iter().skip(skip).cloned().collect())
    }

    async fn text_body(&mut self, uid: u32) -> Result<String> {
        Ok(self.bodies.get(&uid).cloned().unwrap_or_default())
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn absent_cache_file_ends_up_with_exactly_the_served_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Cache").join("emailCache.json");
    let cache = MailCache::new(JsonFileStore::new(&path));

    let mailbox = StubMailbox::new(&[(1, "<A@x>", "one"), (2, "<B@x>", "two"), (3, "<C@x>", "three")]);
    let result = cache.fetch_from(Box::new(mailbox)).await.expect("cycle");

    assert_eq!(result.len(), 3);
    assert!(path.exists(), "cache document was not written");

    let raw = std::fs::read_to_string(&path).expect("read cache");
    let persisted: Vec<EmailMessage> = serde_json::from_str(&raw).expect("parse cache");
    assert_eq!(persisted, result);

    let ids: Vec<&str> = persisted.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["<A@x>", "<B@x>", "<C@x>"]);
}

#[tokio::test]
async fn two_cycles_share_one_document_and_stay_duplicate_free() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("emailCache.json");
    let cache = MailCache::new(JsonFileStore::new(&path));

    let first = StubMailbox::new(&[(1, "<A@x>", "one")]);
    cache.fetch_from(Box::new(first)).await.expect("first cycle");

    // The second cycle sees the old message plus a new one.
    let second = StubMailbox::new(&[(1, "<A@x>", "one"), (2, "<B@x>", "two")]);
    let result = cache.fetch_from(Box::new(second)).await.expect("second cycle");

    let ids: Vec<&str> = result.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["<A@x>", "<B@x>"]);

    let raw = std::fs::read_to_string(&path).expect("read cache");
    let persisted: Vec<EmailMessage> = serde_json::from_str(&raw).expect("parse cache");
    assert_eq!(persisted.len(), 2);
}

#[tokio::test]
async fn the_lock_file_is_gone_after_a_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("emailCache.json");
    let cache = MailCache::new(JsonFileStore::new(&path));

    let mailbox = StubMailbox::new(&[(1, "<A@x>", "one")]);
    cache.fetch_from(Box::new(mailbox)).await.expect("cycle");

    let lock_path = dir.path().join("emailCache.json.lock");
    assert!(!lock_path.exists(), "lock file leaked");
}
