//! The cached message record and the operations over sequences of them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The textual date format used in [`EmailMessage::date`], both in memory
/// and in the persisted cache document: `dd.MM.yyyy - HH:mm:ss`.
pub const DATE_FORMAT: &str = "%d.%m.%Y - %H:%M:%S";

/// A single retrieved mail message, as stored in the cache document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Message-ID header; unique per message and the cache dedup key.
    pub id: String,
    /// Comma-joined From addresses.
    pub from: String,
    /// Comma-joined To addresses.
    pub to: String,
    /// Timestamp formatted with [`DATE_FORMAT`].
    pub date: String,
    /// Subject line, verbatim.
    pub subject: String,
    /// Plain text body, verbatim.
    pub body: String,
}

impl EmailMessage {
    /// Parses the `date` field back with [`DATE_FORMAT`].
    ///
    /// Returns `None` for unparseable dates; the sort operations coerce that
    /// to the minimum timestamp rather than failing.
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// Sort key: unparseable dates rank below every real one.
///
/// Carried over from the original behavior on purpose; see the cache tests
/// for the documented consequence.
fn date_key(message: &EmailMessage) -> NaiveDateTime {
    message.parsed_date().unwrap_or(NaiveDateTime::MIN)
}

/// Returns the messages sorted by date, oldest first. Stable.
#[must_use]
pub fn sort_ascending(messages: &[EmailMessage]) -> Vec<EmailMessage> {
    let mut sorted = messages.to_vec();
    sorted.sort_by_key(date_key);
    sorted
}

/// Returns the messages sorted by date, newest first. Stable.
#[must_use]
pub fn sort_descending(messages: &[EmailMessage]) -> Vec<EmailMessage> {
    let mut sorted = messages.to_vec();
    sorted.sort_by(|a, b| date_key(b).cmp(&date_key(a)));
    sorted
}

/// Returns the number of messages.
#[must_use]
pub fn count(messages: &[EmailMessage]) -> usize {
    messages.len()
}

/// Returns the first `n` messages in existing order.
///
/// When `n` exceeds the sequence length the whole sequence is returned.
#[must_use]
pub fn take_first(messages: &[EmailMessage], n: usize) -> Vec<EmailMessage> {
    messages.iter().take(n).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(id: &str, date: &str) -> EmailMessage {
        EmailMessage {
            id: id.to_string(),
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
            date: date.to_string(),
            subject: format!("subject {id}"),
            body: String::new(),
        }
    }

    #[test]
    fn date_round_trips_through_the_fixed_format() {
        let msg = message("m1", "23.08.2025 - 10:15:00");
        let parsed = msg.parsed_date().unwrap();
        assert_eq!(parsed.format(DATE_FORMAT).to_string(), msg.date);
    }

    #[test]
    fn sorts_ascending_by_date() {
        let messages = vec![
            message("b", "02.01.2024 - 00:00:00"),
            message("a", "01.01.2024 - 00:00:00"),
            message("c", "03.01.2024 - 00:00:00"),
        ];
        let sorted = sort_ascending(&messages);
        let ids: Vec<&str> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn unparseable_date_sorts_first_ascending() {
        // Documents the inherited coercion: a bad date becomes the minimum
        // timestamp instead of an error.
        let messages = vec![
            message("b", "02.01.2024 - 00:00:00"),
            message("x", "not-a-date"),
            message("a", "01.01.2024 - 00:00:00"),
        ];
        let sorted = sort_ascending(&messages);
        assert_eq!(sorted[0].id, "x");

        let sorted = sort_descending(&messages);
        assert_eq!(sorted.last().unwrap().id, "x");
    }

    #[test]
    fn sort_is_stable_for_equal_dates() {
        let messages = vec![
            message("first", "01.01.2024 - 12:00:00"),
            message("second", "01.01.2024 - 12:00:00"),
        ];
        let sorted = sort_ascending(&messages);
        assert_eq!(sorted[0].id, "first");
        assert_eq!(sorted[1].id, "second");
    }

    #[test]
    fn take_first_bounds() {
        let messages = vec![
            message("a", "01.01.2024 - 00:00:00"),
            message("b", "02.01.2024 - 00:00:00"),
        ];
        assert_eq!(take_first(&messages, 0), []);
        assert_eq!(take_first(&messages, 1).len(), 1);
        assert_eq!(take_first(&messages, 5), messages);
        assert_eq!(count(&messages), 2);
    }

    proptest! {
        /// For parseable, distinct dates, descending is the reverse of
        /// ascending.
        #[test]
        fn descending_is_reversed_ascending(offsets in proptest::collection::hash_set(0u32..1_000_000, 0..20)) {
            let base = NaiveDateTime::parse_from_str("01.01.2020 - 00:00:00", DATE_FORMAT).unwrap();
            let messages: Vec<EmailMessage> = offsets
                .iter()
                .enumerate()
                .map(|(i, &secs)| {
                    let date = base + chrono::Duration::seconds(i64::from(secs));
                    message(&format!("m{i}"), &date.format(DATE_FORMAT).to_string())
                })
                .collect();

            let mut reversed = sort_descending(&messages);
            reversed.reverse();
            prop_assert_eq!(reversed, sort_ascending(&messages));
        }
    }
}
