use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::models::GeneratedMessage;
use crate::storage::{Slot, Store};

/// Outreach outcome for one tracked contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Responded,
    Signed,
    Declined,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Pending, Status::Responded, Status::Signed, Status::Declined];

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Responded => "Responded",
            Status::Signed => "Signed Up",
            Status::Declined => "Declined",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Responded => "responded",
            Status::Signed => "signed",
            Status::Declined => "declined",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub name: String,
    pub email: String,
    pub status: Status,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub batch_id: Option<String>,
}

/// Snapshot counts for the dashboard. Derived on every render, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingStats {
    pub total: usize,
    pub pending: usize,
    pub responded: usize,
    pub signed: usize,
    pub declined: usize,
}

impl TrackingStats {
    fn rate(part: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        (part as f64 * 100.0 / total as f64).round() as u32
    }

    /// Percent of tracked contacts with any outcome, rounded.
    pub fn response_rate(&self) -> u32 {
        Self::rate(self.responded + self.signed + self.declined, self.total)
    }

    /// Percent of tracked contacts who signed up, rounded.
    pub fn conversion_rate(&self) -> u32 {
        Self::rate(self.signed, self.total)
    }
}

type Ledger = BTreeMap<String, TrackingEntry>;

/// Durable email -> status map, independent of any single batch.
///
/// Persisted as one whole document per mutation; keyed by the raw email
/// string as produced by the generation service.
pub struct TrackingLedger<'a> {
    store: &'a Store,
}

impl<'a> TrackingLedger<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn load(&self) -> Ledger {
        self.store.load(Slot::Tracking, Ledger::new())
    }

    fn save(&self, ledger: &Ledger) {
        if let Err(e) = self.store.save(Slot::Tracking, ledger) {
            log::error!("failed to persist tracking ledger: {e}");
        }
    }

    /// Track every message whose email is not already known. First write
    /// wins: an already-tracked email keeps its status and history untouched,
    /// even if the name differs.
    pub fn add_batch(&self, messages: &[GeneratedMessage], batch_id: Option<&str>) {
        let mut ledger = self.load();
        let now = Utc::now();
        for msg in messages {
            if msg.email.is_empty() || ledger.contains_key(&msg.email) {
                continue;
            }
            ledger.insert(
                msg.email.clone(),
                TrackingEntry {
                    name: if msg.name.is_empty() { "Unknown".to_string() } else { msg.name.clone() },
                    email: msg.email.clone(),
                    status: Status::Pending,
                    date_added: now,
                    last_updated: now,
                    batch_id: batch_id.map(|id| id.to_string()),
                },
            );
        }
        self.save(&ledger);
    }

    pub fn status_for(&self, email: &str) -> Status {
        self.load().get(email).map(|e| e.status).unwrap_or_default()
    }

    /// Update the status of a tracked email. A status change never creates an
    /// entry: unknown emails are a silent no-op.
    pub fn set_status(&self, email: &str, status: Status) {
        let mut ledger = self.load();
        if let Some(entry) = ledger.get_mut(email) {
            entry.status = status;
            entry.last_updated = Utc::now();
            self.save(&ledger);
        }
    }

    /// Entries matching the filters (None = all), newest first.
    pub fn entries(&self, status: Option<Status>, batch_id: Option<&str>) -> Vec<TrackingEntry> {
        let mut entries: Vec<TrackingEntry> = self
            .load()
            .into_values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .filter(|e| batch_id.map_or(true, |b| e.batch_id.as_deref() == Some(b)))
            .collect();
        entries.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        entries
    }

    pub fn stats(&self) -> TrackingStats {
        let mut stats = TrackingStats::default();
        for entry in self.load().values() {
            stats.total += 1;
            match entry.status {
                Status::Pending => stats.pending += 1,
                Status::Responded => stats.responded += 1,
                Status::Signed => stats.signed += 1,
                Status::Declined => stats.declined += 1,
            }
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.clear(Slot::Tracking) {
            log::error!("failed to clear tracking ledger: {e}");
        }
    }

    /// Render every entry (ignoring filters) as CSV with quoted fields.
    pub fn export_csv(&self) -> String {
        let mut csv = String::from("Name,Email,Status,Date Added,Last Updated\n");
        for entry in self.entries(None, None) {
            csv.push_str(&format!(
                "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"\n",
                csv_escape(&entry.name),
                csv_escape(&entry.email),
                entry.status,
                entry.date_added.to_rfc3339(),
                entry.last_updated.to_rfc3339(),
            ));
        }
        csv
    }
}

fn csv_escape(field: &str) -> String {
    field.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path().join("slots.sqlite")).unwrap();
        (dir, store)
    }

    fn msg(name: &str, email: &str) -> GeneratedMessage {
        GeneratedMessage {
            name: name.to_string(),
            email: email.to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn add_batch_defaults_to_pending() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.add_batch(&[msg("Ada", "ada@x.com")], Some("batch_1"));
        assert_eq!(ledger.status_for("ada@x.com"), Status::Pending);
        assert_eq!(ledger.stats().total, 1);
    }

    #[test]
    fn first_write_wins() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.add_batch(&[msg("Ada", "e@x.com")], Some("b1"));
        ledger.set_status("e@x.com", Status::Signed);
        // Re-adding the same email, even with a different name, changes nothing.
        ledger.add_batch(&[msg("Someone Else", "e@x.com")], Some("b2"));
        let entries = ledger.entries(None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Status::Signed);
        assert_eq!(entries[0].name, "Ada");
        assert_eq!(entries[0].batch_id.as_deref(), Some("b1"));
    }

    #[test]
    fn set_status_on_unknown_email_is_a_no_op() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.set_status("ghost@x.com", Status::Responded);
        assert!(ledger.is_empty());
        assert_eq!(ledger.status_for("ghost@x.com"), Status::Pending);
    }

    #[test]
    fn entries_filter_by_status_then_batch() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.add_batch(&[msg("A", "a@x.com"), msg("B", "b@x.com")], Some("b1"));
        ledger.add_batch(&[msg("C", "c@x.com")], Some("b2"));
        ledger.set_status("a@x.com", Status::Signed);

        let b1: Vec<String> = ledger
            .entries(None, Some("b1"))
            .into_iter()
            .map(|e| e.email)
            .collect();
        assert_eq!(b1.len(), 2);
        assert!(b1.contains(&"a@x.com".to_string()));
        assert!(b1.contains(&"b@x.com".to_string()));

        let signed_b1 = ledger.entries(Some(Status::Signed), Some("b1"));
        assert_eq!(signed_b1.len(), 1);
        assert_eq!(signed_b1[0].email, "a@x.com");

        let signed_b2 = ledger.entries(Some(Status::Signed), Some("b2"));
        assert!(signed_b2.is_empty());
    }

    #[test]
    fn dashboard_math() {
        let stats = TrackingStats { total: 10, pending: 4, responded: 3, signed: 2, declined: 1 };
        assert_eq!(stats.response_rate(), 60);
        assert_eq!(stats.conversion_rate(), 20);
    }

    #[test]
    fn dashboard_math_empty_ledger() {
        let stats = TrackingStats::default();
        assert_eq!(stats.response_rate(), 0);
        assert_eq!(stats.conversion_rate(), 0);
    }

    #[test]
    fn export_csv_covers_all_entries_with_header() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.add_batch(&[msg("Ada \"The Countess\"", "ada@x.com"), msg("Bob", "bob@x.com")], None);
        ledger.set_status("bob@x.com", Status::Declined);
        let csv = ledger.export_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Name,Email,Status,Date Added,Last Updated"));
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.contains("\"Ada \"\"The Countess\"\"\"")));
        assert!(rows.iter().any(|r| r.contains("\"declined\"")));
    }

    #[test]
    fn clear_empties_the_ledger() {
        let (_dir, store) = temp_store();
        let ledger = TrackingLedger::new(&store);
        ledger.add_batch(&[msg("Ada", "ada@x.com")], None);
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
