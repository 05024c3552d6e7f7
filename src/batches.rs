use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Slot, Store};

/// One upload event: which file, when, and which addresses it produced.
/// Batches are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub contact_count: usize,
    pub emails: Vec<String>,
}

/// Append-only upload log in the batches slot, newest first.
pub struct BatchRegistry<'a> {
    store: &'a Store,
}

impl<'a> BatchRegistry<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<Batch> {
        self.store.load(Slot::Batches, Vec::new())
    }

    pub fn get(&self, batch_id: &str) -> Option<Batch> {
        self.list().into_iter().find(|b| b.id == batch_id)
    }

    /// Register a new upload and return its id. The id is derived from the
    /// creation time and kept unique against the stored list; with no source
    /// filename the batch gets a synthetic `Batch {n}` name.
    pub fn create(&self, name: Option<&str>, contact_count: usize, emails: Vec<String>) -> String {
        let mut batches = self.list();
        let mut millis = Utc::now().timestamp_millis();
        while batches.iter().any(|b| b.id == format!("batch_{millis}")) {
            millis += 1;
        }
        let id = format!("batch_{millis}");
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Batch {}", batches.len() + 1),
        };
        batches.insert(
            0,
            Batch {
                id: id.clone(),
                name,
                timestamp: Utc::now(),
                contact_count,
                emails,
            },
        );
        if let Err(e) = self.store.save(Slot::Batches, &batches) {
            log::error!("failed to persist batch registry: {e}");
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path().join("slots.sqlite")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_prepends_newest_first() {
        let (_dir, store) = temp_store();
        let registry = BatchRegistry::new(&store);
        let first = registry.create(Some("first.csv"), 2, vec!["a@x.com".into(), "b@x.com".into()]);
        let second = registry.create(Some("second.csv"), 1, vec!["c@x.com".into()]);
        let batches = registry.list();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].id, second);
        assert_eq!(batches[1].id, first);
        assert_eq!(batches[1].emails, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn ids_are_unique_even_within_one_millisecond() {
        let (_dir, store) = temp_store();
        let registry = BatchRegistry::new(&store);
        let mut ids: Vec<String> = (0..5)
            .map(|i| registry.create(None, i, Vec::new()))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn synthetic_names_count_up() {
        let (_dir, store) = temp_store();
        let registry = BatchRegistry::new(&store);
        registry.create(None, 0, Vec::new());
        registry.create(Some(""), 0, Vec::new());
        let batches = registry.list();
        assert_eq!(batches[1].name, "Batch 1");
        assert_eq!(batches[0].name, "Batch 2");
    }

    #[test]
    fn get_finds_by_id() {
        let (_dir, store) = temp_store();
        let registry = BatchRegistry::new(&store);
        let id = registry.create(Some("roster.csv"), 3, vec!["a@x.com".into()]);
        let batch = registry.get(&id).expect("batch present");
        assert_eq!(batch.name, "roster.csv");
        assert_eq!(batch.contact_count, 3);
        assert!(registry.get("batch_0").is_none());
    }

    #[test]
    fn existing_batches_are_never_rewritten() {
        let (_dir, store) = temp_store();
        let registry = BatchRegistry::new(&store);
        let first = registry.create(Some("first.csv"), 1, vec!["a@x.com".into()]);
        let before = registry.get(&first).unwrap();
        registry.create(Some("second.csv"), 1, vec!["b@x.com".into()]);
        let after = registry.get(&first).unwrap();
        assert_eq!(before.timestamp, after.timestamp);
        assert_eq!(before.emails, after.emails);
    }
}
