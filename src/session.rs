use std::path::PathBuf;

use crate::api::models::{Contact, GeneratedMessage};
use crate::storage::{Slot, Store};
use crate::tracking::Status;

/// Wizard position. Forward moves are gated (upload data for Templates, a
/// generation result for Results); backward moves are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Templates,
    Results,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Step::Upload => 1,
            Step::Templates => 2,
            Step::Results => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    NameAsc,
    NameDesc,
    EmailAsc,
    Status,
}

/// In-memory session state, owned by the UI thread and written through to the
/// contact/message cache slots after every mutation.
pub struct SessionState {
    pub contacts: Vec<Contact>,
    pub messages: Vec<GeneratedMessage>,
    pub selected_template: String,
    pub step: Step,
    pub category: String,
    pub search: String,
    pub sort: SortBy,
    pub selected_file: Option<PathBuf>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
            messages: Vec::new(),
            selected_template: "general".to_string(),
            step: Step::Upload,
            category: "initial".to_string(),
            search: String::new(),
            sort: SortBy::default(),
            selected_file: None,
        }
    }

    /// Restore cached contacts and messages from a previous session.
    /// Returns true when any contacts came back, so the UI can mention it.
    pub fn hydrate(&mut self, store: &Store) -> bool {
        self.contacts = store.load(Slot::ContactsCache, Vec::new());
        self.messages = store.load(Slot::MessagesCache, Vec::new());
        !self.contacts.is_empty()
    }

    pub fn cache_contacts(&self, store: &Store) {
        if let Err(e) = store.save(Slot::ContactsCache, &self.contacts) {
            log::warn!("contact cache write failed: {e}");
        }
    }

    pub fn cache_messages(&self, store: &Store) {
        if let Err(e) = store.save(Slot::MessagesCache, &self.messages) {
            log::warn!("message cache write failed: {e}");
        }
    }

    /// Guard for the generate transition. Rejecting here means no network
    /// call is issued and the wizard stays where it is.
    pub fn ensure_can_generate(&self) -> Result<(), &'static str> {
        if self.contacts.is_empty() {
            return Err("No contact data available. Please upload a file first.");
        }
        Ok(())
    }

    /// Full reset back to step 1: session fields and the two session cache
    /// slots are cleared; the tracking ledger and batch registry are kept.
    pub fn reset(&mut self, store: &Store) {
        self.contacts.clear();
        self.messages.clear();
        self.selected_template = "general".to_string();
        self.category = "initial".to_string();
        self.search.clear();
        self.sort = SortBy::default();
        self.selected_file = None;
        self.step = Step::Upload;
        if let Err(e) = store.clear(Slot::ContactsCache) {
            log::warn!("contact cache clear failed: {e}");
        }
        if let Err(e) = store.clear(Slot::MessagesCache) {
            log::warn!("message cache clear failed: {e}");
        }
    }

    /// Current messages filtered by the search query (name or email,
    /// case-insensitive) and ordered by the current sort. Status sort ranks
    /// signed first, then responded, pending, declined.
    pub fn visible_messages<F>(&self, status_of: F) -> Vec<GeneratedMessage>
    where
        F: Fn(&str) -> Status,
    {
        let query = self.search.to_lowercase();
        let query = query.trim();
        let mut visible: Vec<GeneratedMessage> = self
            .messages
            .iter()
            .filter(|m| {
                query.is_empty()
                    || m.name.to_lowercase().contains(query)
                    || m.email.to_lowercase().contains(query)
            })
            .cloned()
            .collect();
        match self.sort {
            SortBy::NameAsc => visible.sort_by(|a, b| a.name.cmp(&b.name)),
            SortBy::NameDesc => visible.sort_by(|a, b| b.name.cmp(&a.name)),
            SortBy::EmailAsc => visible.sort_by(|a, b| a.email.cmp(&b.email)),
            SortBy::Status => {
                visible.sort_by_key(|m| status_rank(status_of(&m.email)));
            }
        }
        visible
    }
}

fn status_rank(status: Status) -> u8 {
    match status {
        Status::Signed => 0,
        Status::Responded => 1,
        Status::Pending => 2,
        Status::Declined => 3,
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

    fn contact(name: &str, email: &str) -> Contact {
        Contact {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    fn msg(name: &str, email: &str) -> GeneratedMessage {
        GeneratedMessage {
            name: name.to_string(),
            email: email.to_string(),
            subject: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn generate_guard_rejects_empty_contact_list() {
        let session = SessionState::new();
        assert!(session.ensure_can_generate().is_err());
        assert_eq!(session.step, Step::Upload);
    }

    #[test]
    fn generate_guard_passes_with_contacts() {
        let mut session = SessionState::new();
        session.contacts.push(contact("Ada", "ada@x.com"));
        assert!(session.ensure_can_generate().is_ok());
    }

    #[test]
    fn reset_clears_session_slots_but_keeps_durable_ones() {
        let (_dir, store) = temp_store();
        let mut session = SessionState::new();
        session.contacts.push(contact("Ada", "ada@x.com"));
        session.messages.push(msg("Ada", "ada@x.com"));
        session.step = Step::Results;
        session.cache_contacts(&store);
        session.cache_messages(&store);
        store.save(Slot::Tracking, &vec!["ledger".to_string()]).unwrap();
        store.save(Slot::Batches, &vec!["batches".to_string()]).unwrap();

        session.reset(&store);

        assert!(session.contacts.is_empty());
        assert!(session.messages.is_empty());
        assert_eq!(session.step, Step::Upload);
        assert_eq!(session.selected_template, "general");
        let contacts: Vec<Contact> = store.load(Slot::ContactsCache, Vec::new());
        let messages: Vec<GeneratedMessage> = store.load(Slot::MessagesCache, Vec::new());
        assert!(contacts.is_empty());
        assert!(messages.is_empty());
        let tracking: Vec<String> = store.load(Slot::Tracking, Vec::new());
        let batches: Vec<String> = store.load(Slot::Batches, Vec::new());
        assert_eq!(tracking, vec!["ledger"]);
        assert_eq!(batches, vec!["batches"]);
    }

    #[test]
    fn hydrate_restores_cached_session() {
        let (_dir, store) = temp_store();
        let mut session = SessionState::new();
        session.contacts.push(contact("Ada", "ada@x.com"));
        session.messages.push(msg("Ada", "ada@x.com"));
        session.cache_contacts(&store);
        session.cache_messages(&store);

        let mut restored = SessionState::new();
        assert!(restored.hydrate(&store));
        assert_eq!(restored.contacts.len(), 1);
        assert_eq!(restored.messages.len(), 1);
        assert_eq!(restored.contacts[0].email, "ada@x.com");
    }

    #[test]
    fn search_matches_name_or_email_case_insensitively() {
        let mut session = SessionState::new();
        session.messages = vec![msg("Ada Lovelace", "ada@x.com"), msg("Bob", "bob@y.com")];
        session.search = "LOVELACE".to_string();
        let visible = session.visible_messages(|_| Status::Pending);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].email, "ada@x.com");

        session.search = "y.com".to_string();
        let visible = session.visible_messages(|_| Status::Pending);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Bob");
    }

    #[test]
    fn status_sort_ranks_signed_first() {
        let mut session = SessionState::new();
        session.messages = vec![msg("A", "a@x.com"), msg("B", "b@x.com"), msg("C", "c@x.com")];
        session.sort = SortBy::Status;
        let visible = session.visible_messages(|email| match email {
            "b@x.com" => Status::Signed,
            "c@x.com" => Status::Responded,
            _ => Status::Declined,
        });
        let order: Vec<&str> = visible.iter().map(|m| m.email.as_str()).collect();
        assert_eq!(order, vec!["b@x.com", "c@x.com", "a@x.com"]);
    }
}
