use serde::{Deserialize, Serialize};

/// One recruitment target extracted from an uploaded file by the backend.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Contact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub first_name: String,
    /// Recomputed on every validation pass, never persisted.
    #[serde(skip)]
    pub is_duplicate: bool,
}

impl Contact {
    /// Keep the derived first name in step with an edited full name.
    pub fn rederive_first_name(&mut self) {
        self.first_name = self
            .name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
    }
}

/// A personalized message produced by the backend. Immutable once created.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratedMessage {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Catalog entry from the backend's template listing.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

fn default_category() -> String {
    "initial".to_string()
}

/// Result of an upload: the parsed contacts, plus a warning when the backend
/// could only recover part of the file.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub contacts: Vec<Contact>,
    pub warning: Option<String>,
}
