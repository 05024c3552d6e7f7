use adw::Application;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use directories::BaseDirs;

use crate::storage::Store;

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_theme() -> String {
    "light".to_string()
}

/// Persisted app settings: backend URL and theme preference. Stored as plain
/// TOML in the config dir; unlike the cache slots this is deliberately
/// readable and hand-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            theme: default_theme(),
        }
    }
}

impl AppState {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("outreach.toml"))
    }

    pub fn load() -> Self {
        if let Some(path) = Self::toml_path() {
            if let Ok(bytes) = fs::read(&path) {
                if let Ok(text) = String::from_utf8(bytes) {
                    if let Ok(state) = toml::from_str::<AppState>(&text) {
                        return state;
                    }
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::toml_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let toml = toml::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            fs::write(path, toml)
        } else {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir"))
        }
    }

    pub fn dark(&self) -> bool {
        self.theme == "dark"
    }
}

pub fn apply_theme(state: &AppState) {
    let scheme = if state.dark() {
        adw::ColorScheme::ForceDark
    } else {
        adw::ColorScheme::ForceLight
    };
    adw::StyleManager::default().set_color_scheme(scheme);
}

pub fn build_ui(app: &Application) {
    let state = AppState::load();
    apply_theme(&state);
    // Degrade to a throwaway store if the data dir is unusable: the app
    // still runs, it just forgets.
    let store = match Store::open_default().or_else(|e| {
        log::error!("could not open slot store: {e}");
        Store::open_at(std::env::temp_dir().join("outreach-slots.sqlite"))
    }) {
        Ok(store) => store,
        Err(e) => {
            log::error!("could not open fallback store: {e}");
            return;
        }
    };
    crate::ui::main_window::show_main_window(app, state, store);
}
