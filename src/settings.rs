use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::strings::UiLanguage;

pub const KEY_API_KEYS: &str = "api_keys";
pub const KEY_API_KEY_INDEX: &str = "api_key_index";
pub const KEY_ACTIVE_PROVIDER: &str = "active_provider";
pub const KEY_CONTEXT_PROMPT: &str = "context_prompt";
pub const KEY_UI_LANGUAGE: &str = "ui_language";

pub const DEFAULT_PROVIDER: &str = "gemini";

/// Key-value persistence boundary. The translation core never touches the
/// filesystem directly; everything that must survive a restart (key list,
/// rotation cursor, active provider, context prompt, UI language) goes
/// through an injected store.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// TOML-file-backed store holding a flat string table. Writes are
/// best-effort: a failed flush is logged, not raised, so a read-only
/// filesystem degrades to session-local settings.
pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut values = BTreeMap::new();
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: toml::Table = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            for (key, value) in parsed {
                if let toml::Value::String(value) = value {
                    values.insert(key, value);
                }
            }
        }
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &BTreeMap<String, String>) {
        let table: toml::Table = values
            .iter()
            .map(|(key, value)| (key.clone(), toml::Value::String(value.clone())))
            .collect();
        let serialized = match toml::to_string_pretty(&table) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize settings: {}", err);
                return;
            }
        };
        if let Some(parent) = self.path.parent()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!("failed to create settings directory: {}", err);
            return;
        }
        if let Err(err) = fs::write(&self.path, serialized) {
            warn!("failed to write settings: {}", err);
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let Ok(mut values) = self.values.lock() else {
            return;
        };
        values.insert(key.to_string(), value.to_string());
        self.flush(&values);
    }
}

/// In-memory store for tests and embedders with their own persistence.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ln-translator").join("settings.toml"))
        }
    })
}

/// Stored API keys: JSON-encoded string array, blanks dropped, duplicates
/// removed preserving first occurrence.
pub fn api_keys(store: &dyn SettingsStore) -> Vec<String> {
    let Some(raw) = store.get(KEY_API_KEYS) else {
        return Vec::new();
    };
    let parsed: Vec<String> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("failed to parse stored API keys: {}", err);
            return Vec::new();
        }
    };
    let mut keys = Vec::new();
    for key in parsed {
        let key = key.trim().to_string();
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

pub fn set_api_keys(store: &dyn SettingsStore, keys: &[String]) {
    match serde_json::to_string(keys) {
        Ok(encoded) => store.set(KEY_API_KEYS, &encoded),
        Err(err) => warn!("failed to encode API keys: {}", err),
    }
}

pub fn api_key_index(store: &dyn SettingsStore) -> usize {
    store
        .get(KEY_API_KEY_INDEX)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

pub fn active_provider(store: &dyn SettingsStore) -> String {
    store
        .get(KEY_ACTIVE_PROVIDER)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
}

pub fn context_prompt(store: &dyn SettingsStore) -> String {
    store.get(KEY_CONTEXT_PROMPT).unwrap_or_default()
}

pub fn ui_language(store: &dyn SettingsStore) -> UiLanguage {
    store
        .get(KEY_UI_LANGUAGE)
        .as_deref()
        .map(UiLanguage::from_code)
        .unwrap_or_default()
}
