use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::settings::{self, SettingsStore};

/// Round-robin pool of API keys with a persisted rotation cursor.
///
/// The cursor is the single piece of shared mutable state in the crate;
/// `advance` is the only mutation point and is serialized behind a mutex so
/// concurrent sessions sharing one pool keep the round-robin invariant. The
/// new cursor is written back to the settings store so rotation survives a
/// process restart.
pub struct KeyPool {
    keys: Vec<String>,
    cursor: Mutex<usize>,
    store: Arc<dyn SettingsStore>,
}

impl KeyPool {
    /// Loads the key list and persisted cursor from the store. The cursor is
    /// clamped into range in case keys were removed since it was written.
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let keys = settings::api_keys(store.as_ref());
        let cursor = if keys.is_empty() {
            0
        } else {
            settings::api_key_index(store.as_ref()).min(keys.len() - 1)
        };
        Self {
            keys,
            cursor: Mutex::new(cursor),
            store,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key the cursor currently points at, or `None` for an empty pool.
    pub fn current(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let cursor = self.cursor.lock().ok()?;
        Some(self.keys[(*cursor).min(self.keys.len() - 1)].clone())
    }

    /// Moves the cursor forward circularly, persists it, and returns the new
    /// current key. `None` for an empty pool; never panics.
    pub fn advance(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let Ok(mut cursor) = self.cursor.lock() else {
            return None;
        };
        *cursor = (*cursor + 1) % self.keys.len();
        debug!("rotated API key to slot {}/{}", *cursor + 1, self.keys.len());
        self.store
            .set(settings::KEY_API_KEY_INDEX, &cursor.to_string());
        Some(self.keys[*cursor].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{KEY_API_KEY_INDEX, KEY_API_KEYS, MemorySettingsStore};

    fn pool_with_keys(keys: &str, index: Option<&str>) -> (KeyPool, Arc<MemorySettingsStore>) {
        let store = Arc::new(MemorySettingsStore::new());
        store.set(KEY_API_KEYS, keys);
        if let Some(index) = index {
            store.set(KEY_API_KEY_INDEX, index);
        }
        let pool = KeyPool::load(store.clone() as Arc<dyn SettingsStore>);
        (pool, store)
    }

    #[test]
    fn empty_pool_returns_none() {
        let store = Arc::new(MemorySettingsStore::new());
        let pool = KeyPool::load(store);
        assert!(pool.is_empty());
        assert_eq!(pool.current(), None);
        assert_eq!(pool.advance(), None);
    }

    #[test]
    fn advance_wraps_back_to_start() {
        let (pool, _) = pool_with_keys(r#"["a", "b", "c"]"#, None);
        let first = pool.current();
        for _ in 0..pool.len() {
            pool.advance();
        }
        assert_eq!(pool.current(), first);
    }

    #[test]
    fn advance_persists_cursor() {
        let (pool, store) = pool_with_keys(r#"["a", "b"]"#, None);
        assert_eq!(pool.advance().as_deref(), Some("b"));
        assert_eq!(store.get(KEY_API_KEY_INDEX).as_deref(), Some("1"));

        // a fresh pool resumes from the persisted cursor
        let reloaded = KeyPool::load(store.clone() as Arc<dyn SettingsStore>);
        assert_eq!(reloaded.current().as_deref(), Some("b"));
    }

    #[test]
    fn stale_cursor_is_clamped() {
        let (pool, _) = pool_with_keys(r#"["a", "b"]"#, Some("7"));
        assert_eq!(pool.current().as_deref(), Some("b"));
        assert_eq!(pool.advance().as_deref(), Some("a"));
    }
}
