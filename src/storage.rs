//! String key-value persistence for cooldown state.
//!
//! The controller only ever talks to [`KeyValueStore`], so the browser's
//! `localStorage` can be swapped for [`MemoryStore`] in tests, or at runtime
//! when the browser refuses to hand out persistent storage.

use crate::utils::{parse_stored_int, CooldownKeys};
use crate::CooldownState;
use log::warn;
use std::cell::RefCell;
use std::collections::HashMap;
use web_sys::Storage;

/// Narrow string-to-string store. Writes are best-effort.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }
}

/// Browser `localStorage`.
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// `None` when the page has no window or storage access is denied.
    pub fn from_window() -> Option<Self> {
        let window = web_sys::window()?;
        match window.local_storage() {
            Ok(Some(storage)) => Some(Self::new(storage)),
            Ok(None) => None,
            Err(e) => {
                warn!("localStorage unavailable: {:?}", e);
                None
            }
        }
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set_item(key, value) {
            warn!("Failed to persist {}: {:?}", key, e);
        }
    }
}

/// In-memory store that lives as long as the page.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Persistent `localStorage` when available, otherwise a page-lifetime
/// in-memory store so the cooldown still works until reload.
pub fn browser_store() -> Box<dyn KeyValueStore> {
    match LocalStore::from_window() {
        Some(store) => Box::new(store),
        None => {
            warn!("Falling back to in-memory cooldown state");
            Box::new(MemoryStore::new())
        }
    }
}

/// Read both counters; missing or malformed values read as zero.
pub fn load_state<S: KeyValueStore + ?Sized>(store: &S, keys: &CooldownKeys) -> CooldownState {
    CooldownState {
        attempts: parse_stored_int(store.get(&keys.attempts).as_deref()),
        until: parse_stored_int(store.get(&keys.until).as_deref()),
    }
}

pub fn save_state<S: KeyValueStore + ?Sized>(store: &S, keys: &CooldownKeys, state: &CooldownState) {
    store.set(&keys.attempts, &state.attempts.to_string());
    store.set(&keys.until, &state.until.to_string());
}
