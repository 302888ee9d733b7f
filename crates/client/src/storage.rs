//! Pluggable token storage.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Storage keys used by the session handle.
pub const KEY_SESSION_TOKEN: &str = "session_token";
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_USER_DATA: &str = "user_data";

/// Key-value storage for the session's token set.
///
/// The handle only ever touches the four keys above; implementations map
/// them onto whatever the host environment persists (browser storage,
/// keychain, a file). All methods are infallible; a backend that can fail
/// should treat a failed read as absent.
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-process storage, the default and the test substitute.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}
