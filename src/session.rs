use std::collections::HashMap;

use serde_json::Value;

/// Capability contract for the per-visitor session store.
///
/// Any framework session can be adapted by implementing these three methods.
/// A key that exists may legitimately hold `null`, which is why `exists` is
/// separate from `get`.
pub trait SessionStore {
    fn exists(&self, key: &str) -> bool;
    fn get(&self, key: &str, default: Value) -> Value;
    fn put(&mut self, key: &str, value: Value);
}

/// Default in-memory session, used when the caller does not supply one.
///
/// Only suitable for tests and single-process setups; production callers
/// should wrap whatever session their web framework provides.
#[derive(Debug, Default)]
pub struct MemorySessionBag {
    values: HashMap<String, Value>,
}

impl MemorySessionBag {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionBag {
    fn exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn put(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

pub(crate) fn prefixed(prefix: &str, field: &str) -> String {
    format!("{prefix}{field}")
}
