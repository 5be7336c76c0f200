//! Dirty-tracking attribute storage

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Wire-name keyed values of one request part plus the names modified since
/// the last sync with the server
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    attributes: Map<String, Value>,
    dirty: BTreeSet<String>,
}

impl PartialEq for AttributeStore {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl AttributeStore {
    /// `synchronized` stores mirror server state, so nothing starts dirty
    pub fn new(attributes: Map<String, Value>, synchronized: bool) -> Self {
        let dirty = if synchronized {
            BTreeSet::new()
        } else {
            attributes.keys().cloned().collect()
        };
        Self { attributes, dirty }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Store a value; only a changed value marks the key dirty
    pub fn set(&mut self, key: &str, value: Value) {
        if self.attributes.get(key) == Some(&value) {
            return;
        }
        self.attributes.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
    }

    /// Remove a value; the key is marked dirty even if it was absent
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.dirty.insert(key.to_string());
        self.attributes.remove(key)
    }

    pub fn update<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in values {
            self.set(&key, value);
        }
    }

    /// Modified entries; removed keys report `null`
    pub fn dirty(&self) -> Map<String, Value> {
        self.dirty
            .iter()
            .map(|key| {
                let value = self.attributes.get(key).cloned().unwrap_or(Value::Null);
                (key.clone(), value)
            })
            .collect()
    }

    pub fn dirty_keys(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Forget that `key` was modified without touching its value
    pub fn discard_dirty(&mut self, key: &str) {
        self.dirty.remove(key);
    }

    /// Mark every entry as in sync with the server
    pub fn clean(&mut self) {
        self.dirty.clear();
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
