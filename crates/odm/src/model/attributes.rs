//! Attribute storage with dirty tracking.

use serde_json::{Map, Value};

/// Current attribute values, the last synced snapshot, and the changes of
/// the last save.
///
/// An attribute is dirty when it is absent from the snapshot or differs from
/// it structurally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    attributes: Map<String, Value>,
    original: Map<String, Value>,
    changes: Map<String, Value>,
}

impl AttributeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Sets an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Removes an attribute, returning its value.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(key)
    }

    /// Returns true if the attribute is set.
    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Returns every attribute.
    pub fn all(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Replaces every attribute. The snapshot is left untouched.
    pub fn replace(&mut self, attributes: Map<String, Value>) {
        self.attributes = attributes;
    }

    /// Returns the snapshot value of an attribute.
    pub fn original(&self, key: &str) -> Option<&Value> {
        self.original.get(key)
    }

    /// Returns the whole snapshot.
    pub fn originals(&self) -> &Map<String, Value> {
        &self.original
    }

    /// Returns the attributes that differ from the snapshot.
    ///
    /// Keys removed since the snapshot are reported as `null`.
    pub fn dirty(&self) -> Map<String, Value> {
        let mut dirty: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(key, value)| self.original.get(key.as_str()) != Some(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for key in self.removed() {
            dirty.insert(key, Value::Null);
        }
        dirty
    }

    /// Returns the snapshot keys that are no longer set.
    pub fn removed(&self) -> Vec<String> {
        self.original
            .keys()
            .filter(|key| !self.attributes.contains_key(key.as_str()))
            .cloned()
            .collect()
    }

    /// Returns true if any attribute differs from the snapshot.
    pub fn is_dirty(&self) -> bool {
        self.attributes
            .iter()
            .any(|(key, value)| self.original.get(key.as_str()) != Some(value))
            || self
                .original
                .keys()
                .any(|key| !self.attributes.contains_key(key.as_str()))
    }

    /// Returns true if `key` differs from the snapshot.
    pub fn is_dirty_key(&self, key: &str) -> bool {
        self.attributes.get(key) != self.original.get(key)
    }

    /// Returns the changes recorded by the last [`AttributeStore::sync_changes`].
    pub fn changes(&self) -> &Map<String, Value> {
        &self.changes
    }

    /// Checkpoints the current attributes as the snapshot.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Checkpoints a single attribute.
    pub fn sync_original_key(&mut self, key: &str) {
        match self.attributes.get(key) {
            Some(value) => {
                self.original.insert(key.to_string(), value.clone());
            }
            None => {
                self.original.shift_remove(key);
            }
        }
    }

    /// Records the current dirty attributes as the last changes.
    pub fn sync_changes(&mut self) {
        self.changes = self.dirty();
    }

    /// Clears the recorded changes.
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}
