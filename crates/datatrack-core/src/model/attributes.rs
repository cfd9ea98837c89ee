use std::collections::{BTreeMap, BTreeSet};

use super::value::Value;

/// Named fields behind a tracked-attributes container
///
/// Every field can be read and written, but only monitored fields are
/// intercepted: writes to them are recorded and their composite values are
/// adopted as children. A locked field refuses writes whether or not it is
/// monitored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeSet {
    values: BTreeMap<String, Value>,
    monitored: Vec<String>,
    locked: BTreeSet<String>,
    originals: BTreeMap<String, Value>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Monitored field names in the order monitoring started
    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    pub fn is_monitored(&self, name: &str) -> bool {
        self.monitored.iter().any(|monitored| monitored == name)
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    /// Value the field held when monitoring started
    pub fn original(&self, name: &str) -> Option<&Value> {
        self.originals.get(name)
    }

    pub(crate) fn insert(&mut self, name: String, value: Value) -> Option<Value> {
        self.values.insert(name, value)
    }

    pub(crate) fn monitor(&mut self, name: String, original: Value) {
        if !self.is_monitored(&name) {
            self.originals.insert(name.clone(), original);
            self.monitored.push(name);
        }
    }

    pub(crate) fn lock(&mut self, name: &str) -> bool {
        self.locked.insert(name.to_string())
    }

    pub(crate) fn unlock(&mut self, name: &str) -> bool {
        self.locked.remove(name)
    }
}
