use std::collections::BTreeMap;

use super::attributes::AttributeSet;
use datatrack_core_types::schema::{KIND_TRACKED_ATTRIBUTES, KIND_TRACKED_LIST, KIND_TRACKED_MAP};
use datatrack_core_types::ItemId;

/// A value stored in a tracked container
///
/// Stored data is opaque to the engine except for one question: is it itself
/// a trackable composite? Plain data is kept as a JSON value; tracked
/// composites are referenced by id and live in the [`crate::Tracker`] arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Plain(serde_json::Value),
    Tracked(ItemId),
}

impl Value {
    pub fn plain(value: impl Into<serde_json::Value>) -> Self {
        Value::Plain(value.into())
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, Value::Tracked(_))
    }

    pub fn as_tracked(&self) -> Option<&ItemId> {
        match self {
            Value::Tracked(id) => Some(id),
            Value::Plain(_) => None,
        }
    }

    pub fn as_plain(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Plain(value) => Some(value),
            Value::Tracked(_) => None,
        }
    }

    /// Composite kind this value would convert to, if any
    pub(crate) fn composite_kind(&self) -> Option<ContainerKind> {
        match self {
            Value::Plain(serde_json::Value::Object(_)) => Some(ContainerKind::Map),
            Value::Plain(serde_json::Value::Array(_)) => Some(ContainerKind::List),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Plain(value)
    }
}

impl From<ItemId> for Value {
    fn from(id: ItemId) -> Self {
        Value::Tracked(id)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Plain(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Plain(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Plain(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Plain(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Plain(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Plain(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Plain(value.into())
    }
}

/// Where a value sits inside its container
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Key(key) => write!(f, "{}", key),
            Location::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Location {
    fn from(key: &str) -> Self {
        Location::Key(key.to_string())
    }
}

impl From<String> for Location {
    fn from(key: String) -> Self {
        Location::Key(key)
    }
}

impl From<usize> for Location {
    fn from(index: usize) -> Self {
        Location::Index(index)
    }
}

/// Kind of trackable container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Map,
    List,
    Attributes,
}

impl ContainerKind {
    /// Name recorded in `extra.type`
    pub fn type_name(&self) -> &'static str {
        match self {
            ContainerKind::Map => KIND_TRACKED_MAP,
            ContainerKind::List => KIND_TRACKED_LIST,
            ContainerKind::Attributes => KIND_TRACKED_ATTRIBUTES,
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Native storage behind a trackable container
///
/// Map keys are kept sorted so renderings and `popitem` are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
    Attributes(AttributeSet),
}

impl Content {
    pub fn empty(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Map => Content::Map(BTreeMap::new()),
            ContainerKind::List => Content::List(Vec::new()),
            ContainerKind::Attributes => Content::Attributes(AttributeSet::new()),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Content::Map(_) => ContainerKind::Map,
            Content::List(_) => ContainerKind::List,
            Content::Attributes(_) => ContainerKind::Attributes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Content::Map(map) => map.len(),
            Content::List(list) => list.len(),
            Content::Attributes(attributes) => attributes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored value paired with its location
    pub fn entries(&self) -> Vec<(Location, &Value)> {
        match self {
            Content::Map(map) => map
                .iter()
                .map(|(key, value)| (Location::Key(key.clone()), value))
                .collect(),
            Content::List(list) => list
                .iter()
                .enumerate()
                .map(|(index, value)| (Location::Index(index), value))
                .collect(),
            Content::Attributes(attributes) => attributes
                .values()
                .iter()
                .map(|(name, value)| (Location::Key(name.clone()), value))
                .collect(),
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Content::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Content::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&AttributeSet> {
        match self {
            Content::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Ids of every tracked value held directly by this content
    pub fn tracked_ids(&self) -> Vec<ItemId> {
        self.entries()
            .into_iter()
            .filter_map(|(_, value)| value.as_tracked().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_composite_kind_detection() {
        assert_eq!(
            Value::from(json!({"a": 1})).composite_kind(),
            Some(ContainerKind::Map)
        );
        assert_eq!(
            Value::from(json!([1, 2])).composite_kind(),
            Some(ContainerKind::List)
        );
        assert_eq!(Value::from("text").composite_kind(), None);
        assert_eq!(Value::Tracked(ItemId::new()).composite_kind(), None);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::from("status").to_string(), "status");
        assert_eq!(Location::from(3usize).to_string(), "3");
    }

    #[test]
    fn test_content_entries_follow_storage_order() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::from(2i64));
        map.insert("a".to_string(), Value::from(1i64));
        let content = Content::Map(map);

        let keys: Vec<String> = content
            .entries()
            .into_iter()
            .map(|(location, _)| location.to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_tracked_ids_skip_plain_values() {
        let child = ItemId::new();
        let content = Content::List(vec![Value::from("x"), Value::Tracked(child.clone())]);
        assert_eq!(content.tracked_ids(), vec![child]);
    }
}
