use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::value::ContainerKind;
use datatrack_core_types::schema::{
    EXTRA_ACTION, EXTRA_LOCATION, EXTRA_REMOVED_ITEMS, EXTRA_TYPE, EXTRA_VALUE,
};
use datatrack_core_types::{EntryId, ItemId, Origin};

/// Kind of mutation an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Add,
    Update,
    Remove,
    Copy,
    Init,
    Lock,
    Unlock,
    /// A tracked-attributes field started being monitored
    #[serde(rename = "start monitoring")]
    StartMonitoring,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Remove => "remove",
            Action::Copy => "copy",
            Action::Init => "init",
            Action::Lock => "lock",
            Action::Unlock => "unlock",
            Action::StartMonitoring => "start monitoring",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribution of a mutation, resolved once when the entry is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Known(Origin),
    Unknown,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Known(origin) => write!(f, "{}", origin),
            Actor::Unknown => f.write_str("unknown"),
        }
    }
}

/// One value in an entry's `extra` mapping
///
/// `display` is rendered when the entry is built and never recomputed.
/// `snapshot` keeps a typed copy of non-textual values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraField {
    display: String,
    snapshot: Option<serde_json::Value>,
}

impl ExtraField {
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn snapshot(&self) -> Option<&serde_json::Value> {
        self.snapshot.as_ref()
    }
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Builder for the open `extra` mapping of a new entry
#[derive(Debug, Clone, Default)]
pub struct Extra {
    fields: BTreeMap<String, ExtraField>,
}

impl Extra {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a textual field
    pub fn text(mut self, key: &str, text: impl Into<String>) -> Self {
        self.insert_text(key, text);
        self
    }

    /// Add a rendered snapshot of a JSON value
    pub fn snapshot(mut self, key: &str, value: &serde_json::Value) -> Self {
        self.insert_snapshot(key, value);
        self
    }

    pub fn insert_text(&mut self, key: &str, text: impl Into<String>) {
        self.fields.insert(
            key.to_string(),
            ExtraField {
                display: text.into(),
                snapshot: None,
            },
        );
    }

    pub fn insert_snapshot(&mut self, key: &str, value: &serde_json::Value) {
        self.fields.insert(
            key.to_string(),
            ExtraField {
                display: render(value),
                snapshot: Some(value.clone()),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}

/// Immutable record of one intercepted mutation
///
/// Equality is by id; ordering is by creation time (id breaks ties).
/// Propagation never edits an emitted entry: each hop works on a copy.
#[derive(Debug, Clone)]
pub struct ChangeLogEntry {
    id: EntryId,
    subject_id: ItemId,
    created_at: DateTime<Utc>,
    actor: Actor,
    action: Action,
    extra: BTreeMap<String, ExtraField>,
    tree: Vec<ItemId>,
}

impl ChangeLogEntry {
    pub(crate) fn new(subject_id: ItemId, action: Action, actor: Actor, extra: Extra) -> Self {
        let mut fields = extra.fields;
        fields.insert(
            EXTRA_ACTION.to_string(),
            ExtraField {
                display: action.as_str().to_string(),
                snapshot: None,
            },
        );
        Self {
            id: EntryId::new(),
            subject_id,
            created_at: Utc::now(),
            actor,
            action,
            extra: fields,
            tree: Vec::new(),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    /// Item this entry currently describes
    pub fn subject_id(&self) -> &ItemId {
        &self.subject_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Ancestors this entry has been rebroadcast through, root-first
    pub fn tree(&self) -> &[ItemId] {
        &self.tree
    }

    /// Rendered value of an `extra` key
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(ExtraField::display)
    }

    pub fn extra_field(&self, key: &str) -> Option<&ExtraField> {
        self.extra.get(key)
    }

    pub fn extra_fields(&self) -> &BTreeMap<String, ExtraField> {
        &self.extra
    }

    pub fn location(&self) -> Option<&str> {
        self.extra(EXTRA_LOCATION)
    }

    pub fn value(&self) -> Option<&str> {
        self.extra(EXTRA_VALUE)
    }

    pub fn removed_items(&self) -> Option<&str> {
        self.extra(EXTRA_REMOVED_ITEMS)
    }

    pub fn container_type(&self) -> Option<&str> {
        self.extra(EXTRA_TYPE)
    }

    /// Re-home this entry onto another item
    ///
    /// The copy gets a fresh id and shares timestamp, actor and the tree
    /// accumulated so far; `extra.type` and the subject are replaced.
    pub(crate) fn copy(&self, new_kind: ContainerKind, new_subject_id: ItemId) -> Self {
        let mut extra = self.extra.clone();
        extra.insert(
            EXTRA_TYPE.to_string(),
            ExtraField {
                display: new_kind.type_name().to_string(),
                snapshot: None,
            },
        );
        Self {
            id: EntryId::new(),
            subject_id: new_subject_id,
            created_at: self.created_at,
            actor: self.actor.clone(),
            action: self.action,
            extra,
            tree: self.tree.clone(),
        }
    }

    pub(crate) fn set_location(&mut self, location: String) {
        self.extra.insert(
            EXTRA_LOCATION.to_string(),
            ExtraField {
                display: location,
                snapshot: None,
            },
        );
    }

    /// Record one more ancestor; the newest hop is the outermost, so it goes first
    pub(crate) fn add_to_tree(&mut self, ancestor: ItemId) {
        self.tree.insert(0, ancestor);
    }
}

impl PartialEq for ChangeLogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChangeLogEntry {}

impl PartialOrd for ChangeLogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChangeLogEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Flat, serializable form of an entry used by file and queue sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: String,
    pub subject_id: String,
    pub created_at: String,
    pub actor: Actor,
    pub extra: BTreeMap<String, String>,
}

impl From<&ChangeLogEntry> for ChangeRecord {
    fn from(entry: &ChangeLogEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            subject_id: entry.subject_id.to_string(),
            created_at: entry
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            actor: entry.actor.clone(),
            extra: entry
                .extra
                .iter()
                .map(|(key, field)| (key.clone(), field.display.clone()))
                .collect(),
        }
    }
}
