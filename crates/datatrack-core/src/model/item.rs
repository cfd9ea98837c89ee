use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use super::entry::ChangeLogEntry;
use super::value::{ContainerKind, Content, Location};
use crate::config::ItemOptions;
use crate::observers::ObserverRegistry;
use datatrack_core_types::{EntryId, ItemId};

/// Link from a child to the item that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct ParentLink {
    pub parent_id: ItemId,
    pub location: Location,
}

/// Registry record for a child, keyed by the child's id in the owner
///
/// Holds only the id-keyed location; the child itself lives in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildLink {
    pub location: Location,
}

/// Identity and state owner behind every tracked container
///
/// Items live in the [`crate::Tracker`] arena and reference each other only
/// by id. Locking an item never locks its children.
#[derive(Debug)]
pub struct TrackableItem {
    pub(crate) id: ItemId,
    pub(crate) kind: ContainerKind,
    pub(crate) content: Content,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: BTreeMap<ItemId, ChildLink>,
    pub(crate) locked: bool,
    pub(crate) auto_convert: bool,
    pub(crate) delimiter: String,
    pub(crate) capture_snapshots: bool,
    pub(crate) observers: ObserverRegistry,
    pub(crate) history: Vec<ChangeLogEntry>,
    seen: HashSet<EntryId>,
    pub(crate) created_at: DateTime<Utc>,
}

impl TrackableItem {
    pub(crate) fn new(kind: ContainerKind, options: &ItemOptions) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            content: Content::empty(kind),
            parent: None,
            children: BTreeMap::new(),
            locked: false,
            auto_convert: options.auto_convert,
            delimiter: options.delimiter.clone(),
            capture_snapshots: options.capture_snapshots,
            observers: ObserverRegistry::new(),
            history: Vec::new(),
            seen: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &BTreeMap<ItemId, ChildLink> {
        &self.children
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn auto_convert(&self) -> bool {
        self.auto_convert
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn capture_snapshots(&self) -> bool {
        self.capture_snapshots
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// History oldest-first, optionally only the last `most_recent` entries
    pub fn tracking_changes(&self, most_recent: Option<usize>) -> &[ChangeLogEntry] {
        match most_recent {
            Some(count) => &self.history[self.history.len().saturating_sub(count)..],
            None => &self.history,
        }
    }

    /// Append an entry unless one with the same id is already recorded
    pub(crate) fn record(&mut self, entry: ChangeLogEntry) -> bool {
        if !self.seen.insert(entry.id().clone()) {
            return false;
        }
        self.history.push(entry);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Actor, Extra};

    fn entry_for(item: &TrackableItem) -> ChangeLogEntry {
        ChangeLogEntry::new(item.id.clone(), Action::Update, Actor::Unknown, Extra::new())
    }

    #[test]
    fn test_new_item_uses_options() {
        let options = ItemOptions::default().delimiter("/").auto_convert(true);
        let item = TrackableItem::new(ContainerKind::List, &options);

        assert_eq!(item.kind(), ContainerKind::List);
        assert_eq!(item.delimiter(), "/");
        assert!(item.auto_convert());
        assert!(!item.is_locked());
        assert!(item.parent().is_none());
        assert!(item.content().is_empty());
    }

    #[test]
    fn test_record_dedups_by_entry_id() {
        let mut item = TrackableItem::new(ContainerKind::Map, &ItemOptions::default());
        let entry = entry_for(&item);

        assert!(item.record(entry.clone()));
        assert!(!item.record(entry));
        assert_eq!(item.tracking_changes(None).len(), 1);
    }

    #[test]
    fn test_tracking_changes_most_recent_slice() {
        let mut item = TrackableItem::new(ContainerKind::Map, &ItemOptions::default());
        let entries: Vec<_> = (0..3).map(|_| entry_for(&item)).collect();
        for entry in &entries {
            item.record(entry.clone());
        }

        let recent = item.tracking_changes(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0], entries[1]);
        assert_eq!(recent[1], entries[2]);
        assert_eq!(item.tracking_changes(Some(10)).len(), 3);
    }
}
