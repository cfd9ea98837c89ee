use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ItemOptions, TrackerConfig, ATTRIBUTE_DELIMITER};
use crate::errors::{Result, TrackingError};
use crate::model::{
    Action, ChangeLogEntry, ChildLink, ContainerKind, Content, Extra, Location, ParentLink,
    TrackableItem, Value,
};
use crate::observers::{Observer, Sink, SinkError};
use crate::ops::convert;
use crate::origin::{OriginResolver, ScopedOriginResolver};
use datatrack_core_types::schema::{EXTRA_LOCKED, EXTRA_METHOD, EXTRA_TYPE};
use datatrack_core_types::{EntryId, ItemId};

/// Arena owning every trackable item
///
/// Items reference each other only by id: a parent lists its children in an
/// id-keyed registry and a child keeps its parent's id, so the ownership graph
/// holds no reference cycles. Not thread-safe; one logical owner mutates a
/// tracker at a time.
pub struct Tracker {
    pub(crate) items: HashMap<ItemId, TrackableItem>,
    pub(crate) config: TrackerConfig,
    resolver: Box<dyn OriginResolver>,
    sink_failures: Vec<TrackingError>,
}

/// One pending step of a delivery walk
enum Delivery {
    Item(ItemId, ChangeLogEntry),
    Sink(Arc<dyn Sink>, ChangeLogEntry),
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("items", &self.items.len())
            .field("config", &self.config)
            .field("sink_failures", &self.sink_failures.len())
            .finish()
    }
}

impl Tracker {
    /// Create an empty tracker with default configuration
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    /// Create an empty tracker; the default resolver honours `ignored_origins`
    pub fn with_config(config: TrackerConfig) -> Self {
        let resolver = ScopedOriginResolver::with_ignored(config.ignored_origins.clone());
        Self {
            items: HashMap::new(),
            config,
            resolver: Box::new(resolver),
            sink_failures: Vec::new(),
        }
    }

    /// Replace the origin resolver
    pub fn with_resolver(mut self, resolver: impl OriginResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Construction options seeded from this tracker's config
    pub fn options(&self) -> ItemOptions {
        ItemOptions::from_config(&self.config)
    }

    /// Like [`Tracker::options`], with the `.` delimiter attribute containers use
    pub fn attribute_options(&self) -> ItemOptions {
        self.options().delimiter(ATTRIBUTE_DELIMITER)
    }

    // ===== Construction =====

    /// Create a tracked map
    ///
    /// With `auto_convert`, nested JSON objects/arrays in `initial` become
    /// tracked children. With `options.parent`, the map registers itself as
    /// that item's child.
    ///
    /// # Errors
    ///
    /// * `ItemNotFound` - the parent, or a tracked initial value, does not exist
    /// * `AlreadyOwned` / `CycleDetected` - a tracked initial value cannot be adopted
    pub fn create_map(
        &mut self,
        initial: impl IntoIterator<Item = (String, Value)>,
        options: ItemOptions,
    ) -> Result<ItemId> {
        let entries = initial
            .into_iter()
            .map(|(key, value)| (Location::Key(key), value))
            .collect();
        self.construct(ContainerKind::Map, entries, options)
    }

    /// Create a tracked list
    ///
    /// # Errors
    ///
    /// Same as [`Tracker::create_map`].
    pub fn create_list(
        &mut self,
        initial: impl IntoIterator<Item = Value>,
        options: ItemOptions,
    ) -> Result<ItemId> {
        let entries = initial
            .into_iter()
            .enumerate()
            .map(|(index, value)| (Location::Index(index), value))
            .collect();
        self.construct(ContainerKind::List, entries, options)
    }

    /// Create a tracked-attributes container holding `initial` fields
    ///
    /// Initial fields are stored as given and are not monitored; see
    /// [`crate::attr_ops::monitor`].
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if `options.parent` names a missing item.
    pub fn create_attributes(
        &mut self,
        initial: impl IntoIterator<Item = (String, Value)>,
        options: ItemOptions,
    ) -> Result<ItemId> {
        let id = self.construct(ContainerKind::Attributes, Vec::new(), options)?;
        if let Content::Attributes(attributes) = &mut self.item_mut(&id)?.content {
            for (name, value) in initial {
                attributes.insert(name, value);
            }
        }
        Ok(id)
    }

    /// Create a map from a JSON object or a list from a JSON array
    ///
    /// # Errors
    ///
    /// * `Serialization` - `value` is neither an object nor an array
    /// * anything [`Tracker::create_map`] returns
    pub fn create_from_json(
        &mut self,
        value: serde_json::Value,
        options: ItemOptions,
    ) -> Result<ItemId> {
        match value {
            serde_json::Value::Object(map) => self.create_map(
                map.into_iter().map(|(key, value)| (key, Value::Plain(value))),
                options,
            ),
            serde_json::Value::Array(list) => {
                self.create_list(list.into_iter().map(Value::Plain), options)
            }
            other => Err(TrackingError::Serialization {
                message: format!("expected a JSON object or array, got {}", other),
            }),
        }
    }

    fn construct(
        &mut self,
        kind: ContainerKind,
        entries: Vec<(Location, Value)>,
        options: ItemOptions,
    ) -> Result<ItemId> {
        if let Some((parent_id, _)) = &options.parent {
            self.item(parent_id)?;
        }

        let item = TrackableItem::new(kind, &options);
        let id = item.id.clone();
        self.items.insert(id.clone(), item);
        tracing::debug!(item_id = %id, kind = %kind, "item created");
        self.emit(&id, Action::Init, Extra::new().text(EXTRA_METHOD, "init"))?;

        let incoming: Vec<(Location, &Value)> = entries
            .iter()
            .map(|(location, value)| (location.clone(), value))
            .collect();
        if let Err(err) = convert::validate_incoming(self, &id, &incoming) {
            self.items.remove(&id);
            return Err(err);
        }

        for (location, value) in entries {
            let stored = convert::convert(self, &id, &location, value)?;
            match (&mut self.item_mut(&id)?.content, location) {
                (Content::Map(map), Location::Key(key)) => {
                    map.insert(key, stored);
                }
                (Content::List(list), Location::Index(_)) => list.push(stored),
                _ => {}
            }
        }

        if let Some((parent_id, location)) = options.parent {
            self.register_child(&parent_id, &id, location)?;
        }
        Ok(id)
    }

    // ===== Lookup =====

    /// Get an item by ID
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if no live item has this id.
    pub fn item(&self, id: &ItemId) -> Result<&TrackableItem> {
        self.items.get(id).ok_or_else(|| TrackingError::ItemNotFound {
            item_id: id.to_string(),
        })
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Result<&mut TrackableItem> {
        self.items
            .get_mut(id)
            .ok_or_else(|| TrackingError::ItemNotFound {
                item_id: id.to_string(),
            })
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of live items in the arena
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// History oldest-first, optionally only the last `most_recent` entries
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn tracking_changes(
        &self,
        id: &ItemId,
        most_recent: Option<usize>,
    ) -> Result<&[ChangeLogEntry]> {
        Ok(self.item(id)?.tracking_changes(most_recent))
    }

    // ===== Lock =====

    /// Lock an item against structural mutation; children are unaffected
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn lock(&mut self, id: &ItemId) -> Result<()> {
        self.item_mut(id)?.locked = true;
        self.emit(id, Action::Lock, Extra::new().text(EXTRA_METHOD, "lock"))?;
        Ok(())
    }

    /// Unlock an item
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn unlock(&mut self, id: &ItemId) -> Result<()> {
        self.item_mut(id)?.locked = false;
        self.emit(id, Action::Unlock, Extra::new().text(EXTRA_METHOD, "unlock"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn is_locked(&self, id: &ItemId) -> Result<bool> {
        Ok(self.item(id)?.locked)
    }

    // ===== Child registry =====

    /// Register `child_id` as a child of `parent_id` at `location`
    ///
    /// Also subscribes the parent to the child's entries. Registering an item
    /// again at the same place is a no-op.
    ///
    /// # Errors
    ///
    /// * `ItemNotFound` - either item does not exist
    /// * `AlreadyOwned` - the child is registered elsewhere; detach it first
    /// * `CycleDetected` - the child is the parent or one of its ancestors
    pub fn register_child(
        &mut self,
        parent_id: &ItemId,
        child_id: &ItemId,
        location: impl Into<Location>,
    ) -> Result<()> {
        let location = location.into();
        self.check_adoption(parent_id, child_id, &location)?;
        self.link(parent_id, child_id, location);
        Ok(())
    }

    /// Remove `child_id` from `parent_id`'s registry and drop the subscription
    ///
    /// Returns whether the child was registered.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the parent does not exist.
    pub fn deregister_child(&mut self, parent_id: &ItemId, child_id: &ItemId) -> Result<bool> {
        let removed = self
            .item_mut(parent_id)?
            .children
            .remove(child_id)
            .is_some();
        if let Some(child) = self.items.get_mut(child_id) {
            if child
                .parent
                .as_ref()
                .is_some_and(|link| &link.parent_id == parent_id)
            {
                child.parent = None;
            }
            child.observers.unsubscribe_parent(parent_id);
        }
        if removed {
            tracing::trace!(parent_id = %parent_id, child_id = %child_id, "child deregistered");
        }
        Ok(removed)
    }

    pub(crate) fn check_adoption(
        &self,
        parent_id: &ItemId,
        child_id: &ItemId,
        location: &Location,
    ) -> Result<()> {
        self.item(parent_id)?;
        let child = self.item(child_id)?;

        if let Some(link) = &child.parent {
            if &link.parent_id != parent_id || &link.location != location {
                return Err(TrackingError::AlreadyOwned {
                    item_id: child_id.to_string(),
                    owner_id: link.parent_id.to_string(),
                });
            }
        }

        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if current == child_id {
                return Err(TrackingError::CycleDetected {
                    item_id: child_id.to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
            cursor = self
                .items
                .get(current)
                .and_then(|item| item.parent.as_ref())
                .map(|link| &link.parent_id);
        }
        Ok(())
    }

    pub(crate) fn link(&mut self, parent_id: &ItemId, child_id: &ItemId, location: Location) {
        if let Some(parent) = self.items.get_mut(parent_id) {
            parent.children.insert(
                child_id.clone(),
                ChildLink {
                    location: location.clone(),
                },
            );
        }
        if let Some(child) = self.items.get_mut(child_id) {
            child.parent = Some(ParentLink {
                parent_id: parent_id.clone(),
                location,
            });
            child.observers.subscribe_parent(parent_id.clone());
        }
        tracing::trace!(parent_id = %parent_id, child_id = %child_id, "child registered");
    }

    /// Move an already-registered child to a new location under the same parent
    pub(crate) fn relocate_child(&mut self, parent_id: &ItemId, child_id: &ItemId, location: Location) {
        if let Some(link) = self
            .items
            .get_mut(parent_id)
            .and_then(|parent| parent.children.get_mut(child_id))
        {
            link.location = location.clone();
        }
        if let Some(link) = self
            .items
            .get_mut(child_id)
            .and_then(|child| child.parent.as_mut())
        {
            if &link.parent_id == parent_id {
                link.location = location;
            }
        }
    }

    // ===== Observers =====

    /// Register a sink on an item; returns false if it was already registered
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn add_sink(&mut self, id: &ItemId, sink: Arc<dyn Sink>) -> Result<bool> {
        Ok(self.item_mut(id)?.observers.add_sink(sink))
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn remove_sink(&mut self, id: &ItemId, sink: &Arc<dyn Sink>) -> Result<bool> {
        Ok(self.item_mut(id)?.observers.remove_sink(sink))
    }

    /// Sink failures recorded since the last call, oldest first
    ///
    /// Only the newest `sink_failure_capacity` failures are kept between calls.
    pub fn take_sink_failures(&mut self) -> Vec<TrackingError> {
        std::mem::take(&mut self.sink_failures)
    }

    pub fn sink_failures(&self) -> &[TrackingError] {
        &self.sink_failures
    }

    /// Build an entry for `subject` and deliver it
    pub(crate) fn emit(&mut self, subject: &ItemId, action: Action, extra: Extra) -> Result<EntryId> {
        let item = self.item(subject)?;
        let extra = extra
            .text(EXTRA_TYPE, item.kind.type_name())
            .text(EXTRA_LOCKED, item.locked.to_string());
        let entry = ChangeLogEntry::new(subject.clone(), action, self.resolver.resolve(), extra);
        let entry_id = entry.id().clone();
        self.notify(subject, entry);
        Ok(entry_id)
    }

    /// Deliver an entry to `target` and climb the ownership tree
    ///
    /// At each item: an entry about a registered child is re-homed onto a
    /// copy (subject, `extra.type`, location and tree rewritten), the entry is
    /// appended to the item's history unless already present, then each
    /// observer runs in registration order. A parent subscription continues
    /// the walk depth-first at its position, so a sink registered after the
    /// item was attached runs after every ancestor. An entry about an item
    /// that is not a registered child ends that branch.
    pub fn notify(&mut self, target: &ItemId, entry: ChangeLogEntry) {
        let mut pending = vec![Delivery::Item(target.clone(), entry)];

        while let Some(step) = pending.pop() {
            match step {
                Delivery::Sink(sink, entry) => {
                    if let Err(err) = sink.accept(&entry) {
                        self.report_sink_failure(sink.name(), &entry, err);
                    }
                }
                Delivery::Item(item_id, incoming) => {
                    let Some(entry) = self.rehome(&item_id, incoming) else {
                        continue;
                    };
                    let Some(item) = self.items.get_mut(&item_id) else {
                        continue;
                    };
                    item.record(entry.clone());
                    let steps: Vec<Delivery> = item
                        .observers
                        .iter()
                        .map(|observer| match observer {
                            Observer::Sink(sink) => Delivery::Sink(sink.clone(), entry.clone()),
                            Observer::Parent(parent_id) => {
                                Delivery::Item(parent_id.clone(), entry.clone())
                            }
                        })
                        .collect();
                    pending.extend(steps.into_iter().rev());
                }
            }
        }
    }

    /// The entry as `item_id` records it, or `None` if the hop is skipped
    ///
    /// Locations are joined with the delimiter of the child the entry came
    /// from.
    fn rehome(&self, item_id: &ItemId, incoming: ChangeLogEntry) -> Option<ChangeLogEntry> {
        let Some(item) = self.items.get(item_id) else {
            tracing::trace!(item_id = %item_id, "propagation reached a missing item");
            return None;
        };
        if incoming.subject_id() == item_id {
            return Some(incoming);
        }

        let Some(link) = item.children.get(incoming.subject_id()) else {
            tracing::trace!(
                item_id = %item_id,
                child_id = %incoming.subject_id(),
                "entry from unregistered child; hop skipped"
            );
            return None;
        };
        let delimiter = self
            .items
            .get(incoming.subject_id())
            .map_or(item.delimiter.as_str(), |child| child.delimiter.as_str());
        let location = match incoming.location() {
            Some(previous) => format!("{}{}{}", link.location, delimiter, previous),
            None => link.location.to_string(),
        };

        let mut rehomed = incoming.copy(item.kind, item_id.clone());
        rehomed.set_location(location);
        rehomed.add_to_tree(item_id.clone());
        tracing::trace!(
            item_id = %item_id,
            entry_id = %rehomed.id(),
            depth = rehomed.tree().len(),
            "entry rebroadcast"
        );
        Some(rehomed)
    }

    fn report_sink_failure(&mut self, sink: &str, entry: &ChangeLogEntry, err: SinkError) {
        tracing::warn!(
            sink = sink,
            entry_id = %entry.id(),
            error = %err,
            "sink failed; delivery continues"
        );
        self.sink_failures.push(TrackingError::SinkFailure {
            sink: sink.to_string(),
            entry_id: entry.id().to_string(),
            message: err.to_string(),
        });
        let excess = self
            .sink_failures
            .len()
            .saturating_sub(self.config.sink_failure_capacity);
        self.sink_failures.drain(..excess);
    }

    // ===== Rendering =====

    /// Deep, untracked rendering of an item's content
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item, or a tracked value inside it, is missing.
    pub fn to_plain(&self, id: &ItemId) -> Result<serde_json::Value> {
        match &self.item(id)?.content {
            Content::Map(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), self.plain_value(value)?);
                }
                Ok(serde_json::Value::Object(out))
            }
            Content::List(list) => list
                .iter()
                .map(|value| self.plain_value(value))
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
            Content::Attributes(attributes) => {
                let mut out = serde_json::Map::new();
                for (name, value) in attributes.values() {
                    out.insert(name.clone(), self.plain_value(value)?);
                }
                Ok(serde_json::Value::Object(out))
            }
        }
    }

    /// Deep, untracked rendering of a stored value
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if a tracked value refers to a missing item.
    pub fn plain_value(&self, value: &Value) -> Result<serde_json::Value> {
        match value {
            Value::Plain(json) => Ok(json.clone()),
            Value::Tracked(id) => self.to_plain(id),
        }
    }

    /// Compact JSON rendering of an item's content
    ///
    /// # Errors
    ///
    /// Same as [`Tracker::to_plain`].
    pub fn render(&self, id: &ItemId) -> Result<String> {
        Ok(self.to_plain(id)?.to_string())
    }

    /// Snapshot for entry fields; a dangling handle renders as its id
    pub(crate) fn snapshot_value(&self, value: &Value) -> serde_json::Value {
        self.plain_value(value).unwrap_or_else(|_| match value {
            Value::Tracked(id) => serde_json::Value::String(id.to_string()),
            Value::Plain(json) => json.clone(),
        })
    }

    /// Diagnostic listing of the live child registry beneath an item
    ///
    /// Textual only; the format is not a stable contract.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item does not exist.
    pub fn known_items_tree(&self, id: &ItemId) -> Result<Vec<String>> {
        let root = self.item(id)?;
        let mut lines = vec![format!("{}:{}", root.kind, root.id)];
        let mut stack: Vec<(ItemId, Location, usize)> = Vec::new();
        self.push_children(root, 1, &mut stack);

        while let Some((child_id, location, depth)) = stack.pop() {
            let Some(child) = self.items.get(&child_id) else {
                continue;
            };
            let location = match location {
                Location::Key(key) => format!("'{}'", key),
                Location::Index(index) => index.to_string(),
            };
            lines.push(format!(
                "{}|-> Location: [{}] Item: {}:{}",
                "    ".repeat(depth - 1),
                location,
                child.kind,
                child.id
            ));
            self.push_children(child, depth + 1, &mut stack);
        }
        Ok(lines)
    }

    fn push_children(
        &self,
        item: &TrackableItem,
        depth: usize,
        stack: &mut Vec<(ItemId, Location, usize)>,
    ) {
        let mut children: Vec<_> = item
            .children
            .iter()
            .map(|(id, link)| (id.clone(), link.location.clone(), depth))
            .collect();
        children.sort_by(|a, b| b.1.cmp(&a.1));
        stack.extend(children);
    }

    // ===== Lifecycle =====

    /// Drop a detached item and its whole subtree from the arena
    ///
    /// Returns the number of items removed.
    ///
    /// # Errors
    ///
    /// * `ItemNotFound` - the item does not exist
    /// * `ItemStillAttached` - the item is still registered under a parent
    pub fn discard(&mut self, id: &ItemId) -> Result<usize> {
        if let Some(link) = &self.item(id)?.parent {
            return Err(TrackingError::ItemStillAttached {
                item_id: id.to_string(),
                parent_id: link.parent_id.to_string(),
            });
        }

        let mut stack = vec![id.clone()];
        let mut removed = 0;
        while let Some(current) = stack.pop() {
            if let Some(item) = self.items.remove(&current) {
                removed += 1;
                stack.extend(item.children.into_keys());
            }
        }
        tracing::debug!(item_id = %id, removed, "subtree discarded");
        Ok(removed)
    }
}

pub(crate) fn wrong_kind(id: &ItemId, expected: ContainerKind, actual: ContainerKind) -> TrackingError {
    TrackingError::WrongContainerKind {
        item_id: id.to_string(),
        expected: expected.type_name().to_string(),
        actual: actual.type_name().to_string(),
    }
}
