//! Canonical schema constants for structured logging and change-log entries
//!
//! These constants ensure consistency across logging, error reporting and
//! the `extra` mapping carried by every change-log entry.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_ITEM_ID: &str = "item_id";
pub const FIELD_ENTRY_ID: &str = "entry_id";
pub const FIELD_SINK: &str = "sink";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Tracing target of recorded changes, separate from operation events
pub const TARGET_CHANGES: &str = "datatrack::changes";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Change-log `extra` keys
pub const EXTRA_ACTION: &str = "action";
pub const EXTRA_TYPE: &str = "type";
pub const EXTRA_METHOD: &str = "method";
pub const EXTRA_LOCATION: &str = "location";
pub const EXTRA_VALUE: &str = "value";
pub const EXTRA_LOCKED: &str = "locked";
pub const EXTRA_DATA_PRE_CHANGE: &str = "data_pre_change";
pub const EXTRA_DATA_POST_CHANGE: &str = "data_post_change";
pub const EXTRA_REMOVED_ITEMS: &str = "removed_items";
pub const EXTRA_PASSED_INDEX: &str = "passed_index";
pub const EXTRA_DEFAULT: &str = "default";
pub const EXTRA_RETURN_VALUE: &str = "return_value";
pub const EXTRA_UNTRACKED: &str = "untracked";
pub const EXTRA_OUTCOME: &str = "outcome";
pub const EXTRA_ATTRIBUTE_NAME: &str = "attribute_name";
pub const EXTRA_ATTRIBUTE_LOCKED: &str = "attribute_locked";

// Container kind names carried in `extra.type`
pub const KIND_TRACKED_MAP: &str = "TrackedMap";
pub const KIND_TRACKED_LIST: &str = "TrackedList";
pub const KIND_TRACKED_ATTRIBUTES: &str = "TrackedAttributes";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EXTRA_ACTION.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_snapshot_keys_are_distinct() {
        assert_ne!(EXTRA_DATA_PRE_CHANGE, EXTRA_DATA_POST_CHANGE);
        assert_ne!(KIND_TRACKED_MAP, KIND_TRACKED_LIST);
        assert_ne!(KIND_TRACKED_LIST, KIND_TRACKED_ATTRIBUTES);
    }
}
