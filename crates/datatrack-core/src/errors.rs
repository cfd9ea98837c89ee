use thiserror::Error;

/// Result type alias using TrackingError
pub type Result<T> = std::result::Result<T, TrackingError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing and structured log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Mutation gating
    ContainerLocked,

    // Access
    NotFound,
    OutOfRange,
    EmptyContainer,
    WrongContainerKind,

    // Ownership graph
    AlreadyOwned,
    CycleDetected,
    StillAttached,

    // Observers
    SinkFailure,

    // Integration/IO
    InvalidConfig,
    Io,
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ContainerLocked => "ERR_CONTAINER_LOCKED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::OutOfRange => "ERR_OUT_OF_RANGE",
            ExErrorKind::EmptyContainer => "ERR_EMPTY_CONTAINER",
            ExErrorKind::WrongContainerKind => "ERR_WRONG_CONTAINER_KIND",
            ExErrorKind::AlreadyOwned => "ERR_ALREADY_OWNED",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::StillAttached => "ERR_STILL_ATTACHED",
            ExErrorKind::SinkFailure => "ERR_SINK_FAILURE",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification kind plus optional context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    item_id: Option<String>,
    location: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            item_id: None,
            location: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add item ID context
    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    /// Add location context
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the item ID context, if any
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    /// Get the location context, if any
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(item_id) = &self.item_id {
            write!(f, " (item_id: {})", item_id)?;
        }
        if let Some(location) = &self.location {
            write!(f, " (location: {})", location)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for tracking operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    // ===== Mutation Errors =====
    /// Structural mutation attempted on a locked container
    #[error("Container {item_id} is locked: {op} refused")]
    ContainerLocked { item_id: String, op: String },

    /// Write to a locked field of a tracked-attributes container
    #[error("Attribute {attribute} of {item_id} is locked")]
    AttributeLocked { item_id: String, attribute: String },

    // ===== Access Errors =====
    /// Key absent from a tracked map
    #[error("Key not found in {item_id}: {key}")]
    KeyNotFound { item_id: String, key: String },

    /// Index outside a tracked list
    #[error("Index {index} out of range for {item_id} (len {len})")]
    IndexOutOfRange {
        item_id: String,
        index: usize,
        len: usize,
    },

    /// Operation needs at least one element
    #[error("Container {item_id} is empty")]
    EmptyContainer { item_id: String },

    /// Handle names no live item
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// Map operation invoked on a list, or the other way around
    #[error("Item {item_id} is a {actual}, expected a {expected}")]
    WrongContainerKind {
        item_id: String,
        expected: String,
        actual: String,
    },

    // ===== Ownership Errors =====
    /// Composite value already registered as a child of another container
    #[error("Item {item_id} is already owned by {owner_id}; detach it first")]
    AlreadyOwned { item_id: String, owner_id: String },

    /// Registering the item would make it its own ancestor
    #[error("Cycle detected: {item_id} is an ancestor of {parent_id}")]
    CycleDetected { item_id: String, parent_id: String },

    /// Discarding an item that still has a parent
    #[error("Item {item_id} is still attached to {parent_id}")]
    ItemStillAttached { item_id: String, parent_id: String },

    // ===== Observer Errors =====
    /// An observer callback failed while handling an entry
    #[error("Sink {sink} failed on entry {entry_id}: {message}")]
    SinkFailure {
        sink: String,
        entry_id: String,
        message: String,
    },

    // ===== Generic Errors =====
    /// Configuration could not be parsed or is invalid
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// File system error
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from TrackingError to ExError
impl From<TrackingError> for ExError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::ContainerLocked { item_id, op } => {
                ExError::new(ExErrorKind::ContainerLocked)
                    .with_item_id(item_id)
                    .with_op(op)
                    .with_message("Container is locked")
            }

            TrackingError::AttributeLocked { item_id, attribute } => {
                ExError::new(ExErrorKind::ContainerLocked)
                    .with_item_id(item_id)
                    .with_location(attribute)
                    .with_message("Attribute is locked")
            }

            TrackingError::KeyNotFound { item_id, key } => ExError::new(ExErrorKind::NotFound)
                .with_item_id(item_id)
                .with_location(key)
                .with_message("Key not found"),

            TrackingError::IndexOutOfRange {
                item_id,
                index,
                len,
            } => ExError::new(ExErrorKind::OutOfRange)
                .with_item_id(item_id)
                .with_location(index.to_string())
                .with_message(format!("Index out of range for length {}", len)),

            TrackingError::EmptyContainer { item_id } => {
                ExError::new(ExErrorKind::EmptyContainer)
                    .with_item_id(item_id)
                    .with_message("Container is empty")
            }

            TrackingError::ItemNotFound { item_id } => ExError::new(ExErrorKind::NotFound)
                .with_item_id(item_id)
                .with_message("Item not found"),

            TrackingError::WrongContainerKind {
                item_id,
                expected,
                actual,
            } => ExError::new(ExErrorKind::WrongContainerKind)
                .with_item_id(item_id)
                .with_message(format!("Expected {}, found {}", expected, actual)),

            TrackingError::AlreadyOwned { item_id, owner_id } => {
                ExError::new(ExErrorKind::AlreadyOwned)
                    .with_item_id(item_id)
                    .with_message(format!("Already owned by {}", owner_id))
            }

            TrackingError::CycleDetected { item_id, parent_id } => {
                ExError::new(ExErrorKind::CycleDetected)
                    .with_item_id(item_id)
                    .with_message(format!("Is an ancestor of {}", parent_id))
            }

            TrackingError::ItemStillAttached { item_id, parent_id } => {
                ExError::new(ExErrorKind::StillAttached)
                    .with_item_id(item_id)
                    .with_message(format!("Still attached to {}", parent_id))
            }

            TrackingError::SinkFailure {
                sink,
                entry_id,
                message,
            } => ExError::new(ExErrorKind::SinkFailure)
                .with_op(sink)
                .with_message(format!("Entry {}: {}", entry_id, message)),

            TrackingError::Config { message } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }

            TrackingError::Io { message } => ExError::new(ExErrorKind::Io).with_message(message),

            TrackingError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to TrackingError
impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from toml::de::Error to TrackingError
impl From<toml::de::Error> for TrackingError {
    fn from(err: toml::de::Error) -> Self {
        TrackingError::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TrackingError {
    fn from(err: std::io::Error) -> Self {
        TrackingError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::ContainerLocked, "ERR_CONTAINER_LOCKED"),
            (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
            (ExErrorKind::OutOfRange, "ERR_OUT_OF_RANGE"),
            (ExErrorKind::AlreadyOwned, "ERR_ALREADY_OWNED"),
            (ExErrorKind::SinkFailure, "ERR_SINK_FAILURE"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_locked_maps_to_container_locked_kind() {
        let err: ExError = TrackingError::ContainerLocked {
            item_id: "m1".to_string(),
            op: "set".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::ContainerLocked);
        assert_eq!(err.item_id(), Some("m1"));
        assert_eq!(err.op(), Some("set"));
    }

    #[test]
    fn test_attribute_lock_shares_container_locked_kind() {
        let err: ExError = TrackingError::AttributeLocked {
            item_id: "a1".to_string(),
            attribute: "port".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::ContainerLocked);
        assert_eq!(err.location(), Some("port"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let err: TrackingError = toml::from_str::<toml::Table>("= nope").unwrap_err().into();
        assert!(matches!(err, TrackingError::Config { .. }));
    }
}
