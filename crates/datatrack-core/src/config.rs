//! Tracker configuration and per-container construction options

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackingError};
use crate::model::Location;
use datatrack_core_types::ItemId;

/// Delimiter tracked-attributes containers join locations with
pub const ATTRIBUTE_DELIMITER: &str = ".";

/// Engine-wide defaults
///
/// Every field is optional in TOML; missing fields take the defaults below.
///
/// ```
/// use datatrack_core::TrackerConfig;
///
/// let config = TrackerConfig::from_toml_str(r#"
///     delimiter = "/"
///     ignored_origins = ["db-sync"]
/// "#).unwrap();
/// assert_eq!(config.delimiter, "/");
/// assert!(config.capture_snapshots);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Separator used when joining propagated locations
    pub delimiter: String,
    /// Wrap nested maps/arrays as tracked children on write
    pub auto_convert: bool,
    /// Render full pre/post content into every entry
    pub capture_snapshots: bool,
    /// Origin names the resolver skips when attributing a mutation
    pub ignored_origins: Vec<String>,
    /// Emit an entry for calls that were refused (locked, missing key, ...)
    pub log_refused_mutations: bool,
    /// Most recent sink failures kept by the tracker; older ones are dropped
    pub sink_failure_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            delimiter: ":".to_string(),
            auto_convert: false,
            capture_snapshots: true,
            ignored_origins: Vec::new(),
            log_refused_mutations: true,
            sink_failure_capacity: 256,
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Config` if the document is malformed, has unknown keys, or
    /// sets an empty delimiter.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `Config` if the delimiter is empty.
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(TrackingError::Config {
                message: "delimiter cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Options for constructing one trackable container
///
/// Usually obtained from [`crate::Tracker::options`] so the tracker's config
/// supplies the defaults, then adjusted with the builder methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOptions {
    pub auto_convert: bool,
    pub delimiter: String,
    pub capture_snapshots: bool,
    /// Manual nesting: owning item and the location to register under
    pub parent: Option<(ItemId, Location)>,
}

impl ItemOptions {
    /// Options seeded from a config
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            auto_convert: config.auto_convert,
            delimiter: config.delimiter.clone(),
            capture_snapshots: config.capture_snapshots,
            parent: None,
        }
    }

    pub fn auto_convert(mut self, enabled: bool) -> Self {
        self.auto_convert = enabled;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn capture_snapshots(mut self, enabled: bool) -> Self {
        self.capture_snapshots = enabled;
        self
    }

    /// Register the new item as a child of `parent` at `location`
    pub fn parent(mut self, parent: ItemId, location: impl Into<Location>) -> Self {
        self.parent = Some((parent, location.into()));
        self
    }
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}
