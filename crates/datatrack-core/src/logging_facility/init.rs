//! Subscriber installation
//!
//! Two streams are filtered separately: operation boundaries under
//! `datatrack_core` and recorded changes under the `datatrack::changes`
//! target written by [`crate::sinks::TracingSink`].

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use datatrack_core_types::schema::TARGET_CHANGES;

/// Output profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output; operation boundaries at debug
    Development,
    /// JSON lines; refusals, sink failures and recorded changes only
    Production,
    /// Bare registry; tests install their own capture layer
    Test,
}

impl Profile {
    /// Filter directives used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        match self {
            Profile::Development => format!("datatrack_core=debug,{}=info", TARGET_CHANGES),
            Profile::Production => format!("datatrack_core=warn,{}=info", TARGET_CHANGES),
            Profile::Test => "off".to_string(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has an effect. A subscriber installed elsewhere
/// beforehand is left in place.
///
/// # Example
///
/// ```
/// use datatrack_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_env_filter(profile.filter())
                .try_init()
                .ok();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.filter())
                .try_init()
                .ok();
        }
        Profile::Test => {
            tracing_subscriber::registry().try_init().ok();
        }
    });
}
