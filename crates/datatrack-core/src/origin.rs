//! Actor attribution for change-log entries
//!
//! The engine never inspects the call stack. Callers declare who is acting
//! with [`datatrack_core_types::with_origin`] (or an `OriginScope` guard) and a
//! resolver turns the active scopes into an [`Actor`] when an entry is built.

use std::collections::HashSet;

use crate::model::Actor;
use datatrack_core_types::current_origins;

/// Resolves the actor for the mutation currently being recorded
pub trait OriginResolver {
    fn resolve(&self) -> Actor;
}

/// Default resolver backed by the scoped origin stack
///
/// Picks the innermost active origin whose name is not on the ignore-list,
/// so helper layers can open their own scopes without hiding the real caller.
#[derive(Debug, Clone, Default)]
pub struct ScopedOriginResolver {
    ignored: HashSet<String>,
}

impl ScopedOriginResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ignore(&mut self, name: impl Into<String>) {
        self.ignored.insert(name.into());
    }
}

impl OriginResolver for ScopedOriginResolver {
    fn resolve(&self) -> Actor {
        current_origins()
            .into_iter()
            .rev()
            .find(|origin| !self.ignored.contains(&origin.name))
            .map(Actor::Known)
            .unwrap_or(Actor::Unknown)
    }
}
