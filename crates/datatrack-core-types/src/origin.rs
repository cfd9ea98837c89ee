//! Origin descriptors and the scoped origin context
//!
//! Callers attribute mutations explicitly: an [`OriginScope`] pushes an
//! [`Origin`] onto a thread-local stack for as long as the guard lives, and the
//! engine's resolver reads the stack when it builds a change-log entry.
//!
//! ```
//! use datatrack_core_types::{current_origins, with_origin, Origin};
//!
//! with_origin(Origin::new("importer"), || {
//!     assert_eq!(current_origins().last().unwrap().name, "importer");
//! });
//! assert!(current_origins().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::marker::PhantomData;

/// Who (or what) performed a mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Short actor name, matched against resolver ignore-lists
    pub name: String,
    /// Optional free-form detail such as a call site or request id
    pub detail: Option<String>,
}

impl Origin {
    /// Create an origin with no detail
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
        }
    }

    /// Attach detail to the origin
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.name, detail),
            None => write!(f, "{}", self.name),
        }
    }
}

thread_local! {
    static ORIGIN_STACK: RefCell<Vec<Origin>> = const { RefCell::new(Vec::new()) };
}

/// Guard that keeps an origin active until dropped
///
/// Scopes nest; the innermost live scope is the last element of
/// [`current_origins`]. The guard is `!Send` because the stack is per-thread.
#[must_use = "the origin is only active while the scope guard is alive"]
pub struct OriginScope {
    _not_send: PhantomData<*const ()>,
}

impl OriginScope {
    /// Push `origin` onto the current thread's origin stack
    pub fn enter(origin: Origin) -> Self {
        ORIGIN_STACK.with(|stack| stack.borrow_mut().push(origin));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for OriginScope {
    fn drop(&mut self) {
        ORIGIN_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `origin` active
pub fn with_origin<T>(origin: Origin, f: impl FnOnce() -> T) -> T {
    let _scope = OriginScope::enter(origin);
    f()
}

/// Snapshot of the active origins, outermost first
pub fn current_origins() -> Vec<Origin> {
    ORIGIN_STACK.with(|stack| stack.borrow().clone())
}
