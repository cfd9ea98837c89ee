//! Operation boundary macros
//!
//! Every intercepted container call is bracketed by one start event and one
//! end or end_error event. The `item = <id>` form records the container id
//! as `item_id`; any further `key = value` pairs are passed to tracing as is.
//! Start and end are debug events; a refused or failed call is a warn event
//! carrying the error's stable kind and code.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use datatrack_core::log_op_start;
/// # let id = datatrack_core::ItemId::new();
/// log_op_start!("set");
/// log_op_start!("set", item = id, kind = "TrackedMap");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, item = $item:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_START,
            item_id = %$item,
            $($($field)*)?
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the end of an operation that was applied
///
/// # Example
///
/// ```
/// # use datatrack_core::log_op_end;
/// # let id = datatrack_core::ItemId::new();
/// log_op_end!("set", duration_ms = 3);
/// log_op_end!("set", duration_ms = 3, item = id, recorded = false);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, item = $item:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END,
            duration_ms = $duration,
            item_id = %$item,
            $($($field)*)?
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation that was refused or failed
///
/// `$err` is anything convertible into [`crate::errors::ExError`].
///
/// # Example
///
/// ```
/// # use datatrack_core::{log_op_error, errors::TrackingError};
/// # let id = datatrack_core::ItemId::new();
/// let err = TrackingError::ItemNotFound { item_id: id.to_string() };
/// log_op_error!("set", err.clone(), duration_ms = 1);
/// log_op_error!("set", err, duration_ms = 1, item = id);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, item = $item:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            item_id = %$item,
            $($($field)*)?
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = datatrack_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            $($field)*
        );
    }};
}
