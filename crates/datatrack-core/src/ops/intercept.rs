use std::time::Instant;

use crate::errors::{Result, TrackingError};
use crate::model::{Action, ContainerKind, Extra};
use crate::ops::store::{wrong_kind, Tracker};
use crate::{log_op_end, log_op_error, log_op_start};
use datatrack_core_types::schema::{
    EXTRA_DATA_POST_CHANGE, EXTRA_DATA_PRE_CHANGE, EXTRA_METHOD, EXTRA_OUTCOME,
};
use datatrack_core_types::ItemId;

/// State held between the start and the end of one intercepted call
pub(crate) struct Interception {
    pub(crate) item_id: ItemId,
    method: &'static str,
    pre: Option<serde_json::Value>,
    started: Instant,
}

impl Interception {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Tracker {
    /// Open an intercepted call on `item_id`, which must be a `kind` container
    pub(crate) fn intercept(
        &mut self,
        item_id: &ItemId,
        kind: ContainerKind,
        method: &'static str,
    ) -> Result<Interception> {
        log_op_start!(method, item = item_id, kind = %kind);
        let started = Instant::now();

        let item = match self.item(item_id) {
            Ok(item) => item,
            Err(err) => {
                log_op_error!(method, err.clone(), duration_ms = 0u64, item = item_id);
                return Err(err);
            }
        };
        if item.kind != kind {
            let err = wrong_kind(item_id, kind, item.kind);
            log_op_error!(method, err.clone(), duration_ms = 0u64, item = item_id);
            return Err(err);
        }

        let pre = if item.capture_snapshots {
            Some(self.to_plain(item_id)?)
        } else {
            None
        };

        Ok(Interception {
            item_id: item_id.clone(),
            method,
            pre,
            started,
        })
    }

    /// `ContainerLocked` if the intercepted container is locked
    pub(crate) fn lock_violation(&self, icpt: &Interception) -> Option<TrackingError> {
        match self.items.get(&icpt.item_id) {
            Some(item) if item.locked => Some(TrackingError::ContainerLocked {
                item_id: icpt.item_id.to_string(),
                op: icpt.method.to_string(),
            }),
            _ => None,
        }
    }

    /// Close a call that was applied and emit its entry
    pub(crate) fn complete(&mut self, icpt: Interception, action: Action, extra: Extra) -> Result<()> {
        let extra = self.finish_extra(&icpt, extra)?;
        self.emit(&icpt.item_id, action, extra)?;
        log_op_end!(icpt.method, duration_ms = icpt.elapsed_ms(), item = icpt.item_id);
        Ok(())
    }

    /// Close a call that changed nothing recordable; no entry is emitted
    pub(crate) fn pass(&self, icpt: Interception) {
        log_op_end!(
            icpt.method,
            duration_ms = icpt.elapsed_ms(),
            item = icpt.item_id,
            recorded = false
        );
    }

    /// Close a call that was refused and return `err`
    ///
    /// The refusal is still recorded, with an `outcome` field, unless the
    /// tracker is configured not to log refused mutations.
    pub(crate) fn refuse<T>(
        &mut self,
        icpt: Interception,
        action: Action,
        extra: Extra,
        err: TrackingError,
    ) -> Result<T> {
        if self.config.log_refused_mutations {
            let mut extra = self.finish_extra(&icpt, extra)?;
            extra.insert_text(EXTRA_OUTCOME, err.to_string());
            self.emit(&icpt.item_id, action, extra)?;
        }
        log_op_error!(
            icpt.method,
            err.clone(),
            duration_ms = icpt.elapsed_ms(),
            item = icpt.item_id
        );
        Err(err)
    }

    fn finish_extra(&self, icpt: &Interception, mut extra: Extra) -> Result<Extra> {
        extra.insert_text(EXTRA_METHOD, icpt.method);
        if let Some(pre) = &icpt.pre {
            extra.insert_snapshot(EXTRA_DATA_PRE_CHANGE, pre);
            extra.insert_snapshot(EXTRA_DATA_POST_CHANGE, &self.to_plain(&icpt.item_id)?);
        }
        Ok(extra)
    }
}
