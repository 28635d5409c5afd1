// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The handle table: an append-only slot vector mapping
//! [`InspectorHandle`] to a live inspector, plus the lifecycle transitions
//! allowed on it.
//!
//! Grounded on the slot-table/locking shape of a condition-variable-backed
//! wait set: a `Mutex<Vec<Option<_>>>` grown with `resize_with`, entries
//! nulled rather than physically removed so outstanding handles never dangle.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::inspector::{AtomicInspectorState, Inspector, InspectorHandle, LifecycleState};

/// One handle-table slot: the lifecycle state (read by both the analyzer
/// and worker threads) plus the inspector itself, guarded by its own
/// mutex so a worker callback's exclusive hold on the DSP state and an
/// analyzer thread's `GET_INFO`/`GET_PARAMS`/`PARAMS` never race.
pub struct InspectorSlot {
    pub state: AtomicInspectorState,
    pub inspector: Mutex<Inspector>,
}

impl InspectorSlot {
    fn new(inspector: Inspector) -> Self {
        Self {
            state: AtomicInspectorState::new(LifecycleState::Running),
            inspector: Mutex::new(inspector),
        }
    }
}

/// Append-only handle table. Destroyed handles are nulled, not reused —
/// reclaiming `HALTED` slots is left undone (see `DESIGN.md`).
pub struct Registry {
    slots: Mutex<Vec<Option<Arc<InspectorSlot>>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Register a freshly constructed inspector, transitioning it straight
    /// to `RUNNING` (there is no separate externally-visible `CREATED`
    /// slot; construction and registration happen back to back under the
    /// analyzer thread's exclusive ownership of the table).
    ///
    /// Returns the new handle. If the caller subsequently fails to push a
    /// worker task for this handle, it must call
    /// [`Registry::rollback`] to null the slot, mirroring the
    /// register-then-unwind-on-push-failure sequence the analyzer performs
    /// for `OPEN`.
    pub fn register(&self, inspector: Inspector) -> (InspectorHandle, Arc<InspectorSlot>) {
        let slot = Arc::new(InspectorSlot::new(inspector));
        let mut slots = self.slots.lock();
        slots.push(Some(Arc::clone(&slot)));
        let handle = InspectorHandle((slots.len() - 1) as u32);
        (handle, slot)
    }

    /// Null a slot without checking its state. Used to unwind a
    /// [`Registry::register`] whose worker-task push subsequently failed.
    pub fn rollback(&self, handle: InspectorHandle) {
        self.dispose_handle(handle);
    }

    /// Returns the inspector iff the handle is in range, the slot is
    /// non-null, and the inspector is `RUNNING`. No other state is ever
    /// visible through this path.
    pub fn lookup(&self, handle: InspectorHandle) -> Option<Arc<InspectorSlot>> {
        let slots = self.slots.lock();
        let slot = slots.get(handle.0 as usize)?.as_ref()?;
        if slot.state.load() == LifecycleState::Running {
            Some(Arc::clone(slot))
        } else {
            None
        }
    }

    /// Returns the slot regardless of lifecycle state. Only `CLOSE` is
    /// authorized to bypass the `RUNNING`-only visibility of
    /// [`Registry::lookup`] — it needs to observe `HALTED` to destroy
    /// immediately.
    pub fn lookup_raw(&self, handle: InspectorHandle) -> Option<Arc<InspectorSlot>> {
        let slots = self.slots.lock();
        slots.get(handle.0 as usize)?.clone()
    }

    /// Null the slot. Idempotent: returns `false` if the slot was already
    /// null or out of range.
    pub fn dispose_handle(&self, handle: InspectorHandle) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(handle.0 as usize) {
            Some(entry @ Some(_)) => {
                *entry = None;
                true
            }
            _ => false,
        }
    }

    /// Implements the `CLOSE` transition described in the analyzer message
    /// handler: if the inspector is already `HALTED`, dispose and drop it
    /// immediately; if it is `RUNNING`, mark it `HALTING` so the worker's
    /// next callback detaches it; if it is already `HALTING`, this is a
    /// second `CLOSE` racing the first and is rejected with
    /// `Error::AlreadyClosing` rather than re-reported as success. Returns
    /// `Err(Error::InvalidHandle)` if the handle names no slot at all. Both
    /// error variants map to the wire-level `WrongHandle` response — see
    /// `crate::analyzer`.
    pub fn close(&self, handle: InspectorHandle) -> Result<u32> {
        let slot = self.lookup_raw(handle).ok_or(Error::InvalidHandle)?;
        let inspector_id = slot.inspector.lock().params().inspector_id;

        match slot.state.load() {
            LifecycleState::Halted => {
                self.dispose_handle(handle);
                Ok(inspector_id)
            }
            LifecycleState::Halting => Err(Error::AlreadyClosing),
            LifecycleState::Created | LifecycleState::Running => {
                slot.state.store(LifecycleState::Halting);
                Ok(inspector_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::RfChannel;

    fn channel() -> RfChannel {
        RfChannel {
            f_lo: -2500.0,
            f_hi: 2500.0,
            bw: 5000.0,
            fc: 0.0,
            noise_floor: -90.0,
        }
    }

    #[test]
    fn register_then_lookup_succeeds() {
        let reg = Registry::new();
        let insp = Inspector::new(250_000.0, channel()).unwrap();
        let (handle, _slot) = reg.register(insp);
        assert!(reg.lookup(handle).is_some());
    }

    #[test]
    fn close_on_halted_disposes_immediately() {
        let reg = Registry::new();
        let insp = Inspector::new(250_000.0, channel()).unwrap();
        let (handle, slot) = reg.register(insp);
        slot.state.store(LifecycleState::Halted);

        reg.close(handle).unwrap();
        assert!(reg.lookup_raw(handle).is_none());
    }

    #[test]
    fn close_on_running_transitions_to_halting() {
        let reg = Registry::new();
        let insp = Inspector::new(250_000.0, channel()).unwrap();
        let (handle, slot) = reg.register(insp);

        reg.close(handle).unwrap();
        assert_eq!(slot.state.load(), LifecycleState::Halting);
        // HALTING is invisible to lookup, matching S6/close-during-run.
        assert!(reg.lookup(handle).is_none());
    }

    #[test]
    fn dispose_handle_is_idempotent() {
        let reg = Registry::new();
        let insp = Inspector::new(250_000.0, channel()).unwrap();
        let (handle, _slot) = reg.register(insp);
        assert!(reg.dispose_handle(handle));
        assert!(!reg.dispose_handle(handle));
    }

    #[test]
    fn close_on_halting_is_already_closing() {
        let reg = Registry::new();
        let insp = Inspector::new(250_000.0, channel()).unwrap();
        let (handle, slot) = reg.register(insp);
        slot.state.store(LifecycleState::Halting);

        assert!(matches!(reg.close(handle), Err(Error::AlreadyClosing)));
    }

    #[test]
    fn close_on_unknown_handle_is_invalid() {
        let reg = Registry::new();
        assert!(matches!(
            reg.close(InspectorHandle(42)),
            Err(Error::InvalidHandle)
        ));
    }
}
