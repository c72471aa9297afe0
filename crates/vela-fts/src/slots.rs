//! Active/shadow slot management for zero-downtime rebuilds.
//!
//! Every logical alias is backed by two physical indexes, `<alias>-a` and
//! `<alias>-b`. Readers always use the active slot. A rebuild writes into the
//! shadow slot and, on completion, the slots swap:
//!
//! ```text
//! Idle(active) --start--> Rebuilding(active) --complete--> Idle(other)
//!                                           \--cancel----> Idle(active)
//! ```
//!
//! The active slot of an alias seen for the first time is the physical index
//! holding more documents (ties pick `a`).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::store::IndexStore;

/// One of the two physical indexes behind an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// `<alias>-a`
    A,
    /// `<alias>-b`
    B,
}

impl Slot {
    /// The opposite slot.
    pub fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    /// Suffix used in physical index names.
    pub fn suffix(self) -> &'static str {
        match self {
            Slot::A => "a",
            Slot::B => "b",
        }
    }

    /// Physical index name of this slot for `alias`.
    pub fn physical_name(self, alias: &str) -> String {
        format!("{alias}-{}", self.suffix())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Slot state of one alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    /// Slot serving reads.
    pub active_slot: Slot,
    /// Whether a rebuild is writing into the shadow slot.
    pub rebuilding: bool,
}

/// Tracks which physical index backs each alias.
pub struct ActiveIndexManager {
    store: Arc<dyn IndexStore>,
    states: RwLock<HashMap<String, Arc<Mutex<SlotState>>>>,
}

impl ActiveIndexManager {
    /// Create a manager over `store`.
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// The physical store the slots live in.
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Physical name of the slot serving reads.
    pub fn resolve_active_index_name(&self, alias: &str) -> String {
        self.with_state(alias, |state| state.active_slot.physical_name(alias))
    }

    /// Physical name of the slot not serving reads.
    pub fn resolve_shadow_index_name(&self, alias: &str) -> String {
        self.with_state(alias, |state| {
            state.active_slot.other().physical_name(alias)
        })
    }

    /// Physical name writes go to: the shadow while rebuilding, the active
    /// slot otherwise.
    pub fn resolve_write_index_name(&self, alias: &str) -> String {
        self.with_state(alias, |state| {
            let slot = if state.rebuilding {
                state.active_slot.other()
            } else {
                state.active_slot
            };
            slot.physical_name(alias)
        })
    }

    /// Whether a rebuild of `alias` is in progress.
    pub fn is_rebuilding(&self, alias: &str) -> bool {
        self.with_state(alias, |state| state.rebuilding)
    }

    /// Current slot state of `alias`.
    pub fn state(&self, alias: &str) -> SlotState {
        self.with_state(alias, |state| *state)
    }

    /// Begin writing into the shadow slot.
    ///
    /// Returns `false` without changing anything when a rebuild is already in
    /// progress.
    pub fn start_rebuilding(&self, alias: &str) -> bool {
        self.with_state_mut(alias, |state| {
            if state.rebuilding {
                log::warn!("Rebuild of '{alias}' already in progress");
                return false;
            }
            state.rebuilding = true;
            log::info!(
                "Rebuilding '{alias}' into {}",
                state.active_slot.other().physical_name(alias)
            );
            true
        })
    }

    /// Promote the shadow slot to active and end the rebuild.
    ///
    /// Does nothing when no rebuild is in progress.
    pub fn complete_rebuilding(&self, alias: &str) {
        self.with_state_mut(alias, |state| {
            if !state.rebuilding {
                log::warn!("complete_rebuilding called for idle alias '{alias}'");
                return;
            }
            state.active_slot = state.active_slot.other();
            state.rebuilding = false;
            log::info!(
                "Swapped '{alias}' to {}",
                state.active_slot.physical_name(alias)
            );
        })
    }

    /// End the rebuild and keep the current active slot.
    pub fn cancel_rebuilding(&self, alias: &str) {
        self.with_state_mut(alias, |state| {
            if state.rebuilding {
                state.rebuilding = false;
                log::info!(
                    "Cancelled rebuild of '{alias}', keeping {}",
                    state.active_slot.physical_name(alias)
                );
            }
        })
    }

    fn with_state<R>(&self, alias: &str, read: impl FnOnce(&SlotState) -> R) -> R {
        let entry = self.entry(alias);
        let state = entry.lock().unwrap_or_else(PoisonError::into_inner);
        read(&state)
    }

    fn with_state_mut<R>(&self, alias: &str, update: impl FnOnce(&mut SlotState) -> R) -> R {
        let entry = self.entry(alias);
        let mut state = entry.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut state)
    }

    fn entry(&self, alias: &str) -> Arc<Mutex<SlotState>> {
        if let Some(entry) = self
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
        {
            return Arc::clone(entry);
        }

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            states
                .entry(alias.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(self.initial_state(alias)))),
        )
    }

    fn initial_state(&self, alias: &str) -> SlotState {
        let count = |slot: Slot| {
            let name = slot.physical_name(alias);
            self.store.document_count(&name).unwrap_or_else(|e| {
                log::warn!("Failed to count documents in {name}: {e}");
                0
            })
        };
        let active_slot = if count(Slot::B) > count(Slot::A) {
            Slot::B
        } else {
            Slot::A
        };
        log::debug!(
            "Initial active slot for '{alias}': {}",
            active_slot.physical_name(alias)
        );
        SlotState {
            active_slot,
            rebuilding: false,
        }
    }
}

impl fmt::Debug for ActiveIndexManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aliases = self
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ActiveIndexManager")
            .field("store", &self.store.name())
            .field("aliases", &aliases)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
