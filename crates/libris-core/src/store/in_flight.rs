// ── Per-target in-flight table ──
//
// One entry per running action, keyed by (action kind, target). A second
// attempt on a busy key is refused; the entry is removed when the guard
// drops, whatever the outcome of the request.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::action::{ActionKind, Target};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub kind: ActionKind,
    pub target: Target,
}

impl ActionKey {
    pub fn new(kind: ActionKind, target: Target) -> Self {
        Self { kind, target }
    }
}

/// Table of actions currently in flight.
#[derive(Clone)]
pub struct InFlight {
    active: Arc<DashMap<ActionKey, ()>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self {
            active: Arc::new(DashMap::new()),
        }
    }

    /// Claim `key`, or `None` if it is already running.
    pub fn try_begin(&self, key: ActionKey) -> Option<InFlightGuard> {
        match self.active.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    key,
                    active: Arc::clone(&self.active),
                })
            }
        }
    }

    pub fn is_loading(&self, key: &ActionKey) -> bool {
        self.active.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its key on drop.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    key: ActionKey,
    active: Arc<DashMap<ActionKey, ()>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use libris_api::EntityId;

    use super::*;

    fn delete(id: &str) -> ActionKey {
        ActionKey::new(ActionKind::DeleteBook, Target::Book(EntityId::from(id)))
    }

    #[test]
    fn same_key_is_refused_until_released() {
        let table = InFlight::new();
        let guard = table.try_begin(delete("1"));
        assert!(guard.is_some());
        assert!(table.is_loading(&delete("1")));
        assert!(table.try_begin(delete("1")).is_none());

        drop(guard);
        assert!(!table.is_loading(&delete("1")));
        assert!(table.try_begin(delete("1")).is_some());
    }

    #[test]
    fn different_targets_run_together() {
        let table = InFlight::new();
        let a = table.try_begin(delete("1"));
        let b = table.try_begin(delete("2"));
        let c = table.try_begin(ActionKey::new(
            ActionKind::BorrowBook,
            Target::Book(EntityId::from("1")),
        ));
        assert!(a.is_some() && b.is_some() && c.is_some());
        assert_eq!(table.len(), 3);

        drop((a, b, c));
        assert!(table.is_empty());
    }
}
