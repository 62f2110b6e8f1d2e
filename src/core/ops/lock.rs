//! core::ops::lock
//!
//! Advisory per-store lock table.
//!
//! # Architecture
//!
//! Each store has at most one holder, identified by a [`SessionId`]. The
//! table only records who holds what: `lock` and `unlock` are
//! unconditional and nothing blocks. Callers that serialize access check
//! the holder themselves.
//!
//! The table is a plain value owned by its datastore; there is no global
//! lock state.
//!
//! # Invariants
//!
//! - A store is free when its holder is [`SessionId::NONE`]
//! - `unlock_all` releases exactly the stores held by the given session
//!
//! # Example
//!
//! ```
//! use xmldb::core::ops::lock::LockTable;
//! use xmldb::core::types::{SessionId, StoreName};
//!
//! let mut locks = LockTable::new();
//! locks.lock(&StoreName::candidate(), SessionId::new(7));
//! assert_eq!(locks.is_locked(&StoreName::candidate()), SessionId::new(7));
//!
//! locks.unlock_all(SessionId::new(7));
//! assert!(locks.is_locked(&StoreName::candidate()).is_none());
//! ```

use std::collections::BTreeMap;

use crate::core::types::{SessionId, StoreName};

/// Holder per store.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    holders: BTreeMap<StoreName, SessionId>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `session` as the holder of `store`, replacing any holder.
    pub fn lock(&mut self, store: &StoreName, session: SessionId) {
        if session.is_none() {
            self.holders.remove(store);
        } else {
            self.holders.insert(store.clone(), session);
        }
    }

    /// Clear the holder of `store`.
    pub fn unlock(&mut self, store: &StoreName) {
        self.holders.remove(store);
    }

    /// Release every store held by `session`.
    ///
    /// Returns the stores that were released.
    pub fn unlock_all(&mut self, session: SessionId) -> Vec<StoreName> {
        let released: Vec<StoreName> = self
            .holders
            .iter()
            .filter(|(_, holder)| **holder == session)
            .map(|(store, _)| store.clone())
            .collect();
        for store in &released {
            self.holders.remove(store);
        }
        released
    }

    /// Holder of `store`, or [`SessionId::NONE`] if it is free.
    pub fn is_locked(&self, store: &StoreName) -> SessionId {
        self.holders.get(store).copied().unwrap_or(SessionId::NONE)
    }

    /// Locked stores and their holders, ordered by store name.
    pub fn held(&self) -> impl Iterator<Item = (&StoreName, SessionId)> {
        self.holders.iter().map(|(s, h)| (s, *h))
    }
}
