//! In-process spent set.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{Nullifier, NullifierStore, Result, Scope};

/// Spent nullifiers held in memory, one set per scope.
///
/// A single mutex serializes inserts, which makes `insert_if_absent` atomic.
#[derive(Default)]
pub struct MemoryNullifierStore {
    scopes: Mutex<HashMap<Scope, HashSet<Nullifier>>>,
}

impl MemoryNullifierStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NullifierStore for MemoryNullifierStore {
    fn contains(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool> {
        let scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(scopes
            .get(scope)
            .is_some_and(|spent| spent.contains(nullifier)))
    }

    fn insert_if_absent(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool> {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(scopes.entry(*scope).or_default().insert(*nullifier))
    }

    fn remove(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool> {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(scopes
            .get_mut(scope)
            .is_some_and(|spent| spent.remove(nullifier)))
    }

    fn count(&self, scope: &Scope) -> Result<usize> {
        let scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(scopes.get(scope).map_or(0, HashSet::len))
    }
}
