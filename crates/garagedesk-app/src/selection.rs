// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::EntityId;

pub type IdSet = BTreeSet<EntityId>;

/// Committed selection owned by the parent form plus the pending working copy
/// edited while a selector is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    committed: IdSet,
    pending: IdSet,
}

impl SelectionState {
    pub fn new(committed: IdSet) -> Self {
        Self {
            pending: committed.clone(),
            committed,
        }
    }

    pub fn committed(&self) -> &IdSet {
        &self.committed
    }

    pub fn pending(&self) -> &IdSet {
        &self.pending
    }

    pub fn is_pending(&self, id: &EntityId) -> bool {
        self.pending.contains(id)
    }

    /// Starts an editing session from the parent's current value.
    pub fn seed(&mut self, committed: IdSet) {
        self.pending = committed.clone();
        self.committed = committed;
    }

    pub fn toggle(&mut self, id: EntityId) {
        if !self.pending.remove(&id) {
            self.pending.insert(id);
        }
    }

    pub fn insert_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        self.pending.extend(ids.into_iter().cloned());
    }

    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        for id in ids {
            self.pending.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn commit(&mut self) -> IdSet {
        self.committed = self.pending.clone();
        self.committed.clone()
    }

    pub fn revert(&mut self) -> IdSet {
        self.pending = self.committed.clone();
        self.committed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{IdSet, SelectionState};
    use crate::EntityId;

    fn ids(values: &[&str]) -> IdSet {
        values.iter().map(|value| EntityId::new(*value)).collect()
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = SelectionState::new(ids(&["a"]));
        state.toggle(EntityId::new("a"));
        state.toggle(EntityId::new("b"));
        assert_eq!(state.pending(), &ids(&["b"]));
        assert_eq!(state.committed(), &ids(&["a"]));
    }

    #[test]
    fn revert_restores_committed_value() {
        let mut state = SelectionState::new(ids(&["a", "b"]));
        state.clear();
        state.insert_all(&ids(&["c"]));
        assert_eq!(state.revert(), ids(&["a", "b"]));
        assert_eq!(state.pending(), &ids(&["a", "b"]));
    }

    #[test]
    fn commit_overwrites_committed_with_pending() {
        let mut state = SelectionState::new(ids(&["a"]));
        state.remove_all(&ids(&["a"]));
        state.toggle(EntityId::new("z"));
        assert_eq!(state.commit(), ids(&["z"]));
        assert_eq!(state.committed(), &ids(&["z"]));
    }
}
