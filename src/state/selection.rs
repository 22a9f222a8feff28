//! Set of selected shape ids on the current image.

use std::collections::BTreeSet;

use crate::model::ShapeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<ShapeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ShapeId> {
        self.ids.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Replace the selection with a single id.
    pub fn select_only(&mut self, id: ShapeId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    /// Replace the selection with `ids`.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ShapeId>) {
        self.ids = ids.into_iter().collect();
    }

    /// Add `id` if absent, remove it if present. Returns true if now selected.
    pub fn toggle(&mut self, id: ShapeId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn remove(&mut self, id: ShapeId) -> bool {
        self.ids.remove(&id)
    }

    /// Drop ids for which `keep` is false and return them.
    pub fn prune(&mut self, mut keep: impl FnMut(ShapeId) -> bool) -> Vec<ShapeId> {
        let stale: Vec<ShapeId> = self.ids.iter().copied().filter(|id| !keep(*id)).collect();
        for id in &stale {
            self.ids.remove(id);
        }
        stale
    }
}
