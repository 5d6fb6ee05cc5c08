//! Sparse-set component storage
//!
//! Components are packed densely; a sparse table maps entity slot indices to
//! dense positions. Removal swaps the last element into the hole, so dense
//! order depends on the history of insertions and removals and must never be
//! relied upon for anything deterministic. Use [`ComponentStorage::sorted_ids`]
//! when order matters.

use super::entity::EntityId;

const EMPTY: u32 = u32::MAX;

#[derive(Debug)]
pub struct ComponentStorage<T> {
    dense: Vec<T>,
    owners: Vec<EntityId>,
    sparse: Vec<u32>,
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
        }
    }
}

impl<T: Clone> Clone for ComponentStorage<T> {
    fn clone(&self) -> Self {
        Self {
            dense: self.dense.clone(),
            owners: self.owners.clone(),
            sparse: self.sparse.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.dense.clone_from(&source.dense);
        self.owners.clone_from(&source.owners);
        self.sparse.clone_from(&source.sparse);
    }
}

impl<T> ComponentStorage<T> {
    fn slot(&self, id: EntityId) -> Option<usize> {
        let dense = *self.sparse.get(id.index as usize)?;
        if dense == EMPTY {
            return None;
        }
        let dense = dense as usize;
        (self.owners[dense] == id).then_some(dense)
    }

    /// Insert or replace the component for `id`. Returns the previous value.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        if let Some(dense) = self.slot(id) {
            return Some(std::mem::replace(&mut self.dense[dense], value));
        }
        let index = id.index as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(value);
        self.owners.push(id);
        None
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let dense = self.slot(id)?;
        let last = self.dense.len() - 1;
        if dense != last {
            let moved = self.owners[last];
            self.sparse[moved.index as usize] = dense as u32;
        }
        self.sparse[id.index as usize] = EMPTY;
        self.owners.swap_remove(dense);
        Some(self.dense.swap_remove(dense))
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slot(id).map(|dense| &self.dense[dense])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slot(id).map(|dense| &mut self.dense[dense])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Components in physical (dense) order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Owning entities in ascending id order.
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids = self.owners.clone();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.owners.clear();
        self.sparse.clear();
    }
}
