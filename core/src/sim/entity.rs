//! Generational entity ids

use std::fmt;

/// Stable entity identifier. The generation changes each time a slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl EntityId {
    /// Packed form used as the hashing sort key.
    #[inline]
    pub fn to_bits(self) -> u64 {
        ((self.index as u64) << 32) | self.generation as u64
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Slot allocator. Freed slots are reused most-recently-freed first.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
}

impl Clone for EntityAllocator {
    fn clone(&self) -> Self {
        Self {
            generations: self.generations.clone(),
            alive: self.alive.clone(),
            free: self.free.clone(),
            live_count: self.live_count,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.generations.clone_from(&source.generations);
        self.alive.clone_from(&source.alive);
        self.free.clone_from(&source.free);
        self.live_count = source.live_count;
    }
}

impl EntityAllocator {
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId {
                index,
                generation: self.generations[slot],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        EntityId {
            index,
            generation: 0,
        }
    }

    /// Returns false if `id` was not alive.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(id.index);
        self.live_count -= 1;
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == id.generation
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Live ids in slot order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| EntityId {
                index: index as u32,
                generation: self.generations[index],
            })
    }

    pub fn clear(&mut self) {
        self.generations.clear();
        self.alive.clear();
        self.free.clear();
        self.live_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_bumps_generation() {
        let mut entities = EntityAllocator::default();
        let a = entities.allocate();
        assert!(entities.free(a));
        let b = entities.allocate();
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(!entities.is_alive(a));
        assert!(entities.is_alive(b));
    }

    #[test]
    fn test_double_free_rejected() {
        let mut entities = EntityAllocator::default();
        let a = entities.allocate();
        assert!(entities.free(a));
        assert!(!entities.free(a));
        assert!(entities.is_empty());
    }

    #[test]
    fn test_iter_skips_dead() {
        let mut entities = EntityAllocator::default();
        let a = entities.allocate();
        let b = entities.allocate();
        let c = entities.allocate();
        entities.free(b);
        assert_eq!(entities.iter().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_bits_order_matches_index() {
        let low = EntityId { index: 1, generation: 9 };
        let high = EntityId { index: 2, generation: 0 };
        assert!(low.to_bits() < high.to_bits());
    }
}
