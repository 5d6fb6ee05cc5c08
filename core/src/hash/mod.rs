//! Order-independent world hashing for desync detection
//!
//! Each tracked component category is reduced to one digest: every component
//! is hashed on its own, paired with its owner's [`EntityId`], the pairs are
//! sorted by id and the sorted sequence is hashed. Physical storage order
//! therefore never leaks into the result. Categories are digested in parallel
//! and joined before [`WorldHasher::update`] returns.

use std::fmt;

use glam::Vec2;
use rayon::prelude::*;
use xxhash_rust::xxh3::Xxh3;

use crate::sim::{ComponentStorage, SimulationState};

/// 64-bit digest.
pub type HashDigest = u64;

/// Digest reported for a category with no components.
pub const EMPTY_DIGEST: HashDigest = 0;

/// Number of tracked categories.
pub const CATEGORY_COUNT: usize = 7;

/// Fields that take part in hashing. Implementors write only
/// simulation-relevant data, in a fixed order and byte layout.
pub trait StateHash {
    fn write_state(&self, out: &mut Xxh3);
}

/// Little-endian field writers for [`Xxh3`].
pub trait HashWrite {
    fn put_u8(&mut self, value: u8);
    fn put_u16(&mut self, value: u16);
    fn put_u32(&mut self, value: u32);
    fn put_u64(&mut self, value: u64);
    fn put_f32(&mut self, value: f32);
    fn put_vec2(&mut self, value: Vec2);
}

impl HashWrite for Xxh3 {
    #[inline]
    fn put_u8(&mut self, value: u8) {
        self.update(&[value]);
    }

    #[inline]
    fn put_u16(&mut self, value: u16) {
        self.update(&value.to_le_bytes());
    }

    #[inline]
    fn put_u32(&mut self, value: u32) {
        self.update(&value.to_le_bytes());
    }

    #[inline]
    fn put_u64(&mut self, value: u64) {
        self.update(&value.to_le_bytes());
    }

    #[inline]
    fn put_f32(&mut self, value: f32) {
        self.update(&value.to_bits().to_le_bytes());
    }

    #[inline]
    fn put_vec2(&mut self, value: Vec2) {
        self.put_f32(value.x);
        self.put_f32(value.y);
    }
}

/// Digest of a single value.
pub fn hash_one<T: StateHash + ?Sized>(value: &T) -> HashDigest {
    let mut hasher = Xxh3::new();
    value.write_state(&mut hasher);
    hasher.digest()
}

/// Tracked component categories, in aggregate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashCategory {
    Player,
    Input,
    Transform,
    Velocity,
    Hitbox,
    Hurtbox,
    Lifetime,
}

impl HashCategory {
    pub const ALL: [HashCategory; CATEGORY_COUNT] = [
        HashCategory::Player,
        HashCategory::Input,
        HashCategory::Transform,
        HashCategory::Velocity,
        HashCategory::Hitbox,
        HashCategory::Hurtbox,
        HashCategory::Lifetime,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            HashCategory::Player => "player",
            HashCategory::Input => "input",
            HashCategory::Transform => "transform",
            HashCategory::Velocity => "velocity",
            HashCategory::Hitbox => "hitbox",
            HashCategory::Hurtbox => "hurtbox",
            HashCategory::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for HashCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort-by-id digest of one storage.
pub fn category_digest<T: StateHash>(storage: &ComponentStorage<T>) -> (HashDigest, u32) {
    if storage.is_empty() {
        return (EMPTY_DIGEST, 0);
    }
    let mut pairs: Vec<(u64, HashDigest)> = storage
        .iter()
        .map(|(id, component)| (id.to_bits(), hash_one(component)))
        .collect();
    pairs.sort_unstable_by_key(|(id, _)| *id);

    let mut hasher = Xxh3::new();
    for (id, digest) in &pairs {
        hasher.put_u64(*id);
        hasher.put_u64(*digest);
    }
    (hasher.digest(), pairs.len() as u32)
}

fn digest_category(state: &SimulationState, category: HashCategory) -> (HashDigest, u32) {
    match category {
        HashCategory::Player => category_digest(&state.players),
        HashCategory::Input => category_digest(&state.inputs),
        HashCategory::Transform => category_digest(&state.transforms),
        HashCategory::Velocity => category_digest(&state.velocities),
        HashCategory::Hitbox => category_digest(&state.hitboxes),
        HashCategory::Hurtbox => category_digest(&state.hurtboxes),
        HashCategory::Lifetime => category_digest(&state.lifetimes),
    }
}

/// Holds the digests computed by the last [`WorldHasher::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorldHasher {
    digests: [HashDigest; CATEGORY_COUNT],
    counts: [u32; CATEGORY_COUNT],
    match_digest: HashDigest,
    world: HashDigest,
}

impl WorldHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every digest from `state`. Call only at tick boundaries.
    pub fn update(&mut self, state: &SimulationState) {
        let results: Vec<(HashDigest, u32)> = HashCategory::ALL
            .as_slice()
            .par_iter()
            .map(|category| digest_category(state, *category))
            .collect();

        for (slot, (digest, count)) in results.into_iter().enumerate() {
            self.digests[slot] = digest;
            self.counts[slot] = count;
        }
        self.match_digest = hash_one(&state.match_state);

        // Counts go in alongside the digests so an empty category is
        // distinguishable from one that happens to digest to zero.
        let mut hasher = Xxh3::new();
        for (digest, count) in self.digests.iter().zip(self.counts.iter()) {
            hasher.put_u64(*digest);
            hasher.put_u32(*count);
        }
        hasher.put_u64(self.match_digest);
        for id in state.disabled.sorted_ids() {
            hasher.put_u64(id.to_bits());
        }
        self.world = hasher.digest();
    }

    /// Aggregate digest of the last update.
    pub fn world_hash(&self) -> HashDigest {
        self.world
    }

    pub fn category_hash(&self, category: HashCategory) -> HashDigest {
        self.digests[category.index()]
    }

    /// Components hashed for `category` in the last update.
    pub fn category_count(&self, category: HashCategory) -> u32 {
        self.counts[category.index()]
    }

    pub fn match_state_hash(&self) -> HashDigest {
        self.match_digest
    }

    pub fn component_hashes(&self) -> [HashDigest; CATEGORY_COUNT] {
        self.digests
    }

    /// Categories whose digests differ between two hashers.
    pub fn diff(&self, other: &WorldHasher) -> Vec<HashCategory> {
        HashCategory::ALL
            .into_iter()
            .filter(|category| self.category_hash(*category) != other.category_hash(*category))
            .collect()
    }
}

/// Fold a 64-bit digest to 32 bits by XOR-ing its halves.
#[inline]
pub fn fold_checksum(digest: HashDigest) -> u32 {
    ((digest & 0xffff_ffff) ^ (digest >> 32)) as u32
}
