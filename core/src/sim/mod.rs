//! Simulation state
//!
//! [`SimulationState`] is the complete, self-contained state of one match:
//! an entity arena with generational ids, one sparse-set storage per component
//! type, and the [`MatchState`] singleton. Nothing outside it influences a
//! tick except the tick's input block, so copying it is a full snapshot.

pub mod components;
pub mod entity;
pub mod rng;
pub mod storage;
pub mod systems;

pub use components::{
    Disabled, Hitbox, HitboxFlags, Hurtbox, HurtboxKind, Movement, PlayerComponent, PlayerFlags,
    ScalableValue, TimeToLive, Transform, Velocity,
};
pub use entity::{EntityAllocator, EntityId};
pub use rng::DeterministicRng;
pub use storage::ComponentStorage;

use std::time::Duration;

use xxhash_rust::xxh3::Xxh3;

use crate::hash::{HashWrite, StateHash};
use crate::input::PlayerInputState;

/// Where the match is in its lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgressionState {
    /// Countdown before play
    #[default]
    Intro,
    InGame,
    /// Only reachable from `InGame`
    Pause,
    End,
}

/// Match-wide singleton, mutated once per tick by the progression step and rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchState {
    /// Ticks remaining when a time limit is active
    pub time: u32,
    pub progression: ProgressionState,
    pub intro_remaining: u32,
    /// Ticks stepped since initialization
    pub tick: u32,
    pub rng: DeterministicRng,
}

impl MatchState {
    pub fn is_running(&self) -> bool {
        self.progression == ProgressionState::InGame
    }
}

impl StateHash for MatchState {
    fn write_state(&self, out: &mut Xxh3) {
        out.put_u32(self.time);
        out.put_u8(self.progression as u8);
        out.put_u32(self.intro_remaining);
        out.put_u32(self.tick);
        out.put_u64(self.rng.state());
    }
}

/// Fixed-timestep context for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u32,
    pub delta: Duration,
}

impl TickContext {
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// All entities and components of one match.
#[derive(Debug, Default)]
pub struct SimulationState {
    entities: EntityAllocator,
    pub players: ComponentStorage<PlayerComponent>,
    pub inputs: ComponentStorage<PlayerInputState>,
    pub transforms: ComponentStorage<Transform>,
    pub velocities: ComponentStorage<Velocity>,
    pub movement: ComponentStorage<Movement>,
    pub hitboxes: ComponentStorage<Hitbox>,
    pub hurtboxes: ComponentStorage<Hurtbox>,
    pub lifetimes: ComponentStorage<TimeToLive>,
    pub disabled: ComponentStorage<Disabled>,
    pub match_state: MatchState,
}

impl Clone for SimulationState {
    fn clone(&self) -> Self {
        let mut state = Self::default();
        state.copy_from(self);
        state
    }

    fn clone_from(&mut self, source: &Self) {
        self.copy_from(source);
    }
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite this state with `source`, reusing existing allocations.
    /// Entity ids are preserved exactly.
    pub fn copy_from(&mut self, source: &Self) {
        self.entities.clone_from(&source.entities);
        self.players.clone_from(&source.players);
        self.inputs.clone_from(&source.inputs);
        self.transforms.clone_from(&source.transforms);
        self.velocities.clone_from(&source.velocities);
        self.movement.clone_from(&source.movement);
        self.hitboxes.clone_from(&source.hitboxes);
        self.hurtboxes.clone_from(&source.hurtboxes);
        self.lifetimes.clone_from(&source.lifetimes);
        self.disabled.clone_from(&source.disabled);
        self.match_state = source.match_state;
    }

    /// Remove every entity and reset the match singleton. Capacity is kept.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.players.clear();
        self.inputs.clear();
        self.transforms.clear();
        self.velocities.clear();
        self.movement.clear();
        self.hitboxes.clear();
        self.hurtboxes.clear();
        self.lifetimes.clear();
        self.disabled.clear();
        self.match_state = MatchState::default();
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.match_state == MatchState::default()
    }

    pub fn spawn(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Destroy an entity and all of its components. Returns false if it was not alive.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.entities.free(id) {
            return false;
        }
        self.players.remove(id);
        self.inputs.remove(id);
        self.transforms.remove(id);
        self.velocities.remove(id);
        self.movement.remove(id);
        self.hitboxes.remove(id);
        self.hurtboxes.remove(id);
        self.lifetimes.remove(id);
        self.disabled.remove(id);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    pub fn is_disabled(&self, id: EntityId) -> bool {
        self.disabled.contains(id)
    }

    pub fn set_disabled(&mut self, id: EntityId) {
        self.disabled.insert(id, Disabled);
    }

    /// Entity carrying the player component for `player_id`, if any.
    pub fn find_player(&self, player_id: u8) -> Option<EntityId> {
        self.players
            .iter()
            .find(|(_, player)| player.player_id == player_id)
            .map(|(id, _)| id)
    }

    /// Player entities that are not disabled, in ascending id order.
    pub fn enabled_players(&self) -> Vec<EntityId> {
        self.players
            .sorted_ids()
            .into_iter()
            .filter(|id| !self.disabled.contains(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn populated() -> SimulationState {
        let mut state = SimulationState::new();
        for player_id in 0..2u8 {
            let id = state.spawn();
            state.players.insert(id, PlayerComponent::new(player_id, 9, 3, 0.0));
            state.transforms.insert(id, Transform::at(Vec2::new(player_id as f32, 0.0)));
        }
        state.match_state.time = 100;
        state
    }

    #[test]
    fn test_copy_from_preserves_ids() {
        let source = populated();
        let mut target = SimulationState::new();
        target.spawn();
        target.copy_from(&source);

        assert_eq!(
            target.entities().collect::<Vec<_>>(),
            source.entities().collect::<Vec<_>>()
        );
        let p1 = source.find_player(1).unwrap();
        assert_eq!(target.find_player(1), Some(p1));
        assert_eq!(target.transforms.get(p1), source.transforms.get(p1));
        assert_eq!(target.match_state, source.match_state);
    }

    #[test]
    fn test_copy_is_independent() {
        let source = populated();
        let mut copy = source.clone();
        let p0 = copy.find_player(0).unwrap();
        copy.transforms.get_mut(p0).unwrap().position.x = 50.0;
        assert_eq!(source.transforms.get(p0).unwrap().position.x, 0.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = populated();
        state.clear();
        assert!(state.is_empty());
        assert!(state.players.is_empty());
        assert!(state.find_player(0).is_none());
    }

    #[test]
    fn test_despawn_removes_components() {
        let mut state = populated();
        let p0 = state.find_player(0).unwrap();
        state.set_disabled(p0);
        assert!(state.despawn(p0));
        assert!(!state.players.contains(p0));
        assert!(!state.is_disabled(p0));
        assert!(!state.despawn(p0));
        assert_eq!(state.entity_count(), 1);
    }

    #[test]
    fn test_enabled_players_skip_disabled() {
        let mut state = populated();
        let p0 = state.find_player(0).unwrap();
        let p1 = state.find_player(1).unwrap();
        state.set_disabled(p0);
        assert_eq!(state.enabled_players(), vec![p1]);
    }
}
