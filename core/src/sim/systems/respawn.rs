//! Respawn assignment
//!
//! Runs after every rule. Players flagged as respawned are moved to a respawn
//! point chosen by their own RNG; players that died without being respawned
//! are disabled for the rest of the match. Event flags are cleared either way.

use glam::Vec2;

use crate::sim::{PlayerFlags, SimulationState};

pub fn run(state: &mut SimulationState, respawn_points: &[Vec2]) {
    for id in state.enabled_players() {
        let Some(player) = state.players.get_mut(id) else {
            continue;
        };
        let mut disable = false;
        let mut relocate = None;
        if player.is(PlayerFlags::HAS_RESPAWNED) && !respawn_points.is_empty() {
            let index = player.rng.next_int(respawn_points.len() as u32) as usize;
            relocate = Some(respawn_points[index]);
            player.damage = player.default_damage;
            player.hitstun = 0;
            player.hitlag = 0;
            player.unset_flags(PlayerFlags::GROUNDED | PlayerFlags::FAST_FALLING);
            tracing::debug!(player_id = player.player_id, index, "player respawned");
        } else if player.is(PlayerFlags::HAS_DIED) {
            disable = true;
            tracing::info!(player_id = player.player_id, "player eliminated");
        }
        player.unset_flags(PlayerFlags::EVENT_FLAGS);

        if let Some(position) = relocate {
            if let Some(transform) = state.transforms.get_mut(id) {
                transform.position = position;
            }
            super::movement::stop(state, id);
        }
        if disable {
            state.set_disabled(id);
        }
    }
}
