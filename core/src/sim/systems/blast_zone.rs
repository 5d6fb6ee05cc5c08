//! Elimination detection: players outside every blast zone are killed

use crate::config::StageLayout;
use crate::sim::SimulationState;

pub fn run(state: &mut SimulationState, stage: &StageLayout) {
    for id in state.enabled_players() {
        let Some(position) = state.transforms.get(id).map(|t| t.position) else {
            continue;
        };
        if stage.in_bounds(position) {
            continue;
        }
        if let Some(player) = state.players.get_mut(id) {
            player.kill();
            tracing::debug!(
                player_id = player.player_id,
                stocks = player.stocks,
                "player left the blast zone"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::config::StageSettings;
    use crate::sim::{PlayerComponent, PlayerFlags, Transform};

    #[test]
    fn test_out_of_bounds_player_killed() {
        let stage = StageSettings::flat(2).resolve().unwrap();
        let mut state = SimulationState::new();
        let inside = state.spawn();
        let outside = state.spawn();
        for (id, player_id, x) in [(inside, 0, 0.0), (outside, 1, 1000.0)] {
            state.players.insert(id, PlayerComponent::new(player_id, 0, 2, 0.0));
            state.transforms.insert(id, Transform::at(Vec2::new(x, 0.0)));
        }

        run(&mut state, &stage);
        assert!(!state.players.get(inside).unwrap().is(PlayerFlags::HAS_DIED));
        let dead = state.players.get(outside).unwrap();
        assert!(dead.is(PlayerFlags::HAS_DIED));
        assert_eq!(dead.stocks, 1);
    }

    #[test]
    fn test_disabled_players_ignored() {
        let stage = StageSettings::flat(1).resolve().unwrap();
        let mut state = SimulationState::new();
        let id = state.spawn();
        state.players.insert(id, PlayerComponent::new(0, 0, 0, 0.0));
        state.transforms.insert(id, Transform::at(Vec2::new(1000.0, 0.0)));
        state.set_disabled(id);

        run(&mut state, &stage);
        assert!(!state.players.get(id).unwrap().is(PlayerFlags::HAS_DIED));
    }
}
