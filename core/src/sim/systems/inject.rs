//! Input injection
//!
//! Copies each player's slot of the tick's input block into that player's
//! [`PlayerInputState`](crate::input::PlayerInputState). The slot is chosen by
//! exact `player_id → index` correspondence, never by entity order.

use crate::config::MAX_PLAYERS;
use crate::input::{EMPTY_TICK, FrameInput, TickInputs};
use crate::sim::SimulationState;

/// Staging buffer for one tick's inputs.
#[derive(Debug, Clone)]
pub struct InputInjector {
    buffer: TickInputs,
}

impl Default for InputInjector {
    fn default() -> Self {
        Self { buffer: EMPTY_TICK }
    }
}

impl InputInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one player's input.
    ///
    /// # Panics
    ///
    /// Panics if `player_id` is not below [`MAX_PLAYERS`].
    pub fn set_player_input(&mut self, player_id: usize, input: FrameInput) {
        assert!(
            player_id < MAX_PLAYERS,
            "player id {player_id} out of range (max {MAX_PLAYERS})"
        );
        self.buffer[player_id] = input;
    }

    pub fn set_all(&mut self, inputs: &TickInputs) {
        self.buffer = *inputs;
    }

    pub fn buffer(&self) -> &TickInputs {
        &self.buffer
    }

    /// Push the staged inputs into every enabled player.
    ///
    /// # Panics
    ///
    /// Panics if a player component carries an out-of-range id.
    pub fn apply(&self, state: &mut SimulationState) {
        for (id, player) in state.players.iter() {
            let player_id = player.player_id as usize;
            assert!(
                player_id < MAX_PLAYERS,
                "entity {id} has player id {player_id} out of range (max {MAX_PLAYERS})"
            );
            if state.disabled.contains(id) {
                continue;
            }
            if let Some(input) = state.inputs.get_mut(id) {
                input.update(self.buffer[player_id]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Buttons, PlayerInputState};
    use crate::sim::PlayerComponent;

    fn spawn_player(state: &mut SimulationState, player_id: u8) -> crate::sim::EntityId {
        let id = state.spawn();
        state.players.insert(id, PlayerComponent::new(player_id, 0, 3, 0.0));
        state.inputs.insert(id, PlayerInputState::default());
        id
    }

    #[test]
    fn test_inputs_follow_player_id_not_entity_order() {
        let mut state = SimulationState::new();
        let first = spawn_player(&mut state, 5);
        let second = spawn_player(&mut state, 1);

        let mut injector = InputInjector::new();
        injector.set_player_input(1, FrameInput::new(Buttons::JUMP, (0, 0), (0, 0)));
        injector.set_player_input(5, FrameInput::new(Buttons::ATTACK, (0, 0), (0, 0)));
        injector.apply(&mut state);

        assert!(state.inputs.get(first).unwrap().is_pressed(Buttons::ATTACK));
        assert!(state.inputs.get(second).unwrap().is_pressed(Buttons::JUMP));
    }

    #[test]
    fn test_previous_input_tracked() {
        let mut state = SimulationState::new();
        let id = spawn_player(&mut state, 0);
        let mut injector = InputInjector::new();

        injector.set_player_input(0, FrameInput::new(Buttons::SHIELD, (0, 0), (0, 0)));
        injector.apply(&mut state);
        injector.set_player_input(0, FrameInput::default());
        injector.apply(&mut state);

        assert!(state.inputs.get(id).unwrap().was_released(Buttons::SHIELD));
    }

    #[test]
    fn test_disabled_players_frozen() {
        let mut state = SimulationState::new();
        let id = spawn_player(&mut state, 0);
        state.set_disabled(id);

        let mut injector = InputInjector::new();
        injector.set_player_input(0, FrameInput::new(Buttons::GRAB, (0, 0), (0, 0)));
        injector.apply(&mut state);
        assert_eq!(*state.inputs.get(id).unwrap(), PlayerInputState::default());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_slot_panics() {
        InputInjector::new().set_player_input(MAX_PLAYERS, FrameInput::default());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_player_component_panics() {
        let mut state = SimulationState::new();
        spawn_player(&mut state, 9);
        InputInjector::new().apply(&mut state);
    }
}
