//! Integration tests for the match engine
//!
//! Tests determinism, rollback equivalence against GGRS sync-test sessions,
//! replay round trips through files, and rule scenarios over full matches.

#[cfg(test)]
mod rollback_tests;
#[cfg(test)]
mod rules_tests;

#[cfg(test)]
pub(crate) mod test_utils {
    use glam::Vec2;

    use crate::config::{Bounds2D, Ground, MatchConfig, NamedPoint, StageSettings};
    use crate::input::{Buttons, EMPTY_TICK, FrameInput, InputSource, TickInputs};
    use crate::runtime::{DefaultSpawner, LoadBarrier, Match};
    use crate::sim::DeterministicRng;

    /// Initialize a match on `stage` with default collaborators.
    pub fn start(game: &mut Match, stage: &StageSettings) {
        pollster::block_on(game.initialize(stage, &LoadBarrier::ready(), &DefaultSpawner))
            .unwrap();
    }

    /// A running match driven through `step`.
    pub fn running_remote(config: MatchConfig) -> Match {
        let stage = StageSettings::flat(config.player_count());
        let mut game = Match::remote(config);
        start(&mut game, &stage);
        game
    }

    /// Pseudo-random but reproducible player input.
    pub struct ScriptedInput {
        rng: DeterministicRng,
    }

    impl ScriptedInput {
        pub fn new(seed: u64) -> Self {
            Self {
                rng: DeterministicRng::new(seed),
            }
        }

        pub fn next_input(&mut self) -> FrameInput {
            let buttons = Buttons::from_bits_truncate(self.rng.next_u32() as u8);
            let stick = |rng: &mut DeterministicRng| (rng.next_int(255) as i32 - 127) as i8;
            let movement = (stick(&mut self.rng), stick(&mut self.rng));
            FrameInput::new(buttons, movement, (0, 0))
        }
    }

    impl InputSource for ScriptedInput {
        fn sample(&mut self, _local_id: u8) -> FrameInput {
            self.next_input()
        }
    }

    /// `ticks` input blocks for the first `players` slots.
    pub fn scripted_ticks(seed: u64, players: usize, ticks: usize) -> Vec<TickInputs> {
        let mut source = ScriptedInput::new(seed);
        (0..ticks)
            .map(|_| {
                let mut inputs = EMPTY_TICK;
                for slot in inputs.iter_mut().take(players) {
                    *slot = source.next_input();
                }
                inputs
            })
            .collect()
    }

    /// Two-player stage where player 0 spawns over a pit and falls out of
    /// the blast zone, while player 1 stands on solid ground.
    pub fn pit_stage() -> StageSettings {
        StageSettings {
            spawn_points: vec![
                NamedPoint::new("a_pit", Vec2::new(-5.0, 0.0)),
                NamedPoint::new("b_ledge", Vec2::new(5.0, 0.0)),
            ],
            respawn_points: vec![NamedPoint::new("pit", Vec2::new(-5.0, 0.0))],
            blast_zones: vec![Bounds2D::new(Vec2::new(-10.0, -2.0), Vec2::new(10.0, 10.0))],
            ground: Some(Ground {
                height: 0.0,
                min_x: 2.0,
                max_x: 10.0,
            }),
        }
    }
}
