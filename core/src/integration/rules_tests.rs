//! Rule scenarios over full matches on a stage with a pit

use glam::Vec2;

use crate::config::{MatchConfig, MatchMode, StageSettings};
use crate::input::EMPTY_TICK;
use crate::runtime::Match;
use crate::sim::{EntityId, ProgressionState};

use super::test_utils::*;

/// Upper bound on ticks for any scenario; one fall takes a few dozen.
const TICK_LIMIT: usize = 2000;

fn pit_match(configure: impl FnOnce(&mut MatchConfig)) -> (Match, EntityId, EntityId) {
    let mut config = MatchConfig::local(2);
    configure(&mut config);
    let mut game = Match::remote(config);
    start(&mut game, &pit_stage());
    let falling = game.state().find_player(0).unwrap();
    let standing = game.state().find_player(1).unwrap();
    (game, falling, standing)
}

fn at_respawn_point(game: &Match, id: EntityId) -> bool {
    game.state().transforms.get(id).unwrap().position == Vec2::new(-5.0, 0.0)
}

/// Step until `done` holds or the tick limit is hit; returns ticks stepped.
fn step_until(game: &mut Match, mut done: impl FnMut(&Match) -> bool) -> usize {
    for tick in 1..=TICK_LIMIT {
        game.step(&EMPTY_TICK).unwrap();
        if done(&*game) {
            return tick;
        }
    }
    TICK_LIMIT
}

#[test]
fn test_stock_rule_eliminates_after_last_stock() {
    let (mut game, falling, standing) = pit_match(|config| {
        config.stocks = 3;
        config.time = 0;
    });

    let mut respawns = 0;
    let ticks = step_until(&mut game, |game| {
        if at_respawn_point(game, falling) {
            respawns += 1;
        }
        game.state().is_disabled(falling)
    });
    assert!(ticks < TICK_LIMIT);
    assert_eq!(respawns, 2);

    let player = game.state().players.get(falling).unwrap();
    assert_eq!(player.stocks, 0);
    assert!(!game.state().is_disabled(standing));
    assert_eq!(game.state().players.get(standing).unwrap().stocks, 3);

    // The stock rule alone never ends the match.
    assert_eq!(game.match_state().progression, ProgressionState::InGame);
    assert!(!game.is_finished());

    // A disabled player stays where it was eliminated.
    let frozen = *game.state().transforms.get(falling).unwrap();
    for _ in 0..30 {
        game.step(&EMPTY_TICK).unwrap();
    }
    assert_eq!(game.state().transforms.get(falling).unwrap(), &frozen);
}

#[test]
fn test_stock_rule_governs_with_time_limit() {
    let (mut game, falling, _) = pit_match(|config| {
        config.stocks = 2;
        config.time = 10_000;
    });

    let ticks = step_until(&mut game, |game| game.state().is_disabled(falling));
    assert!(ticks < TICK_LIMIT);
    assert_eq!(game.match_state().progression, ProgressionState::InGame);
    assert_eq!(game.match_state().time, 10_000 - ticks as u32);
}

#[test]
fn test_time_rule_respawns_without_stocks() {
    let (mut game, falling, _) = pit_match(|config| {
        config.stocks = 0;
        config.time = 10_000;
    });

    let mut respawns = 0;
    for _ in 0..600 {
        game.step(&EMPTY_TICK).unwrap();
        if at_respawn_point(&game, falling) {
            respawns += 1;
        }
    }
    assert!(respawns >= 5, "only {respawns} respawns");
    assert!(!game.state().is_disabled(falling));
}

#[test]
fn test_training_always_respawns() {
    let (mut game, falling, _) = pit_match(|config| {
        config.mode = MatchMode::Training;
        config.stocks = 1;
    });

    for _ in 0..600 {
        game.step(&EMPTY_TICK).unwrap();
    }
    assert!(!game.state().is_disabled(falling));
    assert_eq!(game.state().players.get(falling).unwrap().stocks, 0);
    assert!(!game.is_finished());
}

#[test]
fn test_respawn_resets_damage() {
    let (mut game, falling, _) = pit_match(|config| {
        config.stocks = 3;
        config.time = 0;
        config.players[0].default_damage = 20.0;
    });
    assert_eq!(game.state().players.get(falling).unwrap().damage, 20.0);

    step_until(&mut game, |game| at_respawn_point(game, falling));
    let player = game.state().players.get(falling).unwrap();
    assert_eq!(player.damage, 20.0);
    assert_eq!(player.stocks, 2);
    assert_eq!(game.state().velocities.get(falling).unwrap().linear, Vec2::ZERO);
}

#[test]
fn test_no_blast_zone_never_eliminates() {
    let stage = StageSettings {
        blast_zones: Vec::new(),
        ..pit_stage()
    };
    let mut config = MatchConfig::local(2);
    config.stocks = 1;
    config.time = 0;
    let mut game = Match::remote(config);
    start(&mut game, &stage);
    let falling = game.state().find_player(0).unwrap();

    for _ in 0..500 {
        game.step(&EMPTY_TICK).unwrap();
    }
    assert!(!game.state().is_disabled(falling));
    assert_eq!(game.state().players.get(falling).unwrap().stocks, 1);
    assert!(game.state().transforms.get(falling).unwrap().position.y < -2.0);
}

#[test]
fn test_time_limit_ends_match_and_freezes_gameplay() {
    let (mut game, falling, _) = pit_match(|config| {
        config.stocks = 3;
        config.time = 5;
    });

    for _ in 0..5 {
        game.step(&EMPTY_TICK).unwrap();
        assert!(!game.is_finished());
    }
    game.step(&EMPTY_TICK).unwrap();
    assert!(game.is_finished());

    let position = game.state().transforms.get(falling).unwrap().position;
    for _ in 0..10 {
        game.step(&EMPTY_TICK).unwrap();
    }
    assert_eq!(game.state().transforms.get(falling).unwrap().position, position);
    assert_eq!(game.match_state().tick, 16);
}
