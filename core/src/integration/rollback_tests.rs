//! Rollback tests (save → advance → load → re-advance → verify)

use std::io::Read;

use crate::config::{MatchConfig, PlayerConfig, StageSettings};
use crate::input::{FrameInput, TickInputs};
use crate::replay::{MAGIC, RECORD_SIZE};
use crate::rollback::{
    GgrsSession, RollbackDriver, RollbackMatch, SessionCallbacks, SessionConfig,
};
use crate::runtime::Match;

use super::test_utils::*;

fn driver(players: usize, seed: u64) -> RollbackDriver {
    let mut config = MatchConfig::local(players);
    config.seed = seed;
    RollbackDriver::new(running_remote(config))
}

fn advance(driver: &mut RollbackDriver, ticks: &[TickInputs]) {
    for inputs in ticks {
        driver.advance_frame(inputs).unwrap();
    }
}

/// Save at k, run to k+m, load k, re-run k..k+m: same hash as the first pass.
#[test]
fn test_rollback_equivalence() {
    let mut driver = driver(2, 17);
    let ticks = scripted_ticks(33, 2, 90);

    advance(&mut driver, &ticks[..30]);
    let saved = driver.save_game_state(30).unwrap();
    assert_eq!(driver.store().active_count(), 1);

    advance(&mut driver, &ticks[30..]);
    let first_pass = driver.game().world_hash();
    let first_tick = driver.game().match_state().tick;

    driver.load_game_state(saved.token).unwrap();
    assert_eq!(driver.game().match_state().tick, 30);
    assert_eq!(
        crate::hash::fold_checksum(driver.game().world_hash()),
        saved.checksum
    );

    advance(&mut driver, &ticks[30..]);
    assert_eq!(driver.game().world_hash(), first_pass);
    assert_eq!(driver.game().match_state().tick, first_tick);

    driver.free_buffer(saved.token);
    assert_eq!(driver.store().active_count(), 0);
}

/// A load with mispredicted inputs followed by the corrected ones converges.
#[test]
fn test_rollback_corrects_misprediction() {
    let ticks = scripted_ticks(7, 2, 40);
    let mut predicted = ticks.clone();
    for inputs in &mut predicted[20..] {
        inputs[1] = inputs[0];
    }

    let mut reference = driver(2, 5);
    advance(&mut reference, &ticks);

    let mut rolled = driver(2, 5);
    advance(&mut rolled, &predicted[..20]);
    let saved = rolled.save_game_state(20).unwrap();
    advance(&mut rolled, &predicted[20..]);
    assert_ne!(rolled.game().world_hash(), reference.game().world_hash());

    rolled.load_game_state(saved.token).unwrap();
    advance(&mut rolled, &ticks[20..]);
    assert_eq!(rolled.game().world_hash(), reference.game().world_hash());
}

#[test]
#[should_panic(expected = "is not live")]
fn test_double_free_panics() {
    let mut driver = driver(2, 0);
    let saved = driver.save_game_state(0).unwrap();
    driver.free_buffer(saved.token);
    driver.free_buffer(saved.token);
}

#[test]
#[should_panic(expected = "load_game_state")]
fn test_load_after_free_panics() {
    let mut driver = driver(2, 0);
    let saved = driver.save_game_state(0).unwrap();
    driver.free_buffer(saved.token);
    let _ = driver.load_game_state(saved.token);
}

/// Live state keeps its identity across loads; only the contents change.
#[test]
fn test_load_copies_into_live_state() {
    let mut driver = driver(2, 0);
    let live = driver.game().state() as *const _;
    let saved = driver.save_game_state(0).unwrap();
    advance(&mut driver, &scripted_ticks(1, 2, 5));
    driver.load_game_state(saved.token).unwrap();
    assert!(std::ptr::eq(live, driver.game().state()));
}

/// GGRS sync-test rolls back every frame and compares checksums; the match
/// must agree with a plain local run and its recording must replay.
#[test]
fn test_sync_test_session_matches_local_run() {
    const FRAMES: usize = 150;
    let mut config = MatchConfig::local(2);
    config.seed = 1234;
    let stage = StageSettings::flat(2);

    let file = tempfile::NamedTempFile::new().unwrap();
    let session_config = SessionConfig::sync_test(2);
    let session = GgrsSession::new_sync_test(session_config.clone(), &config).unwrap();
    let mut remote = Match::remote(config.clone());
    start(&mut remote, &stage);
    let driver = RollbackDriver::new(remote)
        .with_recorder(file.reopen().unwrap(), &session_config)
        .unwrap();
    let mut rollback = RollbackMatch::new(session, driver, ScriptedInput::new(77));

    let mut local = Match::local(config.clone(), ScriptedInput::new(77));
    start(&mut local, &stage);

    for frame in 0..FRAMES {
        let events = rollback.update().unwrap();
        assert!(events.is_empty(), "frame {frame}: {events:?}");
        local.update().unwrap();
        assert_eq!(rollback.game().world_hash(), local.world_hash(), "frame {frame}");
    }

    assert!(rollback.session().total_rollback_frames() > 0);
    let (saves, loads) = rollback.driver().snapshot_counts();
    assert!(saves as usize > FRAMES);
    assert!(loads > 0);
    assert!(rollback.driver().store().active_count() <= session_config.max_prediction_frames + 1);

    let expected = local.world_hash();
    rollback.dispose().unwrap();

    let mut bytes = Vec::new();
    file.reopen().unwrap().read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes.len(), MAGIC.len() + FRAMES * RECORD_SIZE);

    let mut replay = Match::replay(config, file.reopen().unwrap()).unwrap();
    start(&mut replay, &stage);
    for _ in 0..FRAMES {
        replay.update().unwrap();
    }
    assert_eq!(replay.world_hash(), expected);
}

/// A player with no local device gets neutral input in both runs, and the
/// input source is only drawn from for local players.
#[test]
fn test_sync_test_with_remote_player_matches_local_run() {
    let mut config = MatchConfig::local(2);
    config.players[1] = PlayerConfig::remote(1);
    config.seed = 99;
    let stage = StageSettings::flat(2);

    let session = GgrsSession::new_sync_test(SessionConfig::sync_test(2), &config).unwrap();
    let mut remote = Match::remote(config.clone());
    start(&mut remote, &stage);
    let mut rollback =
        RollbackMatch::new(session, RollbackDriver::new(remote), ScriptedInput::new(5));

    let mut local = Match::local(config, ScriptedInput::new(5));
    start(&mut local, &stage);

    for frame in 0..60 {
        rollback.update().unwrap();
        local.update().unwrap();
        assert_eq!(rollback.game().world_hash(), local.world_hash(), "frame {frame}");
    }

    let idle = rollback.game().state().find_player(1).unwrap();
    let input = rollback.game().state().inputs.get(idle).unwrap();
    assert_eq!(input.current, FrameInput::default());
}

/// Local sessions advance without snapshots.
#[test]
fn test_local_session_rollback_match() {
    let config = MatchConfig::local(2);
    let session = GgrsSession::new_local(&config);
    let mut remote = Match::remote(config.clone());
    start(&mut remote, &StageSettings::flat(2));
    let mut rollback =
        RollbackMatch::new(session, RollbackDriver::new(remote), ScriptedInput::new(3));

    let mut local = Match::local(config, ScriptedInput::new(3));
    start(&mut local, &StageSettings::flat(2));

    for _ in 0..30 {
        rollback.update().unwrap();
        local.update().unwrap();
    }
    assert_eq!(rollback.game().world_hash(), local.world_hash());
    assert_eq!(rollback.driver().snapshot_counts(), (0, 0));
}
