//! Match rules
//!
//! A match enables a subset of a small closed set of rules at initialization.
//! Enabled rules always run in declaration order, after elimination detection
//! and before respawn assignment.
//!
//! When both the time and stock rules are enabled the stock rule governs
//! elimination: a player out of stocks is not respawned. The time rule only
//! respawns dead players itself when the stock rule is disabled.

use smallvec::SmallVec;

use crate::config::{MatchConfig, MatchMode};
use crate::sim::{PlayerFlags, ProgressionState, SimulationState};

/// A rule that can be enabled for a match. Declaration order is run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchRule {
    /// Dead players always respawn
    Training,
    /// Dead players respawn while they have stocks left
    Stock,
    /// Counts down the clock and ends the match at zero
    Time,
}

impl MatchRule {
    pub const ALL: [MatchRule; 3] = [MatchRule::Training, MatchRule::Stock, MatchRule::Time];
}

/// What a rule pass concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleOutcome {
    /// The match reached its end condition this tick
    pub ended: bool,
}

/// Enabled rules, kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchRuleRegistry {
    enabled: SmallVec<[MatchRule; 3]>,
}

impl MatchRuleRegistry {
    pub fn new(rules: impl IntoIterator<Item = MatchRule>) -> Self {
        let requested: SmallVec<[MatchRule; 3]> = rules.into_iter().collect();
        let enabled = MatchRule::ALL
            .into_iter()
            .filter(|rule| requested.contains(rule))
            .collect();
        Self { enabled }
    }

    /// Rules implied by a match configuration.
    pub fn for_config(config: &MatchConfig) -> Self {
        let rules: SmallVec<[MatchRule; 3]> = match config.mode {
            MatchMode::Training => smallvec::smallvec![MatchRule::Training],
            MatchMode::Default => {
                let mut rules = SmallVec::new();
                if config.time > 0 {
                    rules.push(MatchRule::Time);
                }
                if config.stocks > 0 {
                    rules.push(MatchRule::Stock);
                }
                rules
            }
        };
        let registry = Self::new(rules);
        for rule in registry.rules() {
            tracing::info!(?rule, "enabled match rule");
        }
        registry
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.enabled
    }

    pub fn is_enabled(&self, rule: MatchRule) -> bool {
        self.enabled.contains(&rule)
    }

    /// Run every enabled rule once.
    pub fn run(&self, state: &mut SimulationState) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();
        for rule in &self.enabled {
            match rule {
                MatchRule::Training => respawn_dead(state, |_| true),
                MatchRule::Stock => respawn_dead(state, |stocks| stocks > 0),
                MatchRule::Time => {
                    if tick_clock(state) {
                        outcome.ended = true;
                    }
                    if !self.is_enabled(MatchRule::Stock) {
                        respawn_dead(state, |_| true);
                    }
                }
            }
        }
        outcome
    }
}

fn respawn_dead(state: &mut SimulationState, allow: impl Fn(i8) -> bool) {
    for (id, player) in state.players.iter_mut() {
        if state.disabled.contains(id) {
            continue;
        }
        if player.is(PlayerFlags::HAS_DIED) && allow(player.stocks) {
            player.set_flags(PlayerFlags::HAS_RESPAWNED);
        }
    }
}

/// Count the clock down while in game. Returns true when time ran out.
fn tick_clock(state: &mut SimulationState) -> bool {
    let match_state = &mut state.match_state;
    if match_state.progression != ProgressionState::InGame {
        return false;
    }
    if match_state.time > 0 {
        match_state.time -= 1;
        false
    } else {
        match_state.progression = ProgressionState::End;
        tracing::info!(tick = match_state.tick, "match over: time expired");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EntityId, PlayerComponent};

    fn state_with_player(stocks: i8) -> (SimulationState, EntityId) {
        let mut state = SimulationState::new();
        let id = state.spawn();
        state.players.insert(id, PlayerComponent::new(0, 0, stocks, 0.0));
        state.match_state.progression = ProgressionState::InGame;
        (state, id)
    }

    fn kill(state: &mut SimulationState, id: EntityId) {
        state.players.get_mut(id).unwrap().kill();
    }

    fn respawned(state: &SimulationState, id: EntityId) -> bool {
        state.players.get(id).unwrap().is(PlayerFlags::HAS_RESPAWNED)
    }

    #[test]
    fn test_registry_keeps_declaration_order() {
        let registry = MatchRuleRegistry::new([MatchRule::Time, MatchRule::Stock]);
        assert_eq!(registry.rules(), &[MatchRule::Stock, MatchRule::Time]);
    }

    #[test]
    fn test_rules_for_config() {
        let mut config = MatchConfig::local(2);
        config.stocks = 3;
        config.time = 60;
        assert_eq!(
            MatchRuleRegistry::for_config(&config).rules(),
            &[MatchRule::Stock, MatchRule::Time]
        );

        config.stocks = 0;
        assert_eq!(MatchRuleRegistry::for_config(&config).rules(), &[MatchRule::Time]);

        config.time = 0;
        assert!(MatchRuleRegistry::for_config(&config).rules().is_empty());

        config.mode = MatchMode::Training;
        config.stocks = 3;
        assert_eq!(
            MatchRuleRegistry::for_config(&config).rules(),
            &[MatchRule::Training]
        );
    }

    #[test]
    fn test_stock_rule_respawns_until_out() {
        let registry = MatchRuleRegistry::new([MatchRule::Stock]);
        let (mut state, id) = state_with_player(2);

        kill(&mut state, id);
        registry.run(&mut state);
        assert!(respawned(&state, id));

        state.players.get_mut(id).unwrap().unset_flags(PlayerFlags::EVENT_FLAGS);
        kill(&mut state, id);
        registry.run(&mut state);
        assert!(!respawned(&state, id));
    }

    #[test]
    fn test_time_rule_defers_to_stock_rule() {
        let registry = MatchRuleRegistry::new([MatchRule::Stock, MatchRule::Time]);
        let (mut state, id) = state_with_player(1);
        state.match_state.time = 60;
        kill(&mut state, id);
        registry.run(&mut state);
        assert!(!respawned(&state, id));
    }

    #[test]
    fn test_time_rule_alone_always_respawns() {
        let registry = MatchRuleRegistry::new([MatchRule::Time]);
        let (mut state, id) = state_with_player(0);
        state.match_state.time = 60;
        kill(&mut state, id);
        registry.run(&mut state);
        assert!(respawned(&state, id));
        assert_eq!(state.match_state.time, 59);
    }

    #[test]
    fn test_training_always_respawns() {
        let registry = MatchRuleRegistry::new([MatchRule::Training]);
        let (mut state, id) = state_with_player(0);
        kill(&mut state, id);
        registry.run(&mut state);
        assert!(respawned(&state, id));
    }

    #[test]
    fn test_time_runs_out() {
        let registry = MatchRuleRegistry::new([MatchRule::Time]);
        let (mut state, _) = state_with_player(3);
        state.match_state.time = 1;

        assert!(!registry.run(&mut state).ended);
        assert_eq!(state.match_state.time, 0);
        assert!(registry.run(&mut state).ended);
        assert_eq!(state.match_state.progression, ProgressionState::End);
        assert!(!registry.run(&mut state).ended);
    }

    #[test]
    fn test_clock_frozen_outside_game() {
        let registry = MatchRuleRegistry::new([MatchRule::Time]);
        let (mut state, _) = state_with_player(3);
        state.match_state.time = 10;
        state.match_state.progression = ProgressionState::Pause;
        registry.run(&mut state);
        assert_eq!(state.match_state.time, 10);
    }
}
