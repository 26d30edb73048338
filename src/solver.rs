use crate::abstraction::{Abstraction, AbstractionParams, DEFAULT_BUCKETS, DEFAULT_SAMPLES};
use crate::action::Action;
use crate::cfr::{self, Arena, CfrVariant, TrainConfig};
use crate::error::SolverError;
use crate::game_holdem::HoldemGame;
use crate::game_state::{GameState, GameStateRequest};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::convert::TryFrom;
use std::time::{Duration, Instant};

pub const DEFAULT_ITERATIONS: usize = 1_000;
pub const DEFAULT_THRESHOLD: f64 = 0.001;
pub const DEFAULT_CHECK_EVERY: usize = 100;

/// Seed used for the abstraction when the state carries none.
const DEFAULT_SEED: u64 = 0x5EED;

#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    pub buckets: usize,
    pub abstraction_samples: usize,
    pub check_every: usize,
    pub variant: CfrVariant,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            abstraction_samples: DEFAULT_SAMPLES,
            check_every: DEFAULT_CHECK_EVERY,
            variant: CfrVariant::Plus,
        }
    }
}

/// One action of hero's strategy at the decision node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategyEntry {
    pub action: Action,
    pub frequency: f64,
    /// Chips the action puts in.
    pub amount: f64,
}

/// Hero's mixed strategy at the decision node, in tree order. Frequencies
/// sum to one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyProfile {
    entries: Vec<StrategyEntry>,
}

impl StrategyProfile {
    pub fn new(entries: Vec<StrategyEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[StrategyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frequency of `action`, zero when it is not available.
    pub fn frequency(&self, action: Action) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.frequency)
            .sum()
    }

    /// Combined frequency of every bet, raise and all-in.
    pub fn aggressive_frequency(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.action.is_aggressive())
            .map(|e| e.frequency)
            .sum()
    }

    pub fn total_frequency(&self) -> f64 {
        self.entries.iter().map(|e| e.frequency).sum()
    }
}

impl Serialize for StrategyProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.action.label(), &entry.frequency)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug)]
pub struct SolverResult {
    pub strategy: StrategyProfile,
    /// Exploitability as a fraction of the pot.
    pub exploitability: f64,
    pub iterations: usize,
    pub convergence_time: Duration,
    pub converged: bool,
    pub hero_bucket: usize,
    /// Hero's sampled showdown strength against a random hand.
    pub hero_strength: f64,
    /// Hero's value of the round in chips, relative to half the dead pot.
    pub game_value: f64,
    pub history: Vec<(usize, f64)>,
}

/// CFR solver for a single hold'em decision. Every call builds its own
/// abstraction and tree.
#[derive(Clone, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn solve(
        &self,
        state: &GameState,
        iterations: usize,
        exploitability_threshold: f64,
    ) -> Result<SolverResult, SolverError> {
        if iterations == 0 {
            return Err(SolverError::Budget("iteration budget must be positive".into()));
        }
        if !(exploitability_threshold >= 0.0) {
            return Err(SolverError::Budget(format!(
                "exploitability threshold must be non-negative, found {}",
                exploitability_threshold
            )));
        }
        let started = Instant::now();

        let params = AbstractionParams {
            buckets: self.config.buckets,
            samples: self.config.abstraction_samples,
            seed: state.seed().unwrap_or(DEFAULT_SEED),
        };
        let abstraction = Abstraction::build(state.hole(), state.board(), &params);
        let hero_bucket = abstraction.hero_bucket();
        let hero_strength = abstraction.hero_strength();
        let game = HoldemGame::from_state(state, abstraction);
        let mut arena = Arena::build(game.root());

        let config = TrainConfig {
            iterations,
            exploitability_threshold,
            check_every: self.config.check_every,
            variant: self.config.variant,
            scale: state.pot(),
        };
        let trained = cfr::train_arena(&mut arena, &config);

        // the root, or the node after the observed bet, always decides
        let key = game.hero_decision();
        let node = arena.get(&key).expect("hero decision node in the tree");
        let rows = trained
            .strategy
            .get(&key)
            .expect("strategy for the hero decision node");
        let entries = node
            .legal_actions()
            .into_iter()
            .enumerate()
            .map(|(i, action)| StrategyEntry {
                action,
                frequency: rows[i][hero_bucket],
                amount: node.amount(i),
            })
            .collect::<Vec<_>>();

        let prior = game.abstraction().prior()[hero_bucket];
        let game_value = if prior > 0.0 {
            trained.values[hero_bucket] / prior
        } else {
            0.0
        };
        let convergence_time = started.elapsed();

        log::info!(
            "solved {} decision in {} iterations ({} ms): exploitability {:.4} of the pot",
            state.street(),
            trained.iterations,
            convergence_time.as_millis(),
            trained.exploitability
        );
        if !trained.converged {
            log::warn!(
                "solver stopped at the iteration cap with exploitability {:.4} above {}",
                trained.exploitability,
                exploitability_threshold
            );
        }

        Ok(SolverResult {
            strategy: StrategyProfile::new(entries),
            exploitability: trained.exploitability,
            iterations: trained.iterations,
            convergence_time,
            converged: trained.converged,
            hero_bucket,
            hero_strength,
            game_value,
            history: trained.history,
        })
    }

    /// Validates a wire request, then solves it.
    pub fn solve_request(
        &self,
        request: GameStateRequest,
        iterations: usize,
        exploitability_threshold: f64,
    ) -> Result<SolverResult, SolverError> {
        let state = GameState::try_from(request)?;
        self.solve(&state, iterations, exploitability_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_cards;
    use crate::error::ValidationError;
    use crate::game_state::{Position, Street};

    fn quick() -> Solver {
        Solver::new(SolverConfig {
            abstraction_samples: 4_000,
            ..SolverConfig::default()
        })
    }

    fn flop_state() -> GameState {
        let hole = parse_cards("AsAd").unwrap();
        let board = parse_cards("Ah7c2d").unwrap();
        GameState::new(&hole, &board, 10.0, 0.0, 90.0, Position::Button, Street::Flop, 1)
            .unwrap()
            .with_seed(4)
    }

    #[test]
    fn strategy_is_a_distribution_over_legal_actions() {
        let result = quick().solve(&flop_state(), 200, 0.0).unwrap();
        let strategy = &result.strategy;
        assert_eq!(strategy.entries()[0].action, Action::Check);
        assert_eq!(strategy.entries().last().unwrap().action, Action::AllIn);
        assert!((strategy.total_frequency() - 1.0).abs() < 1e-9);
        assert!(strategy.entries().iter().all(|e| (0.0..=1.0).contains(&e.frequency)));
        assert_eq!(result.iterations, 200);
        assert!(!result.converged);
        assert_eq!(result.history.len(), 2);
    }

    #[test]
    fn facing_a_bet_reads_the_node_after_it() {
        let hole = parse_cards("QhQd").unwrap();
        let board = parse_cards("Js7h2c").unwrap();
        let state = GameState::new(&hole, &board, 16.0, 4.0, 80.0, Position::Cutoff, Street::Flop, 1)
            .unwrap()
            .with_seed(9);
        let result = quick().solve(&state, 100, 0.0).unwrap();
        let entries = result.strategy.entries();
        assert_eq!(entries[0].action, Action::Fold);
        assert_eq!(entries[1].action, Action::Call);
        assert!((entries[1].amount - 4.0).abs() < 1e-9);
        assert!((result.strategy.total_frequency() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exploitability_shrinks_with_more_iterations() {
        let short = quick().solve(&flop_state(), 20, 0.0).unwrap();
        let long = quick().solve(&flop_state(), 600, 0.0).unwrap();
        assert!(long.exploitability <= short.exploitability);
        assert!(long.exploitability < 0.05);
    }

    #[test]
    fn loose_threshold_stops_early() {
        let result = quick().solve(&flop_state(), 5_000, 0.5).unwrap();
        assert!(result.converged);
        assert!(result.iterations < 5_000);
    }

    #[test]
    fn same_seed_same_strategy() {
        let a = quick().solve(&flop_state(), 100, 0.0).unwrap();
        let b = quick().solve(&flop_state(), 100, 0.0).unwrap();
        assert_eq!(a.strategy, b.strategy);
        assert_eq!(a.exploitability, b.exploitability);
    }

    #[test]
    fn serializes_as_label_map() {
        let profile = StrategyProfile::new(vec![
            StrategyEntry {
                action: Action::Fold,
                frequency: 0.25,
                amount: 0.0,
            },
            StrategyEntry {
                action: Action::AllIn,
                frequency: 0.75,
                amount: 50.0,
            },
        ]);
        assert_eq!(
            serde_json::to_string(&profile).unwrap(),
            r#"{"fold":0.25,"all_in":0.75}"#
        );
        assert_eq!(profile.aggressive_frequency(), 0.75);
    }

    #[test]
    fn rejects_zero_budget_and_bad_requests() {
        let err = quick().solve(&flop_state(), 0, 0.001).unwrap_err();
        assert!(matches!(err, SolverError::Budget(_)));

        let request = GameStateRequest {
            hole_cards: vec!["Ah".into(), "Ah".into()],
            board_cards: Vec::new(),
            pot_size: 1.5,
            amount_to_call: 0.0,
            effective_stack: 100.0,
            position: "BTN".into(),
            street: "preflop".into(),
            opponent_count: 1,
            in_position: None,
            iterations: None,
            trials: None,
            seed: None,
        };
        let err = quick().solve_request(request, 10, 0.001).unwrap_err();
        assert!(matches!(
            err,
            SolverError::InvalidState(ValidationError::DuplicateCard(_))
        ));
    }
}
