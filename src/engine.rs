use crate::config::EngineConfig;
use crate::equity::{EquityCache, EquityCalculator, EquityResult};
use crate::error::EngineError;
use crate::game_state::{GameState, GameStateRequest};
use crate::recommend::{implied_pot_odds, recommend_with_cutoff, Alternative, RecommendationSet};
use crate::solver::{Solver, StrategyProfile};
use rayon::prelude::*;
use serde::Serialize;
use std::convert::TryFrom;

/// Everything computed for one game state.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub equity: EquityResult,
    pub strategy: StrategyProfile,
    pub exploitability: f64,
    pub iterations: usize,
    pub convergence_time_ms: u64,
    pub converged: bool,
    pub recommendations: RecommendationSet,
    /// Every other action against the top recommendation.
    pub alternatives: Vec<Alternative>,
    /// Equity needed to call at the current price.
    pub pot_odds: f64,
    /// Equity needed to call once later winnings are counted.
    pub implied_odds: f64,
    /// Sampled showdown strength against a random hand.
    pub hand_strength: f64,
    /// EV of the top recommendation, in chips.
    pub expected_value: f64,
    /// Seed the analysis ran with; replaying it reproduces the output.
    pub seed: u64,
}

/// Outcome of one state in a batch.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItem {
    Solved(Box<Analysis>),
    Failed { error: String },
}

impl BatchItem {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            BatchItem::Solved(analysis) => Some(analysis),
            BatchItem::Failed { .. } => None,
        }
    }
}

/// Analyses of many states, in input order, with aggregate convergence.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnalysis {
    pub items: Vec<BatchItem>,
    pub total: usize,
    pub completed: usize,
    pub converged: usize,
    /// Mean of `1 - exploitability` over completed states.
    pub average_convergence_rate: f64,
    pub mean_exploitability: f64,
}

impl BatchAnalysis {
    fn new(items: Vec<BatchItem>) -> Self {
        let solved = items
            .iter()
            .filter_map(BatchItem::analysis)
            .collect::<Vec<_>>();
        let completed = solved.len();
        let mean = |f: &dyn Fn(&Analysis) -> f64| {
            if completed > 0 {
                solved.iter().map(|a| f(a)).sum::<f64>() / completed as f64
            } else {
                0.0
            }
        };
        let average_convergence_rate = mean(&|a| (1.0 - a.exploitability).clamp(0.0, 1.0));
        let mean_exploitability = mean(&|a| a.exploitability);
        Self {
            total: items.len(),
            completed,
            converged: solved.iter().filter(|a| a.converged).count(),
            average_convergence_rate,
            mean_exploitability,
            items,
        }
    }
}

/// Runs the equity estimate and the solver side by side and merges them
/// into recommendations.
pub struct Engine {
    config: EngineConfig,
    equity: EquityCalculator,
    solver: Solver,
}

impl Engine {
    /// An engine with a private equity cache.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_cache(config, EquityCache::new())
    }

    /// An engine sharing `cache` with other engines.
    pub fn with_cache(config: EngineConfig, cache: EquityCache) -> Self {
        let solver = Solver::new(config.solver_config());
        Self {
            config,
            equity: EquityCalculator::with_cache(cache),
            solver,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze_request(&self, request: GameStateRequest) -> Result<Analysis, EngineError> {
        let state = GameState::try_from(request)?;
        self.analyze(&state)
    }

    pub fn analyze(&self, state: &GameState) -> Result<Analysis, EngineError> {
        let config = &self.config;
        let seed = state.seed().unwrap_or_else(rand::random);
        let iterations = clamp_budget(
            "iteration",
            state.iterations().unwrap_or(config.iterations),
            config.max_iterations,
        );
        let trials = clamp_budget(
            "trial",
            state.trials().unwrap_or(config.trials),
            config.max_trials,
        );
        log::debug!(
            "analyzing {} {:?} on {:?}: {} iterations, {} trials, seed {}",
            state.position(),
            state.hole(),
            state.board(),
            iterations,
            trials,
            seed
        );

        let seeded = state.clone().with_seed(seed);
        let (equity, solved) = rayon::join(
            || {
                self.equity.estimate_equity(
                    state.hole(),
                    state.board(),
                    state.opponents(),
                    trials,
                    seed,
                )
            },
            || {
                self.solver
                    .solve(&seeded, iterations, config.exploitability_threshold)
            },
        );
        let equity = equity?;
        let solved = solved?;

        let recommendations =
            recommend_with_cutoff(state, &equity, &solved, config.frequency_cutoff);
        let expected_value = recommendations.best().map_or(0.0, |r| r.ev);

        Ok(Analysis {
            equity,
            strategy: solved.strategy,
            exploitability: solved.exploitability,
            iterations: solved.iterations,
            convergence_time_ms: solved.convergence_time.as_millis() as u64,
            converged: solved.converged,
            alternatives: recommendations.alternatives(),
            recommendations,
            pot_odds: state.pot_odds(),
            implied_odds: implied_pot_odds(state),
            hand_strength: solved.hero_strength,
            expected_value,
            seed,
        })
    }

    /// Analyzes every state in parallel. A failing state is reported in
    /// place and does not stop the others.
    pub fn analyze_batch(&self, states: &[GameState]) -> BatchAnalysis {
        let items = states
            .par_iter()
            .map(|state| match self.analyze(state) {
                Ok(analysis) => BatchItem::Solved(Box::new(analysis)),
                Err(err) => {
                    log::warn!("batch state {} {:?} failed: {}", state.position(), state.hole(), err);
                    BatchItem::Failed {
                        error: err.to_string(),
                    }
                }
            })
            .collect::<Vec<_>>();
        let batch = BatchAnalysis::new(items);
        log::info!(
            "batch of {}: {} completed, {} converged, mean exploitability {:.4}",
            batch.total,
            batch.completed,
            batch.converged,
            batch.mean_exploitability
        );
        batch
    }
}

fn clamp_budget(name: &str, requested: usize, max: usize) -> usize {
    if requested > max {
        log::warn!("{} budget {} clamped to {}", name, requested, max);
        max
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_cards;
    use crate::error::ValidationError;
    use crate::game_state::{Position, Street};

    fn config() -> EngineConfig {
        EngineConfig {
            iterations: 150,
            trials: 1_000,
            max_iterations: 200,
            max_trials: 2_000,
            abstraction_samples: 4_000,
            ..EngineConfig::default()
        }
    }

    fn request() -> GameStateRequest {
        serde_json::from_str(
            r#"{
                "holeCards": ["Qh", "Qd"],
                "boardCards": ["Js", "7h", "2c"],
                "potSize": 12,
                "amountToCall": 4,
                "effectiveStack": 80,
                "position": "CO",
                "street": "flop",
                "seed": 17
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn budgets_are_clamped() {
        let mut req = request();
        req.iterations = Some(10_000);
        req.trials = Some(1_000_000);
        let analysis = Engine::new(config()).analyze_request(req).unwrap();
        assert!(analysis.iterations <= 200);
        assert_eq!(analysis.equity.trials, 2_000);
    }

    #[test]
    fn output_is_camel_case_json() {
        let analysis = Engine::new(config()).analyze_request(request()).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        for key in [
            "equity",
            "strategy",
            "exploitability",
            "iterations",
            "convergenceTimeMs",
            "converged",
            "recommendations",
            "alternatives",
            "potOdds",
            "impliedOdds",
            "handStrength",
            "expectedValue",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json["strategy"].get("fold").is_some());
        assert!(json["equity"].get("win").is_some());
        assert_eq!(analysis.seed, 17);
    }

    #[test]
    fn decision_metrics_accompany_the_strategy() {
        let analysis = Engine::new(config()).analyze_request(request()).unwrap();
        // 4 to call into 12
        assert!((analysis.pot_odds - 4.0 / 16.0).abs() < 1e-12);
        assert!((analysis.implied_odds - 4.0 / 18.0).abs() < 1e-12);
        assert!(analysis.hand_strength > 0.6, "QQ on J72: {}", analysis.hand_strength);

        let best = analysis.recommendations.best().unwrap();
        assert_eq!(analysis.expected_value, best.ev);
        assert_eq!(analysis.alternatives.len(), analysis.strategy.len() - 1);
        assert!(analysis.alternatives.iter().all(|a| a.action != best.action));
    }

    #[test]
    fn batch_keeps_input_order_and_aggregates() {
        let states = ["QhQd", "7s2d", "AcKc"]
            .iter()
            .enumerate()
            .map(|(i, hole)| {
                let hole = parse_cards(hole).unwrap();
                let board = parse_cards("Js7h2c").unwrap();
                GameState::new(&hole, &board, 12.0, 4.0, 80.0, Position::Cutoff, Street::Flop, 1)
                    .unwrap()
                    .with_seed(i as u64)
            })
            .collect::<Vec<_>>();
        let batch = Engine::new(config()).analyze_batch(&states);
        assert_eq!(batch.total, 3);
        assert_eq!(batch.completed, 3);
        for (item, seed) in batch.items.iter().zip(0..) {
            assert_eq!(item.analysis().unwrap().seed, seed);
        }
        let mean = batch
            .items
            .iter()
            .map(|i| 1.0 - i.analysis().unwrap().exploitability)
            .sum::<f64>()
            / 3.0;
        assert!((batch.average_convergence_rate - mean.clamp(0.0, 1.0)).abs() < 1e-12);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["items"][0]["status"], "solved");
        assert!(json["items"][0].get("strategy").is_some());
        assert!(json.get("averageConvergenceRate").is_some());
    }

    #[test]
    fn batch_reports_failures_in_place() {
        let engine = Engine::new(EngineConfig {
            exploitability_threshold: -1.0,
            ..config()
        });
        let hole = parse_cards("QhQd").unwrap();
        let state =
            GameState::new(&hole, &[], 3.0, 1.0, 50.0, Position::Button, Street::Preflop, 1).unwrap();
        let batch = engine.analyze_batch(&[state]);
        assert_eq!(batch.completed, 0);
        assert_eq!(batch.average_convergence_rate, 0.0);
        assert!(matches!(&batch.items[0], BatchItem::Failed { error } if error.contains("threshold")));
    }

    #[test]
    fn empty_pot_is_rejected() {
        let mut req = request();
        req.pot_size = 0.0;
        req.amount_to_call = 0.0;
        let err = Engine::new(config()).analyze_request(req).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NonPositivePot(_))
        ));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let mut req = request();
        req.board_cards.pop();
        let err = Engine::new(config()).analyze_request(req).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::BoardMismatch { .. })
        ));
    }

    #[test]
    fn engines_share_an_injected_cache() {
        let cache = EquityCache::new();
        let a = Engine::with_cache(config(), cache.clone());
        let b = Engine::with_cache(config(), cache.clone());
        a.analyze_request(request()).unwrap();
        assert_eq!(cache.len(), 1);
        b.analyze_request(request()).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
