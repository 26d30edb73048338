//! Convergence of the CFR trainer on Kuhn poker, whose equilibrium is known
//! in closed form: the first player loses 1/18 per hand.

use poker_gto::cfr::{self, CfrVariant, TrainConfig, TrainResult};
use poker_gto::game_kuhn::KuhnNode;
use rstest::rstest;

const J: usize = 0;
const Q: usize = 1;
const K: usize = 2;

fn train(iterations: usize, variant: CfrVariant) -> TrainResult {
    let config = TrainConfig {
        iterations,
        exploitability_threshold: 0.0,
        check_every: 100,
        variant,
        scale: 1.0,
    };
    cfr::train(KuhnNode::new(), &config)
}

/// Probability of bet/call at `history` holding `card`.
fn aggressive(result: &TrainResult, history: &[u8], card: usize) -> f64 {
    result.strategy[&history.to_vec()][1][card]
}

#[test]
fn game_value_is_minus_one_eighteenth() {
    let result = train(10_000, CfrVariant::Plus);
    assert!((result.ev + 1.0 / 18.0).abs() < 1e-3, "ev {}", result.ev);
    assert!(result.exploitability < 1e-3);
    assert_eq!(result.iterations, 10_000);
    assert!(!result.converged);
}

#[test]
fn second_player_matches_equilibrium() {
    let result = train(10_000, CfrVariant::Plus);

    // facing a bet
    assert!(aggressive(&result, &[1], J) < 0.02);
    assert!((aggressive(&result, &[1], Q) - 1.0 / 3.0).abs() < 0.05);
    assert!(aggressive(&result, &[1], K) > 0.98);

    // after a check
    assert!((aggressive(&result, &[0], J) - 1.0 / 3.0).abs() < 0.05);
    assert!(aggressive(&result, &[0], Q) < 0.02);
    assert!(aggressive(&result, &[0], K) > 0.98);
}

#[test]
fn first_player_bluffs_in_proportion() {
    let result = train(10_000, CfrVariant::Plus);
    let alpha = aggressive(&result, &[], J);
    assert!(alpha <= 1.0 / 3.0 + 0.05);
    assert!((aggressive(&result, &[], K) - 3.0 * alpha).abs() < 0.1);
    assert!(aggressive(&result, &[], Q) < 0.05);

    // check, bet: never call with J, always with K
    assert!(aggressive(&result, &[0, 1], J) < 0.02);
    assert!(aggressive(&result, &[0, 1], K) > 0.98);
}

#[rstest]
#[case(CfrVariant::Plus)]
#[case(CfrVariant::Vanilla)]
fn exploitability_falls_across_checkpoints(#[case] variant: CfrVariant) {
    let result = train(10_000, variant);
    let at = |iter: usize| {
        result
            .history
            .iter()
            .find(|(i, _)| *i == iter)
            .map(|(_, e)| *e)
            .unwrap()
    };
    assert_eq!(result.history.len(), 100);
    for pair in result.history.windows(2) {
        assert!(
            pair[1].1 <= pair[0].1,
            "exploitability rose from {:?} to {:?}",
            pair[0],
            pair[1]
        );
    }
    assert!(at(1_000) < at(100));
    assert!(at(10_000) < at(1_000));
    assert!(at(10_000) < 0.01);
    assert_eq!(result.exploitability, at(10_000));
    assert!(result.history.iter().any(|&(i, _)| i == result.best_iteration));
}

#[test]
fn threshold_stops_training_early() {
    let config = TrainConfig {
        iterations: 100_000,
        exploitability_threshold: 0.01,
        check_every: 50,
        ..TrainConfig::default()
    };
    let result = cfr::train(KuhnNode::new(), &config);
    assert!(result.converged);
    assert!(result.exploitability < 0.01);
    assert!(result.iterations < 100_000);
    assert_eq!(result.iterations % 50, 0);
}
