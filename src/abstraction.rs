//! Hand abstraction for the hold'em game tree.
//!
//! Hands are ranked by Monte Carlo showdown strength against a random hand
//! and split into equal-mass buckets. The solver then works on bucket-vs-
//! bucket showdown shares instead of individual combos.

use crate::card::{mask_of, Card};
use crate::deck::{stream_seed, Deck};
use crate::evaluator::{evaluate, HandRank};
use crate::range::{combo_index, HandClass, ALL_CLASSES, ALL_COMBOS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::Ordering;

pub const DEFAULT_BUCKETS: usize = 8;
pub const DEFAULT_SAMPLES: usize = 20_000;

/// Deals per key never go below these, whatever the sample budget.
const MIN_DEALS_PER_KEY: usize = 12;
const MIN_DEALS_PER_CLASS: usize = 300;

/// Pseudo-observations pulling a postflop strength toward its made-hand
/// percentile.
const PERCENTILE_WEIGHT: f64 = 4.0;

/// Pseudo-observations smoothing each bucket-vs-bucket share toward 1/2.
const MATRIX_SMOOTHING: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AbstractionParams {
    pub buckets: usize,
    /// Total sampled deals, spread evenly over the hand keys.
    pub samples: usize,
    pub seed: u64,
}

impl Default for AbstractionParams {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            samples: DEFAULT_SAMPLES,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Abstraction {
    prior: Vec<f64>,
    share: Vec<Vec<f64>>,
    bucket_strength: Vec<f64>,
    hero_bucket: usize,
    hero_strength: f64,
}

/// A hand key: a hand class preflop, a concrete combo after the flop.
struct Keys {
    weights: Vec<f64>,
    combos: Vec<Vec<[Card; 2]>>,
    hero: usize,
}

impl Keys {
    fn new(hole: [Card; 2], board: &[Card]) -> Self {
        let dead = mask_of(board);
        if board.is_empty() {
            let combos = ALL_CLASSES.iter().map(|c| c.combos()).collect::<Vec<_>>();
            Self {
                weights: combos.iter().map(|c| c.len() as f64).collect(),
                combos,
                hero: HandClass::of(hole[0], hole[1]).index(),
            }
        } else {
            let combos = ALL_COMBOS
                .iter()
                .map(|combo| {
                    if mask_of(combo) & dead == 0 {
                        vec![*combo]
                    } else {
                        Vec::new()
                    }
                })
                .collect::<Vec<_>>();
            Self {
                weights: combos.iter().map(|c| c.len() as f64).collect(),
                combos,
                hero: combo_index(hole[0], hole[1]),
            }
        }
    }

    fn key_of(&self, preflop: bool, hand: [Card; 2]) -> usize {
        if preflop {
            HandClass::of(hand[0], hand[1]).index()
        } else {
            combo_index(hand[0], hand[1])
        }
    }
}

/// Sampled showdowns of one key: `(score, deals, [(opponent key, share)])`.
type KeySamples = (f64, usize, Vec<(usize, f64)>);

impl Abstraction {
    /// Builds the abstraction for the street given by `board`.
    pub fn build(hole: [Card; 2], board: &[Card], params: &AbstractionParams) -> Self {
        let buckets = params.buckets.max(1);
        let preflop = board.is_empty();
        let keys = Keys::new(hole, board);
        let live = keys.weights.iter().filter(|w| **w > 0.0).count().max(1);
        let floor = if preflop {
            MIN_DEALS_PER_CLASS
        } else {
            MIN_DEALS_PER_KEY
        };
        let per_key = (params.samples / live).max(floor);

        let samples = (0..keys.combos.len())
            .into_par_iter()
            .map(|k| sample_key(&keys, k, board, preflop, per_key, params.seed))
            .collect::<Vec<KeySamples>>();

        let strength = if preflop {
            // Laplace smoothing keeps unplayed keys at 1/2
            samples
                .iter()
                .map(|(score, n, _)| (score + 1.0) / (*n as f64 + 2.0))
                .collect::<Vec<_>>()
        } else {
            let pct = made_hand_percentile(&keys, board);
            samples
                .iter()
                .zip(pct.iter())
                .map(|((score, n, _), p)| {
                    (score + PERCENTILE_WEIGHT * p) / (*n as f64 + PERCENTILE_WEIGHT)
                })
                .collect::<Vec<_>>()
        };

        let bucket_of = assign_buckets(&strength, &keys.weights, buckets);

        let total_weight = keys.weights.iter().sum::<f64>();
        let mean_weight = total_weight / live as f64;
        let mut prior = vec![0.0; buckets];
        let mut strength_sum = vec![0.0; buckets];
        for k in 0..keys.weights.len() {
            prior[bucket_of[k]] += keys.weights[k] / total_weight;
            strength_sum[bucket_of[k]] += keys.weights[k] * strength[k];
        }
        let bucket_strength = strength_sum
            .iter()
            .zip(prior.iter())
            .map(|(s, p)| if *p > 0.0 { s / (p * total_weight) } else { 0.5 })
            .collect::<Vec<_>>();

        let mut wins = vec![vec![0.0; buckets]; buckets];
        let mut count = vec![vec![0.0; buckets]; buckets];
        for (k, (_, _, records)) in samples.iter().enumerate() {
            let w = keys.weights[k] / mean_weight;
            for &(o, s) in records {
                let (b1, b2) = (bucket_of[k], bucket_of[o]);
                wins[b1][b2] += w * s;
                count[b1][b2] += w;
                wins[b2][b1] += w * (1.0 - s);
                count[b2][b1] += w;
            }
        }
        let share = (0..buckets)
            .map(|i| {
                (0..buckets)
                    .map(|j| {
                        (wins[i][j] + 0.5 * MATRIX_SMOOTHING) / (count[i][j] + MATRIX_SMOOTHING)
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let hero_bucket = bucket_of[keys.hero];
        let hero_strength = strength[keys.hero];
        log::debug!(
            "abstraction: {} keys, {} deals per key, hero in bucket {} of {} (strength {:.3})",
            live,
            per_key,
            hero_bucket,
            buckets,
            hero_strength
        );

        Self {
            prior,
            share,
            bucket_strength,
            hero_bucket,
            hero_strength,
        }
    }

    /// Builds an abstraction from an explicit prior and share matrix.
    ///
    /// Panics unless `share` is square with `share[i][j] + share[j][i] == 1`.
    pub fn from_matrix(prior: Vec<f64>, share: Vec<Vec<f64>>, hero_bucket: usize) -> Self {
        let n = prior.len();
        assert!(n > 0 && hero_bucket < n, "hero bucket out of range");
        assert!(share.len() == n && share.iter().all(|row| row.len() == n));
        for i in 0..n {
            for j in 0..n {
                assert!(
                    (share[i][j] + share[j][i] - 1.0).abs() < 1e-9,
                    "share matrix is not zero-sum at ({}, {})",
                    i,
                    j
                );
            }
        }
        let total = prior.iter().sum::<f64>();
        let prior = prior.iter().map(|p| p / total).collect::<Vec<_>>();
        let bucket_strength = (0..n)
            .map(|i| (0..n).map(|j| prior[j] * share[i][j]).sum::<f64>())
            .collect::<Vec<_>>();
        let hero_strength = bucket_strength[hero_bucket];
        Self {
            prior,
            share,
            bucket_strength,
            hero_bucket,
            hero_strength,
        }
    }

    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.prior.len()
    }

    /// Probability mass of each bucket.
    #[inline]
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// `share()[i][j]`: pot share of bucket `i` at showdown against bucket `j`.
    #[inline]
    pub fn share(&self) -> &[Vec<f64>] {
        &self.share
    }

    pub fn bucket_strength(&self) -> &[f64] {
        &self.bucket_strength
    }

    #[inline]
    pub fn hero_bucket(&self) -> usize {
        self.hero_bucket
    }

    pub fn hero_strength(&self) -> f64 {
        self.hero_strength
    }
}

fn sample_key(
    keys: &Keys,
    k: usize,
    board: &[Card],
    preflop: bool,
    per_key: usize,
    seed: u64,
) -> KeySamples {
    let combos = &keys.combos[k];
    if combos.is_empty() {
        return (0.0, 0, Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(stream_seed(seed, k as u64));
    let mut score = 0.0;
    let mut records = Vec::with_capacity(per_key);
    let mut cards = [combos[0][0]; 7];
    for _ in 0..per_key {
        let hand = combos[rng.random_range(0..combos.len())];
        let mut dead = hand.to_vec();
        dead.extend_from_slice(board);
        let mut deck = Deck::without(&dead);
        // the deck holds at least 45 cards here
        let opp = [deck.draw(&mut rng), deck.draw(&mut rng)];
        let mut runout = board.to_vec();
        while runout.len() < 5 {
            runout.extend(deck.draw(&mut rng));
        }
        let (opp0, opp1) = match opp {
            [Some(a), Some(b)] => (a, b),
            _ => continue,
        };

        cards[2..].copy_from_slice(&runout);
        cards[..2].copy_from_slice(&hand);
        let mine = evaluate(&cards);
        cards[..2].copy_from_slice(&[opp0, opp1]);
        let theirs = evaluate(&cards);
        let s = match mine.cmp(&theirs) {
            Ordering::Greater => 1.0,
            Ordering::Equal => 0.5,
            Ordering::Less => 0.0,
        };
        score += s;
        records.push((keys.key_of(preflop, [opp0, opp1]), s));
    }
    let n = records.len();
    (score, n, records)
}

/// Weighted percentile of each key's current made hand among all live keys.
fn made_hand_percentile(keys: &Keys, board: &[Card]) -> Vec<f64> {
    let ranks = keys
        .combos
        .iter()
        .map(|combos| {
            combos.first().map(|hand| {
                let mut cards = hand.to_vec();
                cards.extend_from_slice(board);
                evaluate(&cards)
            })
        })
        .collect::<Vec<Option<HandRank>>>();
    let mut sorted = ranks.iter().flatten().copied().collect::<Vec<_>>();
    sorted.sort();
    let n = sorted.len().max(1) as f64;
    ranks
        .iter()
        .map(|rank| match rank {
            Some(rank) => {
                let below = sorted.partition_point(|r| r < rank) as f64;
                let equal = sorted.partition_point(|r| r <= rank) as f64 - below;
                (below + 0.5 * equal) / n
            }
            None => 0.5,
        })
        .collect()
}

/// Equal-mass bucketing of `strength` (weighted by `weights`), weakest first.
fn assign_buckets(strength: &[f64], weights: &[f64], buckets: usize) -> Vec<usize> {
    let mut order = (0..strength.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        strength[a]
            .partial_cmp(&strength[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    let total = weights.iter().sum::<f64>().max(f64::MIN_POSITIVE);
    let mut ret = vec![0; strength.len()];
    let mut cum = 0.0;
    for k in order {
        let mid = cum + 0.5 * weights[k];
        ret[k] = ((mid / total * buckets as f64) as usize).min(buckets - 1);
        cum += weights[k];
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_cards;

    fn hole(s: &str) -> [Card; 2] {
        let cards = parse_cards(s).unwrap();
        [cards[0], cards[1]]
    }

    fn params(seed: u64) -> AbstractionParams {
        AbstractionParams {
            buckets: 8,
            samples: 8_000,
            seed,
        }
    }

    #[test]
    fn prior_is_a_distribution_and_shares_are_zero_sum() {
        let abs = Abstraction::build(hole("AhKd"), &[], &params(1));
        assert_eq!(abs.num_buckets(), 8);
        assert!((abs.prior().iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for p in abs.prior() {
            assert!((p - 0.125).abs() < 0.05, "bucket mass {}", p);
        }
        let share = abs.share();
        for i in 0..8 {
            assert!((share[i][i] - 0.5).abs() < 1e-9);
            for j in 0..8 {
                assert!((share[i][j] + share[j][i] - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn premium_and_trash_land_at_the_extremes() {
        let aces = Abstraction::build(hole("AhAd"), &[], &params(2));
        assert_eq!(aces.hero_bucket(), 7);
        assert!(aces.hero_strength() > 0.75);
        let trash = Abstraction::build(hole("7d2c"), &[], &params(2));
        assert!(trash.hero_bucket() <= 1);
        assert!(trash.hero_strength() < 0.42);
        assert!(trash.share()[7][0] > 0.6);
    }

    #[test]
    fn postflop_sets_are_strong() {
        let board = parse_cards("Qs7h2d").unwrap();
        let set = Abstraction::build(hole("QhQd"), &board, &params(3));
        assert_eq!(set.hero_bucket(), 7);
        let air = Abstraction::build(hole("4c3c"), &board, &params(3));
        assert!(air.hero_bucket() <= 2);
    }

    #[test]
    fn same_seed_same_abstraction() {
        let a = Abstraction::build(hole("Th9h"), &[], &params(5));
        let b = Abstraction::build(hole("Th9h"), &[], &params(5));
        assert_eq!(a.share(), b.share());
        assert_eq!(a.hero_bucket(), b.hero_bucket());
    }

    #[test]
    fn explicit_matrix() {
        let abs = Abstraction::from_matrix(vec![1.0, 1.0], vec![vec![0.5, 0.8], vec![0.2, 0.5]], 1);
        assert_eq!(abs.prior(), &[0.5, 0.5]);
        assert!((abs.hero_strength() - 0.35).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "zero-sum")]
    fn explicit_matrix_must_be_zero_sum() {
        Abstraction::from_matrix(vec![1.0, 1.0], vec![vec![0.5, 0.8], vec![0.5, 0.5]], 0);
    }
}
