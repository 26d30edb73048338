use crate::card::{first_duplicate, mask_of, Card};
use crate::deck::{stream_seed, Deck};
use crate::error::EquityError;
use crate::evaluator::evaluate;
use crate::range::{HandClass, Range};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub const DEFAULT_TRIALS: usize = 5_000;

/// Trials per parallel work unit. Fixed so that results do not depend on the
/// number of worker threads.
const CHUNK_SIZE: usize = 256;

/// Attempts to draw an opponent hand from a range before giving up.
const MAX_RANGE_RETRIES: usize = 1_000;

/// Outcome of a Monte Carlo equity estimate. Percentages are in `[0, 100]`,
/// `equity` is the fraction of pots won with ties split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityResult {
    pub win: f64,
    pub tie: f64,
    pub lose: f64,
    pub equity: f64,
    pub trials: usize,
    pub opponents: usize,
}

impl EquityResult {
    fn from_tally(tally: &Tally, opponents: usize) -> Self {
        let n = tally.trials as f64;
        Self {
            win: 100.0 * tally.win as f64 / n,
            tie: 100.0 * tally.tie as f64 / n,
            lose: 100.0 * tally.lose as f64 / n,
            equity: tally.share / n,
            trials: tally.trials,
            opponents,
        }
    }

    /// Half-width of the 95% confidence interval of `equity`.
    pub fn margin_of_error(&self) -> f64 {
        let p = self.equity.clamp(0.0, 1.0);
        1.96 * (p * (1.0 - p) / self.trials as f64).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    win: u64,
    tie: u64,
    lose: u64,
    share: f64,
    trials: usize,
}

impl Tally {
    fn merge(mut self, other: &Tally) -> Tally {
        self.win += other.win;
        self.tie += other.tie;
        self.lose += other.lose;
        self.share += other.share;
        self.trials += other.trials;
        self
    }
}

/// Hand part of a cache key: the hand class preflop, the exact cards after.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandKey {
    Class(HandClass),
    Exact([Card; 2]),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EquityKey {
    hand: HandKey,
    board: Vec<Card>,
    opponents: usize,
    trials: usize,
}

impl EquityKey {
    pub fn new(hero: [Card; 2], board: &[Card], opponents: usize, trials: usize) -> Self {
        let hand = if board.is_empty() {
            HandKey::Class(HandClass::of(hero[0], hero[1]))
        } else {
            let mut cards = hero;
            cards.sort();
            HandKey::Exact(cards)
        };
        let mut board = board.to_vec();
        board.sort();
        Self {
            hand,
            board,
            opponents,
            trials,
        }
    }
}

/// Process-wide read-through store of equity results. Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct EquityCache {
    entries: Arc<RwLock<HashMap<EquityKey, EquityResult>>>,
}

impl EquityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EquityKey) -> Option<EquityResult> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).copied()
    }

    pub fn insert(&self, key: EquityKey, result: EquityResult) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(result);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Monte Carlo equity estimator with an optional shared cache.
#[derive(Clone, Debug, Default)]
pub struct EquityCalculator {
    cache: Option<EquityCache>,
}

impl EquityCalculator {
    pub fn new() -> Self {
        Self { cache: None }
    }

    pub fn with_cache(cache: EquityCache) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn cache(&self) -> Option<&EquityCache> {
        self.cache.as_ref()
    }

    /// Estimates hero's equity against `opponents` random hands.
    ///
    /// Results are cached per (hand, board, opponents, trials); a cache hit
    /// returns the stored result regardless of `seed`.
    pub fn estimate_equity(
        &self,
        hero: [Card; 2],
        board: &[Card],
        opponents: usize,
        trials: usize,
        seed: u64,
    ) -> Result<EquityResult, EquityError> {
        validate(hero, board, opponents, trials)?;

        let key = EquityKey::new(hero, board, opponents, trials);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                log::debug!("equity cache hit for {:?}", key.hand);
                return Ok(hit);
            }
        }

        let mut known = hero.to_vec();
        known.extend_from_slice(board);
        let base = Deck::without(&known);
        let tally = run_chunks(trials, seed, |rng, n| {
            let mut tally = Tally::default();
            let mut hands = vec![[hero[0], hero[0]]; opponents];
            for _ in 0..n {
                let mut deck = base.clone();
                for hand in hands.iter_mut() {
                    *hand = [draw(&mut deck, rng)?, draw(&mut deck, rng)?];
                }
                let runout = complete_board(board, &mut deck, rng)?;
                record(&mut tally, hero, &hands, &runout);
            }
            Ok(tally)
        })?;

        let result = EquityResult::from_tally(&tally, opponents);
        if let Some(cache) = &self.cache {
            cache.insert(key, result);
        }
        Ok(result)
    }

    /// Estimates hero's equity when every opponent holds a hand from `range`.
    /// Range queries are not cached.
    pub fn estimate_equity_vs_range(
        &self,
        hero: [Card; 2],
        board: &[Card],
        range: &Range,
        opponents: usize,
        trials: usize,
        seed: u64,
    ) -> Result<EquityResult, EquityError> {
        validate(hero, board, opponents, trials)?;

        let mut known = hero.to_vec();
        known.extend_from_slice(board);
        let combos = range.combos(mask_of(&known));
        if combos.is_empty() {
            return Err(EquityError::RangeExhausted);
        }

        let tally = run_chunks(trials, seed, |rng, n| {
            let mut tally = Tally::default();
            let mut hands = vec![[hero[0], hero[0]]; opponents];
            for _ in 0..n {
                let mut used = 0u64;
                for hand in hands.iter_mut() {
                    *hand = sample_disjoint(&combos, used, rng)?;
                    used |= hand[0].mask() | hand[1].mask();
                }
                let mut dead = known.clone();
                dead.extend(hands.iter().flatten());
                let mut deck = Deck::without(&dead);
                let runout = complete_board(board, &mut deck, rng)?;
                record(&mut tally, hero, &hands, &runout);
            }
            Ok(tally)
        })?;

        Ok(EquityResult::from_tally(&tally, opponents))
    }
}

fn validate(
    hero: [Card; 2],
    board: &[Card],
    opponents: usize,
    trials: usize,
) -> Result<(), EquityError> {
    if !matches!(board.len(), 0 | 3 | 4 | 5) {
        return Err(EquityError::BoardLength(board.len()));
    }
    let mut known = hero.to_vec();
    known.extend_from_slice(board);
    if let Some(card) = first_duplicate(&known) {
        return Err(EquityError::DuplicateCard(card));
    }
    if opponents == 0 {
        return Err(EquityError::NoOpponents);
    }
    let remaining = 52 - known.len();
    if 2 * opponents + (5 - board.len()) > remaining {
        return Err(EquityError::TooManyOpponents(opponents));
    }
    if trials == 0 {
        return Err(EquityError::ZeroTrials);
    }
    Ok(())
}

/// Splits `trials` into fixed chunks, runs `f` on each with its own seeded
/// generator and sums the tallies in chunk order.
fn run_chunks<F>(trials: usize, seed: u64, f: F) -> Result<Tally, EquityError>
where
    F: Fn(&mut StdRng, usize) -> Result<Tally, EquityError> + Sync,
{
    let num_chunks = (trials + CHUNK_SIZE - 1) / CHUNK_SIZE;
    let tallies = (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let n = CHUNK_SIZE.min(trials - chunk * CHUNK_SIZE);
            let mut rng = StdRng::seed_from_u64(stream_seed(seed, chunk as u64));
            let mut tally = f(&mut rng, n)?;
            tally.trials = n;
            Ok(tally)
        })
        .collect::<Result<Vec<_>, EquityError>>()?;
    Ok(tallies
        .iter()
        .fold(Tally::default(), |acc, t| acc.merge(t)))
}

#[inline]
fn draw(deck: &mut Deck, rng: &mut StdRng) -> Result<Card, EquityError> {
    deck.draw(rng).ok_or(EquityError::TooManyOpponents(0))
}

fn complete_board(
    board: &[Card],
    deck: &mut Deck,
    rng: &mut StdRng,
) -> Result<[Card; 5], EquityError> {
    let mut runout = [Card::from_index(0); 5];
    for (i, slot) in runout.iter_mut().enumerate() {
        *slot = match board.get(i) {
            Some(card) => *card,
            None => draw(deck, rng)?,
        };
    }
    Ok(runout)
}

fn sample_disjoint(
    combos: &[[Card; 2]],
    used: u64,
    rng: &mut StdRng,
) -> Result<[Card; 2], EquityError> {
    for _ in 0..MAX_RANGE_RETRIES {
        let combo = combos[rng.random_range(0..combos.len())];
        if (combo[0].mask() | combo[1].mask()) & used == 0 {
            return Ok(combo);
        }
    }
    Err(EquityError::RangeExhausted)
}

fn record(tally: &mut Tally, hero: [Card; 2], opponents: &[[Card; 2]], runout: &[Card; 5]) {
    let mut cards = [runout[0]; 7];
    cards[2..].copy_from_slice(runout);

    cards[..2].copy_from_slice(&hero);
    let hero_rank = evaluate(&cards);

    let mut best_other = None;
    let mut sharing = 0;
    for hand in opponents {
        cards[..2].copy_from_slice(hand);
        let rank = evaluate(&cards);
        if Some(rank) > best_other {
            best_other = Some(rank);
            sharing = 1;
        } else if Some(rank) == best_other {
            sharing += 1;
        }
    }

    match best_other.map(|best| hero_rank.cmp(&best)) {
        Some(std::cmp::Ordering::Less) => tally.lose += 1,
        Some(std::cmp::Ordering::Equal) => {
            tally.tie += 1;
            tally.share += 1.0 / (sharing + 1) as f64;
        }
        _ => {
            tally.win += 1;
            tally.share += 1.0;
        }
    }
}
