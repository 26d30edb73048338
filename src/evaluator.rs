use crate::card::{first_duplicate, Card};
use std::fmt;

/// Hand categories in increasing strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::HighCard,
        Category::Pair,
        Category::TwoPair,
        Category::ThreeOfAKind,
        Category::Straight,
        Category::Flush,
        Category::FullHouse,
        Category::FourOfAKind,
        Category::StraightFlush,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Category::HighCard => "high card",
            Category::Pair => "pair",
            Category::TwoPair => "two pair",
            Category::ThreeOfAKind => "three of a kind",
            Category::Straight => "straight",
            Category::Flush => "flush",
            Category::FullHouse => "full house",
            Category::FourOfAKind => "four of a kind",
            Category::StraightFlush => "straight flush",
        };
        f.write_str(name)
    }
}

/// Strength of a five-card hand.
///
/// Packed as `category << 20 | r0 << 16 | r1 << 12 | r2 << 8 | r3 << 4 | r4`
/// where `r0..r4` are the tiebreak ranks in significance order, so the
/// derived integer ordering is the poker ordering and equal hands compare
/// exactly equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandRank(u32);

impl HandRank {
    #[inline]
    fn new(category: Category, ranks: &[u8]) -> Self {
        let mut packed = (category as u32) << 20;
        for (i, &rank) in ranks.iter().take(5).enumerate() {
            packed |= (rank as u32) << (16 - 4 * i);
        }
        Self(packed)
    }

    #[inline]
    pub fn category(&self) -> Category {
        Category::ALL[(self.0 >> 20) as usize]
    }

    /// Tiebreak ranks in significance order (zeros for unused slots).
    pub fn tiebreaks(&self) -> [u8; 5] {
        let mut ranks = [0u8; 5];
        for (i, rank) in ranks.iter_mut().enumerate() {
            *rank = ((self.0 >> (16 - 4 * i)) & 0xF) as u8;
        }
        ranks
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.category())?;
        let ranks = self
            .tiebreaks()
            .iter()
            .filter(|&&r| r >= 2)
            .map(|&r| crate::card::RANK_CHARS[(r - 2) as usize])
            .collect::<String>();
        write!(f, " ({})", ranks)
    }
}

/// Scores the best five-card hand among `cards`.
///
/// Panics unless `cards` holds 5 to 7 distinct cards.
pub fn evaluate(cards: &[Card]) -> HandRank {
    let n = cards.len();
    assert!(
        (5..=7).contains(&n),
        "evaluator needs 5 to 7 cards, got {}",
        n
    );
    if let Some(card) = first_duplicate(cards) {
        panic!("evaluator got duplicate card {}", card);
    }
    if n == 5 {
        return evaluate_five(&[cards[0], cards[1], cards[2], cards[3], cards[4]]);
    }
    let mut best = HandRank(0);
    let mut five = [cards[0]; 5];
    for subset in 0u8..(1 << n) {
        if subset.count_ones() != 5 {
            continue;
        }
        let mut k = 0;
        for (i, card) in cards.iter().enumerate() {
            if subset & (1 << i) != 0 {
                five[k] = *card;
                k += 1;
            }
        }
        best = best.max(evaluate_five(&five));
    }
    best
}

/// Indices of every hand tied for the best rank. More than one index means a
/// split pot.
pub fn showdown(ranks: &[HandRank]) -> Vec<usize> {
    match ranks.iter().max() {
        Some(best) => ranks
            .iter()
            .enumerate()
            .filter(|(_, r)| *r == best)
            .map(|(i, _)| i)
            .collect(),
        None => Vec::new(),
    }
}

fn evaluate_five(cards: &[Card; 5]) -> HandRank {
    let mut counts = [0u8; 15];
    let mut bits = 0u16;
    for card in cards {
        counts[card.rank() as usize] += 1;
        bits |= 1 << card.rank();
    }
    let flush = cards.iter().all(|c| c.suit() == cards[0].suit());
    let straight = straight_high(bits);

    // ranks grouped by multiplicity, larger groups first, then higher ranks
    let mut groups = [(0u8, 0u8); 5];
    let mut len = 0;
    for rank in (2..=14u8).rev() {
        if counts[rank as usize] > 0 {
            groups[len] = (counts[rank as usize], rank);
            len += 1;
        }
    }
    let groups = &mut groups[..len];
    groups.sort_by(|a, b| b.cmp(a));
    let mut ranks = [0u8; 5];
    for (slot, (_, rank)) in ranks.iter_mut().zip(groups.iter()) {
        *slot = *rank;
    }

    match (straight, flush, groups[0].0, groups.get(1).map(|g| g.0)) {
        (Some(high), true, _, _) => HandRank::new(Category::StraightFlush, &[high]),
        (_, _, 4, _) => HandRank::new(Category::FourOfAKind, &ranks[..2]),
        (_, _, 3, Some(2)) => HandRank::new(Category::FullHouse, &ranks[..2]),
        (_, true, _, _) => HandRank::new(Category::Flush, &ranks),
        (Some(high), _, _, _) => HandRank::new(Category::Straight, &[high]),
        (_, _, 3, _) => HandRank::new(Category::ThreeOfAKind, &ranks[..3]),
        (_, _, 2, Some(2)) => HandRank::new(Category::TwoPair, &ranks[..3]),
        (_, _, 2, _) => HandRank::new(Category::Pair, &ranks[..4]),
        _ => HandRank::new(Category::HighCard, &ranks),
    }
}

/// High card of the straight contained in `bits`, ace-low wheel included.
#[inline]
fn straight_high(bits: u16) -> Option<u8> {
    const WHEEL: u16 = (1 << 14) | (1 << 2) | (1 << 3) | (1 << 4) | (1 << 5);
    for high in (6..=14u8).rev() {
        let run = 0b11111 << (high - 4);
        if bits & run == run {
            return Some(high);
        }
    }
    if bits & WHEEL == WHEEL {
        Some(5)
    } else {
        None
    }
}
