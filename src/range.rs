use crate::card::{Card, Suit, RANK_CHARS};
use crate::error::RangeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Number of two-card combos in a deck.
pub const NUM_COMBOS: usize = 52 * 51 / 2;

/// Number of canonical preflop hands.
pub const NUM_CLASSES: usize = 13 * 13;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([2-9TJQKA])([2-9TJQKA])([SO])?(\+)?$").unwrap());

static SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([2-9TJQKA])([2-9TJQKA])([SO])?-([2-9TJQKA])([2-9TJQKA])([SO])?$").unwrap()
});

/// Every combo, ordered by [`combo_index`].
pub static ALL_COMBOS: Lazy<Vec<[Card; 2]>> = Lazy::new(|| {
    let mut ret = Vec::with_capacity(NUM_COMBOS);
    for i in 0..51 {
        for j in (i + 1)..52 {
            ret.push([Card::from_index(i), Card::from_index(j)]);
        }
    }
    ret
});

/// Every hand class, ordered by [`HandClass::index`].
pub static ALL_CLASSES: Lazy<Vec<HandClass>> =
    Lazy::new(|| (0..NUM_CLASSES).map(HandClass::from_index).collect());

/// Index of the two-card combo `{a, b}` in `0..1326`, independent of order.
#[inline]
pub fn combo_index(a: Card, b: Card) -> usize {
    let (i, j) = if a.index() < b.index() {
        (a.index() as usize, b.index() as usize)
    } else {
        (b.index() as usize, a.index() as usize)
    };
    assert!(i != j, "combo of identical cards: {}", a);
    i * 51 - i * (i.saturating_sub(1)) / 2 + (j - i - 1)
}

/// One of the 169 strategically distinct starting hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandClass {
    high: u8,
    low: u8,
    suited: bool,
}

impl HandClass {
    pub fn new(high: u8, low: u8, suited: bool) -> Self {
        assert!((2..=14).contains(&high) && (2..=14).contains(&low));
        let (high, low) = if high >= low { (high, low) } else { (low, high) };
        assert!(!(suited && high == low), "pairs cannot be suited");
        Self { high, low, suited }
    }

    /// Class of the hole cards `a` and `b`.
    #[inline]
    pub fn of(a: Card, b: Card) -> Self {
        Self::new(a.rank(), b.rank(), a.suit() == b.suit() && a.rank() != b.rank())
    }

    #[inline]
    pub fn high(&self) -> u8 {
        self.high
    }

    #[inline]
    pub fn low(&self) -> u8 {
        self.low
    }

    #[inline]
    pub fn is_pair(&self) -> bool {
        self.high == self.low
    }

    #[inline]
    pub fn is_suited(&self) -> bool {
        self.suited
    }

    /// Cell of the 13x13 grid: pairs on the diagonal, suited hands at
    /// `[low][high]`, offsuit hands at `[high][low]`.
    #[inline]
    pub fn index(&self) -> usize {
        let hi = (self.high - 2) as usize;
        let lo = (self.low - 2) as usize;
        if self.suited {
            lo * 13 + hi
        } else {
            hi * 13 + lo
        }
    }

    pub fn from_index(index: usize) -> Self {
        assert!(index < NUM_CLASSES, "hand class index out of range: {}", index);
        let row = (index / 13) as u8 + 2;
        let col = (index % 13) as u8 + 2;
        if row < col {
            Self::new(col, row, true)
        } else {
            Self::new(row, col, false)
        }
    }

    /// Number of card combos in the class (6, 4 or 12).
    #[inline]
    pub fn num_combos(&self) -> usize {
        if self.is_pair() {
            6
        } else if self.suited {
            4
        } else {
            12
        }
    }

    /// The concrete combos of the class.
    pub fn combos(&self) -> Vec<[Card; 2]> {
        let mut ret = Vec::with_capacity(self.num_combos());
        for s1 in Suit::ALL {
            for s2 in Suit::ALL {
                let keep = if self.is_pair() {
                    s1 < s2
                } else if self.suited {
                    s1 == s2
                } else {
                    s1 != s2
                };
                if keep {
                    ret.push([Card::new(self.high, s1), Card::new(self.low, s2)]);
                }
            }
        }
        ret
    }
}

impl fmt::Display for HandClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let high = RANK_CHARS[(self.high - 2) as usize];
        let low = RANK_CHARS[(self.low - 2) as usize];
        match (self.is_pair(), self.suited) {
            (true, _) => write!(f, "{}{}", high, low),
            (false, true) => write!(f, "{}{}s", high, low),
            (false, false) => write!(f, "{}{}o", high, low),
        }
    }
}

/// Parses exactly one class: `"QQ"`, `"AKs"` or `"AKo"`. A bare `"AK"`
/// names two classes and is only accepted by [`Range::parse`].
impl FromStr for HandClass {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TOKEN_RE
            .captures(s.trim())
            .filter(|c| c.get(4).is_none())
            .ok_or_else(|| RangeError::InvalidToken(s.to_string()))?;
        let high = rank_of(&caps[1]);
        let low = rank_of(&caps[2]);
        let suffix = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
        match (high == low, suffix.as_deref()) {
            (true, None) => Ok(Self::new(high, low, false)),
            (false, Some("s")) => Ok(Self::new(high, low, true)),
            (false, Some("o")) => Ok(Self::new(high, low, false)),
            _ => Err(RangeError::InvalidToken(s.to_string())),
        }
    }
}

fn rank_of(s: &str) -> u8 {
    let c = s.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('2');
    RANK_CHARS.iter().position(|r| *r == c).unwrap_or(0) as u8 + 2
}

/// A set of hand classes, written in the usual notation
/// (`"QQ+,AKs,AQo+,T9s,22-55,A2s-A5s"`, or `"any"`).
#[derive(Clone, PartialEq, Eq)]
pub struct Range {
    members: [bool; NUM_CLASSES],
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Range({})", self)
    }
}

impl Range {
    pub fn full() -> Self {
        Self {
            members: [true; NUM_CLASSES],
        }
    }

    pub fn empty() -> Self {
        Self {
            members: [false; NUM_CLASSES],
        }
    }

    pub fn parse(s: &str) -> Result<Self, RangeError> {
        let mut range = Self::empty();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("any") || token.eq_ignore_ascii_case("random") {
                return Ok(Self::full());
            }
            range.add_token(token)?;
        }
        if range.is_empty() {
            return Err(RangeError::Empty);
        }
        Ok(range)
    }

    fn add_token(&mut self, token: &str) -> Result<(), RangeError> {
        let invalid = || RangeError::InvalidToken(token.to_string());

        if let Some(caps) = TOKEN_RE.captures(token) {
            let high = rank_of(&caps[1]);
            let low = rank_of(&caps[2]);
            let suffix = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
            let plus = caps.get(4).is_some();
            if high == low {
                if suffix.is_some() {
                    return Err(invalid());
                }
                let top = if plus { 14 } else { high };
                for rank in high..=top {
                    self.insert(HandClass::new(rank, rank, false));
                }
            } else {
                let (high, low) = if high > low { (high, low) } else { (low, high) };
                let top = if plus { high - 1 } else { low };
                for kicker in low..=top {
                    self.insert_suffixed(high, kicker, suffix.as_deref());
                }
            }
            return Ok(());
        }

        let caps = SPAN_RE.captures(token).ok_or_else(invalid)?;
        let (h1, l1) = (rank_of(&caps[1]), rank_of(&caps[2]));
        let (h2, l2) = (rank_of(&caps[4]), rank_of(&caps[5]));
        let s1 = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());
        let s2 = caps.get(6).map(|m| m.as_str().to_ascii_lowercase());
        if s1 != s2 {
            return Err(invalid());
        }
        if h1 == l1 && h2 == l2 && s1.is_none() {
            for rank in h1.min(h2)..=h1.max(h2) {
                self.insert(HandClass::new(rank, rank, false));
            }
            Ok(())
        } else if h1 == h2 && l1 != h1 && l2 != h2 && l1.max(l2) < h1 {
            for kicker in l1.min(l2)..=l1.max(l2) {
                self.insert_suffixed(h1, kicker, s1.as_deref());
            }
            Ok(())
        } else {
            Err(invalid())
        }
    }

    fn insert_suffixed(&mut self, high: u8, low: u8, suffix: Option<&str>) {
        if suffix != Some("o") {
            self.insert(HandClass::new(high, low, true));
        }
        if suffix != Some("s") {
            self.insert(HandClass::new(high, low, false));
        }
    }

    #[inline]
    pub fn insert(&mut self, class: HandClass) {
        self.members[class.index()] = true;
    }

    #[inline]
    pub fn contains(&self, class: HandClass) -> bool {
        self.members[class.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|m| !m)
    }

    /// Number of classes in the range.
    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| **m).count()
    }

    pub fn classes(&self) -> impl Iterator<Item = HandClass> + '_ {
        ALL_CLASSES.iter().copied().filter(move |c| self.contains(*c))
    }

    /// Combos of the range that avoid every card in `dead_mask`.
    pub fn combos(&self, dead_mask: u64) -> Vec<[Card; 2]> {
        self.classes()
            .flat_map(|class| class.combos())
            .filter(|[a, b]| (a.mask() | b.mask()) & dead_mask == 0)
            .collect()
    }

    /// Whether every class of `self` is also in `other`.
    pub fn is_subset(&self, other: &Range) -> bool {
        self.members
            .iter()
            .zip(other.members.iter())
            .all(|(a, b)| !a || *b)
    }
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.members.iter().all(|m| *m) {
            return f.write_str("any");
        }
        let names = self.classes().map(|c| c.to_string()).collect::<Vec<_>>();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{mask_of, parse_cards};
    use rstest::rstest;

    #[test]
    fn class_indices_cover_the_grid() {
        let mut combos = 0;
        for (i, class) in ALL_CLASSES.iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(class.combos().len(), class.num_combos());
            combos += class.num_combos();
        }
        assert_eq!(combos, NUM_COMBOS);
    }

    #[test]
    fn combo_index_matches_enumeration_order() {
        for (k, [a, b]) in ALL_COMBOS.iter().enumerate() {
            assert_eq!(combo_index(*a, *b), k);
            assert_eq!(combo_index(*b, *a), k);
        }
    }

    #[rstest]
    #[case("AhKh", "AKs")]
    #[case("KdAh", "AKo")]
    #[case("7d2c", "72o")]
    #[case("QsQc", "QQ")]
    fn classifies_hole_cards(#[case] cards: &str, #[case] name: &str) {
        let cards = parse_cards(cards).unwrap();
        let class = HandClass::of(cards[0], cards[1]);
        assert_eq!(class.to_string(), name);
        assert_eq!(name.parse::<HandClass>().unwrap(), class);
    }

    #[rstest]
    #[case("QQ+", 3)]
    #[case("AKs", 1)]
    #[case("AK", 2)]
    #[case("AQo+", 2)]
    #[case("ATs+", 4)]
    #[case("KT+", 6)]
    #[case("22-55", 4)]
    #[case("A2s-A5s", 4)]
    #[case("QQ+,AKs,AQo+,T9s", 7)]
    #[case("any", 169)]
    fn parses_range_notation(#[case] s: &str, #[case] classes: usize) {
        assert_eq!(Range::parse(s).unwrap().len(), classes);
    }

    #[rstest]
    #[case("")]
    #[case("AAs")]
    #[case("AKx")]
    #[case("A")]
    #[case("AKs-QJs")]
    #[case("AKs-AQo")]
    fn rejects_bad_notation(#[case] s: &str) {
        assert!(Range::parse(s).is_err());
    }

    #[test]
    fn combos_skip_dead_cards() {
        let range = Range::parse("AA,KK").unwrap();
        assert_eq!(range.combos(0).len(), 12);
        let dead = mask_of(&parse_cards("AhKd").unwrap());
        let combos = range.combos(dead);
        assert_eq!(combos.len(), 6);
        assert!(combos.iter().all(|[a, b]| (a.mask() | b.mask()) & dead == 0));
    }

    #[test]
    fn subset_and_display() {
        let tight = Range::parse("QQ+,AKs").unwrap();
        let wide = Range::parse("TT+,AQs+").unwrap();
        assert!(tight.is_subset(&wide));
        assert!(!wide.is_subset(&tight));
        assert_eq!(Range::parse(&tight.to_string()).unwrap(), tight);
        assert_eq!(Range::full().to_string(), "any");
    }
}
