use crate::error::CardError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];

static CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(10|[2-9TJQKA])([CDHS])$").unwrap());

static CARD_LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(10|[2-9TJQKA])[CDHS]").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_index(index: u8) -> Self {
        Self::ALL[index as usize]
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }
}

/// A playing card. Ranks run from 2 to 14 (ace high).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    rank: u8,
    suit: Suit,
}

impl Card {
    /// Creates a card. Panics when `rank` is outside `2..=14`.
    #[inline]
    pub fn new(rank: u8, suit: Suit) -> Self {
        assert!((2..=14).contains(&rank), "rank out of range: {}", rank);
        Self { rank, suit }
    }

    /// Inverse of [`Card::index`].
    #[inline]
    pub fn from_index(index: u8) -> Self {
        assert!(index < 52, "card index out of range: {}", index);
        Self {
            rank: index / 4 + 2,
            suit: Suit::from_index(index % 4),
        }
    }

    #[inline]
    pub fn rank(&self) -> u8 {
        self.rank
    }

    #[inline]
    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Position in a sorted deck: `(rank - 2) * 4 + suit`.
    #[inline]
    pub fn index(&self) -> u8 {
        (self.rank - 2) * 4 + self.suit.index()
    }

    /// Single-bit mask used for card-set arithmetic.
    #[inline]
    pub fn mask(&self) -> u64 {
        1 << self.index()
    }

    /// All 52 cards in index order.
    pub fn all() -> impl Iterator<Item = Card> {
        (0..52).map(Card::from_index)
    }
}

/// Union of the masks of `cards`.
#[inline]
pub fn mask_of(cards: &[Card]) -> u64 {
    cards.iter().fold(0, |acc, c| acc | c.mask())
}

/// Returns the first card that appears twice in `cards`.
pub fn first_duplicate(cards: &[Card]) -> Option<Card> {
    let mut seen = 0u64;
    for card in cards {
        if seen & card.mask() != 0 {
            return Some(*card);
        }
        seen |= card.mask();
    }
    None
}

/// Parses a run of cards such as `"AhKd"`, `"Ah Kd"` or `"Ah,Kd,10c"`.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, CardError> {
    let compact = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect::<String>();
    let cards = CARD_LIST_RE
        .find_iter(&compact)
        .map(|m| m.as_str().parse::<Card>())
        .collect::<Result<Vec<_>, _>>()?;
    let consumed = CARD_LIST_RE
        .find_iter(&compact)
        .map(|m| m.as_str().len())
        .sum::<usize>();
    if consumed != compact.len() {
        return Err(CardError::Invalid(s.to_string()));
    }
    Ok(cards)
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CARD_RE
            .captures(s.trim())
            .ok_or_else(|| CardError::Invalid(s.to_string()))?;
        let rank = match caps[1].to_ascii_uppercase().as_str() {
            "10" | "T" => 10,
            "J" => 11,
            "Q" => 12,
            "K" => 13,
            "A" => 14,
            digit => digit
                .parse::<u8>()
                .map_err(|_| CardError::Invalid(s.to_string()))?,
        };
        let suit = match caps[2].to_ascii_lowercase().as_str() {
            "c" => Suit::Clubs,
            "d" => Suit::Diamonds,
            "h" => Suit::Hearts,
            _ => Suit::Spades,
        };
        Ok(Card::new(rank, suit))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[(self.rank - 2) as usize],
            self.suit.symbol()
        )
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
