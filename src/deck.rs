use crate::card::{mask_of, Card};
use crate::error::DeckError;
use rand::seq::SliceRandom;
use rand::Rng;

/// The undealt part of a 52-card deck.
///
/// Cards leave the deck exactly once, so no card can be both dealt and
/// still available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    /// A full deck in index order.
    pub fn new() -> Self {
        Self {
            cards: Card::all().collect(),
        }
    }

    /// A full deck minus the `dead` cards.
    pub fn without(dead: &[Card]) -> Self {
        let dead = mask_of(dead);
        Self {
            cards: Card::all().filter(|c| dead & c.mask() == 0).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[inline]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Deals `n` cards from the top.
    pub fn deal(&mut self, n: usize) -> Result<Vec<Card>, DeckError> {
        if n > self.cards.len() {
            return Err(DeckError::NotEnoughCards {
                requested: n,
                remaining: self.cards.len(),
            });
        }
        let at = self.cards.len() - n;
        let mut dealt = self.cards.split_off(at);
        dealt.reverse();
        Ok(dealt)
    }

    /// Removes and returns a uniformly chosen card without shuffling the rest.
    #[inline]
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        let i = rng.random_range(0..self.cards.len());
        Some(self.cards.swap_remove(i))
    }

    /// Takes a specific card out of the deck; returns whether it was present.
    pub fn remove(&mut self, card: Card) -> bool {
        match self.cards.iter().position(|c| *c == card) {
            Some(i) => {
                self.cards.swap_remove(i);
                true
            }
            None => false,
        }
    }
}

/// `splitmix64` step, used to derive independent per-stream seeds.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Seed of the `stream`-th independent generator derived from `seed`.
#[inline]
pub fn stream_seed(seed: u64, stream: u64) -> u64 {
    splitmix64(seed ^ splitmix64(stream.wrapping_add(1)))
}
