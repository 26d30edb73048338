use serde::{Serialize, Serializer};
use std::fmt;

/// Abstracted bet sizes, as fractions of the pot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BetSize {
    Third,
    TwoThirds,
    Pot,
    OneAndHalf,
    /// An observed bet of a specific amount.
    Exact,
}

impl BetSize {
    /// Sizes offered for the first aggression of a street.
    pub const OPENING: [BetSize; 4] = [
        BetSize::Third,
        BetSize::TwoThirds,
        BetSize::Pot,
        BetSize::OneAndHalf,
    ];

    /// Pot fraction of the size; `None` for observed bets.
    pub fn fraction(self) -> Option<f64> {
        match self {
            BetSize::Third => Some(0.33),
            BetSize::TwoThirds => Some(0.66),
            BetSize::Pot => Some(1.0),
            BetSize::OneAndHalf => Some(1.5),
            BetSize::Exact => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            BetSize::Third => "_33",
            BetSize::TwoThirds => "_66",
            BetSize::Pot => "_100",
            BetSize::OneAndHalf => "_150",
            BetSize::Exact => "",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(BetSize),
    Raise(BetSize),
    AllIn,
}

impl Action {
    /// Stable label, e.g. `"raise_66"` or `"all_in"`.
    pub fn label(&self) -> String {
        match self {
            Action::Fold => "fold".to_string(),
            Action::Check => "check".to_string(),
            Action::Call => "call".to_string(),
            Action::Bet(size) => format!("bet{}", size.suffix()),
            Action::Raise(size) => format!("raise{}", size.suffix()),
            Action::AllIn => "all_in".to_string(),
        }
    }

    /// Whether the action puts in more than a call.
    #[inline]
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Action::Bet(_) | Action::Raise(_) | Action::AllIn)
    }

    /// Whether the action keeps hero in the hand.
    #[inline]
    pub fn is_continuing(&self) -> bool {
        !matches!(self, Action::Fold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}
