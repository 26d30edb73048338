use crate::card::Card;
use crate::game_state::Street;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CardError {
    #[error("invalid card: '{0}'")]
    Invalid(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeckError {
    #[error("cannot deal {requested} cards, only {remaining} remain")]
    NotEnoughCards { requested: usize, remaining: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RangeError {
    #[error("invalid range token: '{0}'")]
    InvalidToken(String),

    #[error("range is empty")]
    Empty,
}

/// Reasons a game state is rejected at the boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Card(#[from] CardError),

    #[error("expected 2 hole cards, found {0}")]
    HoleCardCount(usize),

    #[error("{street} requires {expected} board cards, found {found}")]
    BoardMismatch {
        street: Street,
        expected: usize,
        found: usize,
    },

    #[error("card {0} appears more than once")]
    DuplicateCard(Card),

    #[error("effective stack must be positive, found {0}")]
    NonPositiveStack(f64),

    #[error("pot size must be positive, found {0}")]
    NonPositivePot(f64),

    #[error("amount to call must be non-negative, found {0}")]
    NegativeCall(f64),

    #[error("amount to call ({to_call}) exceeds the pot ({pot})")]
    CallExceedsPot { to_call: f64, pot: f64 },

    #[error("opponent count must be between 1 and {max}, found {found}")]
    OpponentCount { found: usize, max: usize },

    #[error("{0} budget must be positive")]
    ZeroBudget(&'static str),

    #[error("unknown street: '{0}'")]
    UnknownStreet(String),

    #[error("unknown position: '{0}'")]
    UnknownPosition(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquityError {
    #[error(transparent)]
    Card(#[from] CardError),

    #[error("board must hold 0, 3, 4 or 5 cards, found {0}")]
    BoardLength(usize),

    #[error("card {0} appears more than once")]
    DuplicateCard(Card),

    #[error("at least one opponent is required")]
    NoOpponents,

    #[error("{0} opponents cannot be dealt from one deck")]
    TooManyOpponents(usize),

    #[error("trial count must be positive")]
    ZeroTrials,

    #[error("opponent range has no combos compatible with the known cards")]
    RangeExhausted,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("invalid game state: {0}")]
    InvalidState(#[from] ValidationError),

    #[error("invalid budget: {0}")]
    Budget(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Equity(#[from] EquityError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}
