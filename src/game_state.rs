use crate::card::{first_duplicate, Card};
use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Most opponents a game state may name.
pub const MAX_OPPONENTS: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    /// Number of community cards dealt by this street.
    #[inline]
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        })
    }
}

impl FromStr for Street {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preflop" | "pre-flop" | "pre" => Ok(Street::Preflop),
            "flop" => Ok(Street::Flop),
            "turn" => Ok(Street::Turn),
            "river" => Ok(Street::River),
            _ => Err(ValidationError::UnknownStreet(s.to_string())),
        }
    }
}

/// Seat at a six- to nine-handed table, in preflop acting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    UnderTheGun,
    Middle,
    Hijack,
    Cutoff,
    Button,
    SmallBlind,
    BigBlind,
}

impl Position {
    /// Whether the seat usually acts last after the flop.
    pub fn default_in_position(self) -> bool {
        matches!(self, Position::Button | Position::Cutoff)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Position::UnderTheGun => "UTG",
            Position::Middle => "MP",
            Position::Hijack => "HJ",
            Position::Cutoff => "CO",
            Position::Button => "BTN",
            Position::SmallBlind => "SB",
            Position::BigBlind => "BB",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Position {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_uppercase()
            .replace(|c: char| c == ' ' || c == '_' || c == '-', "");
        match normalized.as_str() {
            "UTG" | "EP" | "UNDERTHEGUN" => Ok(Position::UnderTheGun),
            "MP" | "UTG+1" | "LJ" | "LOJACK" | "MIDDLE" => Ok(Position::Middle),
            "HJ" | "HIJACK" => Ok(Position::Hijack),
            "CO" | "CUTOFF" => Ok(Position::Cutoff),
            "BTN" | "BU" | "BUTTON" | "D" | "DEALER" => Ok(Position::Button),
            "SB" | "SMALLBLIND" => Ok(Position::SmallBlind),
            "BB" | "BIGBLIND" => Ok(Position::BigBlind),
            _ => Err(ValidationError::UnknownPosition(s.to_string())),
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn one() -> usize {
    1
}

/// Wire form of a table state, as supplied by the calling application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateRequest {
    pub hole_cards: Vec<String>,
    #[serde(default)]
    pub board_cards: Vec<String>,
    pub pot_size: f64,
    #[serde(default)]
    pub amount_to_call: f64,
    pub effective_stack: f64,
    pub position: String,
    pub street: String,
    #[serde(default = "one")]
    pub opponent_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_position: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trials: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A validated table state. Hole and board cards are disjoint, the board
/// matches the street and every amount is in range.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    hole: [Card; 2],
    board: Vec<Card>,
    pot: f64,
    to_call: f64,
    stack: f64,
    position: Position,
    street: Street,
    opponents: usize,
    in_position: Option<bool>,
    iterations: Option<usize>,
    trials: Option<usize>,
    seed: Option<u64>,
}

impl GameState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hole: &[Card],
        board: &[Card],
        pot: f64,
        to_call: f64,
        stack: f64,
        position: Position,
        street: Street,
        opponents: usize,
    ) -> Result<Self, ValidationError> {
        if hole.len() != 2 {
            return Err(ValidationError::HoleCardCount(hole.len()));
        }
        if board.len() != street.board_len() {
            return Err(ValidationError::BoardMismatch {
                street,
                expected: street.board_len(),
                found: board.len(),
            });
        }
        let mut known = hole.to_vec();
        known.extend_from_slice(board);
        if let Some(card) = first_duplicate(&known) {
            return Err(ValidationError::DuplicateCard(card));
        }
        if !(stack > 0.0) || !stack.is_finite() {
            return Err(ValidationError::NonPositiveStack(stack));
        }
        if !(pot > 0.0) || !pot.is_finite() {
            return Err(ValidationError::NonPositivePot(pot));
        }
        if !(to_call >= 0.0) || !to_call.is_finite() {
            return Err(ValidationError::NegativeCall(to_call));
        }
        if to_call > pot {
            return Err(ValidationError::CallExceedsPot { to_call, pot });
        }
        if opponents == 0 || opponents > MAX_OPPONENTS {
            return Err(ValidationError::OpponentCount {
                found: opponents,
                max: MAX_OPPONENTS,
            });
        }
        Ok(Self {
            hole: [hole[0], hole[1]],
            board: board.to_vec(),
            pot,
            to_call,
            stack,
            position,
            street,
            opponents,
            in_position: None,
            iterations: None,
            trials: None,
            seed: None,
        })
    }

    pub fn with_in_position(mut self, in_position: bool) -> Self {
        self.in_position = Some(in_position);
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Result<Self, ValidationError> {
        if iterations == 0 {
            return Err(ValidationError::ZeroBudget("iteration"));
        }
        self.iterations = Some(iterations);
        Ok(self)
    }

    pub fn with_trials(mut self, trials: usize) -> Result<Self, ValidationError> {
        if trials == 0 {
            return Err(ValidationError::ZeroBudget("trial"));
        }
        self.trials = Some(trials);
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[inline]
    pub fn hole(&self) -> [Card; 2] {
        self.hole
    }

    #[inline]
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    /// Hole and board cards together.
    pub fn known_cards(&self) -> Vec<Card> {
        let mut ret = self.hole.to_vec();
        ret.extend_from_slice(&self.board);
        ret
    }

    /// Chips in the middle, including any bet hero is facing.
    #[inline]
    pub fn pot(&self) -> f64 {
        self.pot
    }

    #[inline]
    pub fn to_call(&self) -> f64 {
        self.to_call
    }

    #[inline]
    pub fn stack(&self) -> f64 {
        self.stack
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn street(&self) -> Street {
        self.street
    }

    #[inline]
    pub fn opponents(&self) -> usize {
        self.opponents
    }

    /// Explicit override, else the seat default.
    pub fn in_position(&self) -> bool {
        self.in_position
            .unwrap_or_else(|| self.position.default_in_position())
    }

    pub fn iterations(&self) -> Option<usize> {
        self.iterations
    }

    pub fn trials(&self) -> Option<usize> {
        self.trials
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Stack-to-pot ratio.
    pub fn spr(&self) -> f64 {
        if self.pot > 0.0 {
            self.stack / self.pot
        } else {
            f64::INFINITY
        }
    }

    /// Share of the final pot hero must put in to call.
    pub fn pot_odds(&self) -> f64 {
        if self.to_call > 0.0 {
            self.to_call / (self.pot + self.to_call)
        } else {
            0.0
        }
    }
}

impl TryFrom<GameStateRequest> for GameState {
    type Error = ValidationError;

    fn try_from(req: GameStateRequest) -> Result<Self, Self::Error> {
        let hole = req
            .hole_cards
            .iter()
            .map(|s| s.parse::<Card>())
            .collect::<Result<Vec<_>, _>>()?;
        let board = req
            .board_cards
            .iter()
            .map(|s| s.parse::<Card>())
            .collect::<Result<Vec<_>, _>>()?;
        let street = req.street.parse::<Street>()?;
        let position = req.position.parse::<Position>()?;

        let mut state = GameState::new(
            &hole,
            &board,
            req.pot_size,
            req.amount_to_call,
            req.effective_stack,
            position,
            street,
            req.opponent_count,
        )?;
        if let Some(in_position) = req.in_position {
            state = state.with_in_position(in_position);
        }
        if let Some(iterations) = req.iterations {
            state = state.with_iterations(iterations)?;
        }
        if let Some(trials) = req.trials {
            state = state.with_trials(trials)?;
        }
        if let Some(seed) = req.seed {
            state = state.with_seed(seed);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_cards;
    use crate::error::CardError;
    use rstest::rstest;

    fn request() -> GameStateRequest {
        serde_json::from_str(
            r#"{
                "holeCards": ["Ah", "Kd"],
                "boardCards": [],
                "potSize": 1.5,
                "amountToCall": 0,
                "effectiveStack": 100,
                "position": "UTG",
                "street": "preflop"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn request_defaults_and_conversion() {
        let req = request();
        assert_eq!(req.opponent_count, 1);
        assert_eq!(req.seed, None);

        let state = GameState::try_from(req).unwrap();
        assert_eq!(state.hole(), [parse_cards("Ah").unwrap()[0], parse_cards("Kd").unwrap()[0]]);
        assert_eq!(state.street(), Street::Preflop);
        assert_eq!(state.position(), Position::UnderTheGun);
        assert!(!state.in_position());
        assert_eq!(state.spr(), 100.0 / 1.5);
    }

    #[test]
    fn overrides_are_carried() {
        let mut req = request();
        req.in_position = Some(true);
        req.iterations = Some(50);
        req.trials = Some(700);
        req.seed = Some(9);
        let state = GameState::try_from(req).unwrap();
        assert!(state.in_position());
        assert_eq!(state.iterations(), Some(50));
        assert_eq!(state.trials(), Some(700));
        assert_eq!(state.seed(), Some(9));
    }

    #[rstest]
    #[case("btn", Position::Button)]
    #[case("Cutoff", Position::Cutoff)]
    #[case("big blind", Position::BigBlind)]
    #[case("UTG+1", Position::Middle)]
    fn parses_position_aliases(#[case] s: &str, #[case] expected: Position) {
        assert_eq!(s.parse::<Position>().unwrap(), expected);
    }

    #[rstest]
    #[case(|r: &mut GameStateRequest| r.hole_cards = vec!["Ah".into()], ValidationError::HoleCardCount(1))]
    #[case(|r: &mut GameStateRequest| r.hole_cards[1] = "Zz".into(), ValidationError::Card(CardError::Invalid("Zz".into())))]
    #[case(|r: &mut GameStateRequest| r.street = "flop".into(), ValidationError::BoardMismatch { street: Street::Flop, expected: 3, found: 0 })]
    #[case(|r: &mut GameStateRequest| r.hole_cards[1] = "Ah".into(), ValidationError::DuplicateCard("Ah".parse().unwrap()))]
    #[case(|r: &mut GameStateRequest| r.effective_stack = 0.0, ValidationError::NonPositiveStack(0.0))]
    #[case(|r: &mut GameStateRequest| r.pot_size = -1.0, ValidationError::NonPositivePot(-1.0))]
    #[case(|r: &mut GameStateRequest| { r.pot_size = 0.0; r.amount_to_call = 0.0 }, ValidationError::NonPositivePot(0.0))]
    #[case(|r: &mut GameStateRequest| r.amount_to_call = -2.0, ValidationError::NegativeCall(-2.0))]
    #[case(|r: &mut GameStateRequest| r.amount_to_call = 3.0, ValidationError::CallExceedsPot { to_call: 3.0, pot: 1.5 })]
    #[case(|r: &mut GameStateRequest| r.opponent_count = 0, ValidationError::OpponentCount { found: 0, max: MAX_OPPONENTS })]
    #[case(|r: &mut GameStateRequest| r.iterations = Some(0), ValidationError::ZeroBudget("iteration"))]
    #[case(|r: &mut GameStateRequest| r.street = "fourth".into(), ValidationError::UnknownStreet("fourth".into()))]
    #[case(|r: &mut GameStateRequest| r.position = "dealer-left".into(), ValidationError::UnknownPosition("dealer-left".into()))]
    fn rejects_malformed_requests(
        #[case] corrupt: fn(&mut GameStateRequest),
        #[case] expected: ValidationError,
    ) {
        let mut req = request();
        corrupt(&mut req);
        assert_eq!(GameState::try_from(req).unwrap_err(), expected);
    }

    #[test]
    fn board_duplicates_hole_card() {
        let hole = parse_cards("AhKd").unwrap();
        let board = parse_cards("Kd7c2s").unwrap();
        let err = GameState::new(&hole, &board, 10.0, 0.0, 90.0, Position::Button, Street::Flop, 1)
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateCard(board[0]));
    }

    #[test]
    fn pot_odds_and_spr() {
        let hole = parse_cards("7d2c").unwrap();
        let state =
            GameState::new(&hole, &[], 13.5, 6.0, 97.0, Position::UnderTheGun, Street::Preflop, 1)
                .unwrap();
        assert!((state.pot_odds() - 6.0 / 19.5).abs() < 1e-12);
        assert!((state.spr() - 97.0 / 13.5).abs() < 1e-12);
    }
}
