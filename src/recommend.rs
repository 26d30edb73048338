//! Turns solver frequencies and equity into ranked, explained advice.

use crate::action::Action;
use crate::equity::EquityResult;
use crate::game_state::{GameState, Street};
use crate::solver::SolverResult;
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};
use std::fmt;

pub const DEFAULT_FREQUENCY_CUTOFF: f64 = 0.10;

/// Per extra opponent, continuing actions keep this share of their weight.
const MULTIWAY_DISCOUNT: f64 = 0.85;
const OUT_OF_POSITION_CALL: f64 = 0.9;
const DEEP_ALL_IN: f64 = 0.8;
const DEEP_SPR: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_frequency(frequency: f64) -> Self {
        if frequency > 0.5 {
            Confidence::High
        } else if frequency >= 0.3 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EquityBand {
    Weak,
    Marginal,
    Strong,
    Dominant,
}

impl EquityBand {
    fn of(equity: f64) -> Self {
        if equity >= 0.7 {
            EquityBand::Dominant
        } else if equity >= 0.55 {
            EquityBand::Strong
        } else if equity >= 0.4 {
            EquityBand::Marginal
        } else {
            EquityBand::Weak
        }
    }
}

impl fmt::Display for EquityBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            EquityBand::Weak => "weak",
            EquityBand::Marginal => "marginal",
            EquityBand::Strong => "strong",
            EquityBand::Dominant => "dominant",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: Action,
    pub frequency: f64,
    /// Chips the action puts in.
    pub sizing: f64,
    pub ev: f64,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Another action next to the top recommendation, with the chips it gives up.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub action: Action,
    pub frequency: f64,
    pub ev: f64,
    /// Top recommendation's EV minus this action's EV.
    pub ev_gap: f64,
}

/// Recommendations above the frequency cutoff, plus the ones hidden from the
/// caller. Serializes as the visible list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecommendationSet {
    visible: Vec<Recommendation>,
    suppressed: Vec<Recommendation>,
}

impl RecommendationSet {
    pub fn visible(&self) -> &[Recommendation] {
        &self.visible
    }

    pub fn suppressed(&self) -> &[Recommendation] {
        &self.suppressed
    }

    pub fn all(&self) -> impl Iterator<Item = &Recommendation> {
        self.visible.iter().chain(self.suppressed.iter())
    }

    /// Visible and suppressed frequencies together.
    pub fn total_frequency(&self) -> f64 {
        self.all().map(|r| r.frequency).sum()
    }

    pub fn best(&self) -> Option<&Recommendation> {
        self.visible.first()
    }

    pub fn get(&self, action: Action) -> Option<&Recommendation> {
        self.all().find(|r| r.action == action)
    }

    /// Every action but the top one, visible or not, in ranking order.
    pub fn alternatives(&self) -> Vec<Alternative> {
        let best = match self.best() {
            Some(best) => best,
            None => return Vec::new(),
        };
        self.all()
            .skip(1)
            .map(|r| Alternative {
                action: r.action,
                frequency: r.frequency,
                ev: r.ev,
                ev_gap: best.ev - r.ev,
            })
            .collect()
    }
}

impl Serialize for RecommendationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.visible.serialize(serializer)
    }
}

/// Street-dependent share of the call amount expected to be won later.
fn implied_odds(street: Street) -> f64 {
    match street {
        Street::Preflop => 0.3,
        Street::Flop => 0.5,
        Street::Turn => 0.25,
        Street::River => 0.0,
    }
}

/// Equity needed to call once later winnings are counted; zero with nothing
/// to call.
pub fn implied_pot_odds(state: &GameState) -> f64 {
    let call = state.to_call();
    if call > 0.0 {
        call / (state.pot() + call + call * implied_odds(state.street()))
    } else {
        0.0
    }
}

/// Expected chips won by taking `action`, putting in `amount`, relative to
/// folding now.
pub fn action_ev(state: &GameState, equity: f64, action: Action, amount: f64) -> f64 {
    let pot = state.pot();
    let call = state.to_call();
    match action {
        Action::Fold => 0.0,
        Action::Check => equity * pot,
        Action::Call => {
            let implied = call * implied_odds(state.street());
            equity * (pot + call + implied) - call
        }
        Action::Bet(_) | Action::Raise(_) | Action::AllIn => {
            let raise = (amount - call).max(0.0);
            let fold_one = if pot + amount > 0.0 {
                raise / (pot + amount)
            } else {
                0.0
            };
            let fold_all = fold_one.powi(state.opponents() as i32);
            fold_all * pot + (1.0 - fold_all) * (equity * (pot + amount + raise) - amount)
        }
    }
}

fn reasoning(action: Action, frequency: f64, sizing: f64, equity: f64, state: &GameState) -> String {
    let band = EquityBand::of(equity);
    let pct = 100.0 * frequency;
    let eq = 100.0 * equity;
    let odds = 100.0 * state.pot_odds();
    match (action, band) {
        (Action::Fold, EquityBand::Weak) | (Action::Fold, EquityBand::Marginal) => format!(
            "Fold {:.0}% of the time: {} equity ({:.1}%) does not justify continuing against {:.1}% pot odds.",
            pct, band, eq, odds
        ),
        (Action::Fold, _) => format!(
            "Fold {:.0}% of the time: even with {} equity ({:.1}%), some folds keep the range balanced.",
            pct, band, eq
        ),
        (Action::Check, EquityBand::Weak) | (Action::Check, EquityBand::Marginal) => format!(
            "Check {:.0}% of the time: {} equity ({:.1}%) prefers to see cards cheaply.",
            pct, band, eq
        ),
        (Action::Check, _) => format!(
            "Check {:.0}% of the time: {} equity ({:.1}%) can trap and protect the checking range.",
            pct, band, eq
        ),
        (Action::Call, EquityBand::Weak) => format!(
            "Call {:.1} {:.0}% of the time: {} equity ({:.1}%) continues as a bluff-catcher against {:.1}% pot odds.",
            sizing, pct, band, eq, odds
        ),
        (Action::Call, _) => format!(
            "Call {:.1} {:.0}% of the time: {} equity ({:.1}%) beats the {:.1}% pot odds.",
            sizing, pct, band, eq, odds
        ),
        (Action::AllIn, EquityBand::Weak) | (Action::AllIn, EquityBand::Marginal) => format!(
            "Move all-in for {:.1} {:.0}% of the time: {} equity ({:.1}%) relies on fold equity.",
            sizing, pct, band, eq
        ),
        (Action::AllIn, _) => format!(
            "Move all-in for {:.1} {:.0}% of the time: {} equity ({:.1}%) wants the stacks in.",
            sizing, pct, band, eq
        ),
        (_, EquityBand::Weak) | (_, EquityBand::Marginal) => format!(
            "{} {:.1} {:.0}% of the time: {} equity ({:.1}%) works as a semi-bluff with fold equity.",
            verb(action), sizing, pct, band, eq
        ),
        (_, _) => format!(
            "{} {:.1} {:.0}% of the time: {} equity ({:.1}%) gets value from worse hands.",
            verb(action), sizing, pct, band, eq
        ),
    }
}

fn verb(action: Action) -> &'static str {
    match action {
        Action::Raise(_) => "Raise",
        _ => "Bet",
    }
}

/// Multiplier for position, opponent count and stack depth that the tree
/// abstraction does not capture.
fn adjustment(action: Action, state: &GameState) -> f64 {
    let mut factor = 1.0;
    if action.is_continuing() && state.opponents() > 1 {
        factor *= MULTIWAY_DISCOUNT.powi(state.opponents() as i32 - 1);
    }
    if action == Action::Call && !state.in_position() && state.street() != Street::River {
        factor *= OUT_OF_POSITION_CALL;
    }
    if action == Action::AllIn && state.spr() > DEEP_SPR {
        factor *= DEEP_ALL_IN;
    }
    factor
}

pub fn recommend(
    state: &GameState,
    equity: &EquityResult,
    solver: &SolverResult,
) -> RecommendationSet {
    recommend_with_cutoff(state, equity, solver, DEFAULT_FREQUENCY_CUTOFF)
}

pub fn recommend_with_cutoff(
    state: &GameState,
    equity: &EquityResult,
    solver: &SolverResult,
    cutoff: f64,
) -> RecommendationSet {
    let entries = solver.strategy.entries();
    let adjusted = entries
        .iter()
        .map(|e| e.frequency * adjustment(e.action, state))
        .collect::<Vec<_>>();
    let total = adjusted.iter().sum::<f64>();
    let frequencies = if total > 0.0 {
        adjusted.iter().map(|f| f / total).collect::<Vec<_>>()
    } else {
        entries.iter().map(|e| e.frequency).collect()
    };

    let mut all = entries
        .iter()
        .zip(frequencies)
        .map(|(e, frequency)| Recommendation {
            action: e.action,
            frequency,
            sizing: e.amount,
            ev: action_ev(state, equity.equity, e.action, e.amount),
            confidence: Confidence::from_frequency(frequency),
            reasoning: reasoning(e.action, frequency, e.amount, equity.equity, state),
        })
        .collect::<Vec<_>>();
    all.sort_by(|a, b| {
        OrderedFloat(b.frequency)
            .cmp(&OrderedFloat(a.frequency))
            .then(OrderedFloat(b.ev).cmp(&OrderedFloat(a.ev)))
            .then(a.action.cmp(&b.action))
    });

    let (mut visible, mut suppressed): (Vec<_>, Vec<_>) =
        all.into_iter().partition(|r| r.frequency >= cutoff);
    if visible.is_empty() && !suppressed.is_empty() {
        visible.push(suppressed.remove(0));
    }
    RecommendationSet {
        visible,
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BetSize;
    use crate::card::parse_cards;
    use crate::game_state::Position;
    use crate::solver::{StrategyEntry, StrategyProfile};
    use rstest::rstest;
    use std::time::Duration;

    fn state(pot: f64, to_call: f64, opponents: usize, position: Position) -> GameState {
        let hole = parse_cards("AhKd").unwrap();
        let board = parse_cards("Kc7d2s").unwrap();
        GameState::new(&hole, &board, pot, to_call, 100.0, position, Street::Flop, opponents)
            .unwrap()
    }

    fn equity(equity: f64) -> EquityResult {
        EquityResult {
            win: 100.0 * equity,
            tie: 0.0,
            lose: 100.0 * (1.0 - equity),
            equity,
            trials: 1000,
            opponents: 1,
        }
    }

    fn solved(entries: &[(Action, f64, f64)]) -> SolverResult {
        SolverResult {
            strategy: StrategyProfile::new(
                entries
                    .iter()
                    .map(|&(action, frequency, amount)| StrategyEntry {
                        action,
                        frequency,
                        amount,
                    })
                    .collect(),
            ),
            exploitability: 0.0,
            iterations: 1,
            convergence_time: Duration::from_millis(1),
            converged: true,
            hero_bucket: 0,
            hero_strength: 0.5,
            game_value: 0.0,
            history: Vec::new(),
        }
    }

    #[rstest]
    #[case(0.7, Confidence::High)]
    #[case(0.5, Confidence::Medium)]
    #[case(0.3, Confidence::Medium)]
    #[case(0.29, Confidence::Low)]
    fn confidence_tiers(#[case] frequency: f64, #[case] tier: Confidence) {
        assert_eq!(Confidence::from_frequency(frequency), tier);
    }

    #[test]
    fn ev_formulas() {
        let s = state(10.0, 5.0, 1, Position::Button);
        assert_eq!(action_ev(&s, 0.6, Action::Fold, 0.0), 0.0);
        // 0.6 * (10 + 5 + 2.5) - 5
        assert!((action_ev(&s, 0.6, Action::Call, 5.0) - 5.5).abs() < 1e-12);
        // raise to 20: fold 15/30, called: 0.6 * 45 - 20
        let ev = action_ev(&s, 0.6, Action::Raise(BetSize::Pot), 20.0);
        assert!((ev - (0.5 * 10.0 + 0.5 * 7.0)).abs() < 1e-12);

        let multiway = state(10.0, 5.0, 3, Position::Button);
        let ev3 = action_ev(&multiway, 0.6, Action::Raise(BetSize::Pot), 20.0);
        assert!(ev3 < ev);
    }

    #[test]
    fn hidden_actions_keep_their_mass() {
        let s = state(10.0, 0.0, 1, Position::Button);
        let solver = solved(&[
            (Action::Check, 0.55, 0.0),
            (Action::Bet(BetSize::Third), 0.05, 3.3),
            (Action::Bet(BetSize::Pot), 0.35, 10.0),
            (Action::AllIn, 0.05, 100.0),
        ]);
        let set = recommend(&s, &equity(0.62), &solver);
        assert_eq!(set.visible().len(), 2);
        assert_eq!(set.suppressed().len(), 2);
        assert!((set.total_frequency() - 1.0).abs() < 1e-9);
        assert_eq!(set.best().unwrap().action, Action::Check);
        assert_eq!(set.best().unwrap().confidence, Confidence::High);

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["action"], "bet_100");
    }

    #[test]
    fn alternatives_measure_the_gap_to_the_top_action() {
        let s = state(10.0, 0.0, 1, Position::Button);
        let solver = solved(&[
            (Action::Check, 0.55, 0.0),
            (Action::Bet(BetSize::Third), 0.05, 3.3),
            (Action::Bet(BetSize::Pot), 0.35, 10.0),
            (Action::AllIn, 0.05, 100.0),
        ]);
        let set = recommend(&s, &equity(0.62), &solver);
        let best = set.best().unwrap();
        assert!((best.ev - 6.2).abs() < 1e-12);

        let alternatives = set.alternatives();
        assert_eq!(alternatives.len(), 3);
        assert_eq!(alternatives[0].action, Action::Bet(BetSize::Pot));
        assert!(alternatives.iter().all(|a| a.action != Action::Check));
        for alt in &alternatives {
            assert!((alt.ev_gap - (best.ev - alt.ev)).abs() < 1e-12);
        }
        assert!(RecommendationSet::default().alternatives().is_empty());
    }

    #[test]
    fn implied_odds_lower_the_price_of_a_call() {
        let facing = state(10.0, 5.0, 1, Position::Button);
        // flop: half the call comes back later
        assert!((implied_pot_odds(&facing) - 5.0 / 17.5).abs() < 1e-12);
        assert!(implied_pot_odds(&facing) < facing.pot_odds());
        assert_eq!(implied_pot_odds(&state(10.0, 0.0, 1, Position::Button)), 0.0);
    }

    #[test]
    fn out_of_position_calls_shrink() {
        let entries = [(Action::Fold, 0.5, 0.0), (Action::Call, 0.5, 5.0)];
        let ip = recommend(&state(10.0, 5.0, 1, Position::Button), &equity(0.5), &solved(&entries));
        let oop = recommend(
            &state(10.0, 5.0, 1, Position::BigBlind),
            &equity(0.5),
            &solved(&entries),
        );
        let call = |set: &RecommendationSet| set.get(Action::Call).unwrap().frequency;
        assert!((call(&ip) - 0.5).abs() < 1e-12);
        assert!(call(&oop) < 0.5);
        assert!((oop.total_frequency() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multiway_spots_favor_folding() {
        let entries = [(Action::Fold, 0.5, 0.0), (Action::Call, 0.5, 5.0)];
        let set = recommend(
            &state(10.0, 5.0, 4, Position::Button),
            &equity(0.3),
            &solved(&entries),
        );
        assert_eq!(set.best().unwrap().action, Action::Fold);
        assert!(set.best().unwrap().reasoning.starts_with("Fold"));
    }

    #[test]
    fn ties_break_on_ev_then_action_order() {
        let entries = [
            (Action::Check, 0.5, 0.0),
            (Action::Bet(BetSize::Pot), 0.5, 10.0),
        ];
        let set = recommend(&state(10.0, 0.0, 1, Position::Button), &equity(0.9), &solved(&entries));
        // equal frequency: the bet has the larger EV
        assert_eq!(set.visible()[0].action, Action::Bet(BetSize::Pot));
    }

    #[test]
    fn something_is_always_visible() {
        let entries = (0..4)
            .map(|_| (Action::Check, 0.25, 0.0))
            .collect::<Vec<_>>();
        let set = recommend_with_cutoff(
            &state(10.0, 0.0, 1, Position::Button),
            &equity(0.5),
            &solved(&entries),
            0.5,
        );
        assert_eq!(set.visible().len(), 1);
        assert_eq!(set.suppressed().len(), 3);
    }
}
