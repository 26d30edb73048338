use crate::abstraction::Abstraction;
use crate::action::{Action, BetSize};
use crate::game_node::*;
use crate::game_state::{GameState, Position, Street};
use std::sync::Arc;

/// Sized bets and raises allowed in one tree; beyond this only fold, call
/// and all-in remain.
pub const MAX_AGGRESSIONS: u8 = 2;

/// Share of raw equity converted when betting continues on later streets.
pub const REALIZATION_IN_POSITION: f64 = 1.0;
pub const REALIZATION_OUT_OF_POSITION: f64 = 0.8;

/// Who acts first in the modelled betting round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Root {
    /// Hero acts first. With `open_or_fold` the options are fold or raise.
    Hero { open_or_fold: bool },
    /// The opponent chooses between checking and the observed bet of `bet`.
    Villain { bet: f64 },
}

/// Shared description of one betting round. Player 0 is hero, player 1 the
/// representative opponent.
#[derive(Debug)]
pub struct HoldemGame {
    abstraction: Abstraction,
    dead: f64,
    stack: f64,
    street: Street,
    root: Root,
    realized: [Vec<Vec<f64>>; 2],
}

impl HoldemGame {
    pub fn new(
        abstraction: Abstraction,
        dead: f64,
        stack: f64,
        street: Street,
        root: Root,
        hero_in_position: bool,
    ) -> Arc<Self> {
        let (r_hero, r_villain) = if hero_in_position {
            (REALIZATION_IN_POSITION, REALIZATION_OUT_OF_POSITION)
        } else {
            (REALIZATION_OUT_OF_POSITION, REALIZATION_IN_POSITION)
        };
        let realized = [
            realize(abstraction.share(), r_hero, r_villain),
            realize(abstraction.share(), r_villain, r_hero),
        ];
        Arc::new(Self {
            abstraction,
            dead,
            stack,
            street,
            root,
            realized,
        })
    }

    /// The betting round hero faces in `state`.
    pub fn from_state(state: &GameState, abstraction: Abstraction) -> Arc<Self> {
        let root = if state.to_call() > 0.0 {
            Root::Villain {
                bet: state.to_call(),
            }
        } else {
            Root::Hero {
                open_or_fold: state.street() == Street::Preflop
                    && state.position() != Position::BigBlind,
            }
        };
        Self::new(
            abstraction,
            state.pot() - state.to_call(),
            state.stack(),
            state.street(),
            root,
            state.in_position(),
        )
    }

    pub fn root(self: &Arc<Self>) -> HoldemNode {
        let player = match self.root {
            Root::Hero { .. } => 0,
            Root::Villain { .. } => 1,
        };
        let mut node = HoldemNode {
            game: Arc::clone(self),
            history: Vec::new(),
            contrib: [0.0; 2],
            player,
            aggressions: 0,
            checked: false,
            terminal: None,
            actions: Vec::new(),
        };
        node.actions = node.legal();
        node
    }

    /// History of hero's first decision.
    pub fn hero_decision(&self) -> PublicInfoSet {
        match self.root {
            Root::Hero { .. } => Vec::new(),
            Root::Villain { .. } => vec![1],
        }
    }

    pub fn abstraction(&self) -> &Abstraction {
        &self.abstraction
    }

    /// Chips already in the pot when the round starts.
    pub fn dead(&self) -> f64 {
        self.dead
    }

    pub fn stack(&self) -> f64 {
        self.stack
    }
}

/// Showdown shares after equity realization. Rows stay zero-sum against the
/// opponent's matrix.
fn realize(share: &[Vec<f64>], mine: f64, theirs: f64) -> Vec<Vec<f64>> {
    share
        .iter()
        .map(|row| {
            row.iter()
                .map(|&s| {
                    let denom = s * mine + (1.0 - s) * theirs;
                    if denom > 0.0 {
                        s * mine / denom
                    } else {
                        s
                    }
                })
                .collect()
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Terminal {
    Fold { folder: usize },
    Showdown { all_in: bool },
}

#[derive(Clone, Debug)]
pub struct HoldemNode {
    game: Arc<HoldemGame>,
    history: PublicInfoSet,
    contrib: [f64; 2],
    player: usize,
    aggressions: u8,
    checked: bool,
    terminal: Option<Terminal>,
    actions: Vec<(Action, f64)>,
}

impl GameNode for HoldemNode {
    #[inline]
    fn is_terminal_node(&self) -> bool {
        self.terminal.is_some()
    }

    #[inline]
    fn current_player(&self) -> usize {
        self.player
    }

    #[inline]
    fn num_actions(&self) -> usize {
        self.actions.len()
    }

    fn play(&self, action: usize) -> Self {
        assert!(
            self.terminal.is_none(),
            "play after terminal node {:?}",
            self.history
        );
        let (kind, total) = self.actions[action];
        let p = self.player;
        let mut ret = self.clone();
        ret.history.push(action as u8);

        match kind {
            Action::Fold => ret.terminal = Some(Terminal::Fold { folder: p }),
            Action::Check => {
                let closes = self.checked || matches!(self.game.root, Root::Villain { .. });
                if closes {
                    ret.terminal = Some(Terminal::Showdown { all_in: false });
                } else {
                    ret.checked = true;
                    ret.player = 1 - p;
                }
            }
            Action::Call => {
                ret.contrib[p] = total;
                ret.terminal = Some(Terminal::Showdown {
                    all_in: total >= self.game.stack,
                });
            }
            Action::Bet(_) | Action::Raise(_) | Action::AllIn => {
                ret.contrib[p] = total;
                ret.aggressions += 1;
                ret.player = 1 - p;
            }
        }

        ret.actions = if ret.terminal.is_some() {
            Vec::new()
        } else {
            ret.legal()
        };
        ret
    }

    #[inline]
    fn public_info_set(&self) -> &PublicInfoSet {
        &self.history
    }

    #[inline]
    fn private_info_set_len(&self) -> usize {
        self.game.abstraction.num_buckets()
    }

    fn evaluate(&self, player: usize, pmi: &[f64]) -> Vec<f64> {
        let game = &self.game;
        let prior = game.abstraction.prior();
        let half_dead = game.dead / 2.0;

        match self.terminal {
            Some(Terminal::Fold { folder }) => {
                let won = half_dead + self.contrib[folder];
                let payoff = if player == folder { -won } else { won };
                let reach = prior
                    .iter()
                    .zip(pmi)
                    .map(|(p, m)| p * m)
                    .sum::<f64>();
                prior.iter().map(|p| p * payoff * reach).collect()
            }
            Some(Terminal::Showdown { all_in }) => {
                let share = if all_in || game.street == Street::River {
                    game.abstraction.share()
                } else {
                    &game.realized[player][..]
                };
                let total = game.dead + self.contrib[0] + self.contrib[1];
                let base = -self.contrib[player] - half_dead;
                prior
                    .iter()
                    .zip(share)
                    .map(|(p_i, row)| {
                        let cfvalue = row
                            .iter()
                            .zip(prior.iter().zip(pmi))
                            .map(|(s, (p_j, m))| p_j * m * (s * total + base))
                            .sum::<f64>();
                        p_i * cfvalue
                    })
                    .collect()
            }
            None => panic!("evaluate called on a decision node {:?}", self.history),
        }
    }
}

impl HoldemNode {
    /// Actions available at this node, in index order.
    pub fn legal_actions(&self) -> Vec<Action> {
        self.actions.iter().map(|(a, _)| *a).collect()
    }

    /// Chips the acting player adds with `action`.
    pub fn amount(&self, action: usize) -> f64 {
        self.actions[action].1 - self.contrib[self.player]
    }

    /// Chips in the middle at this node.
    pub fn pot(&self) -> f64 {
        self.game.dead + self.contrib[0] + self.contrib[1]
    }

    /// Amount the acting player must add to continue.
    pub fn facing(&self) -> f64 {
        (self.contrib[1 - self.player] - self.contrib[self.player]).max(0.0)
    }

    fn legal(&self) -> Vec<(Action, f64)> {
        let game = &self.game;
        let p = self.player;
        let o = 1 - p;
        let cap = game.stack;

        if self.history.is_empty() {
            if let Root::Villain { bet } = game.root {
                let bet = bet.min(cap);
                let kind = if bet >= cap {
                    Action::AllIn
                } else {
                    Action::Bet(BetSize::Exact)
                };
                return vec![(Action::Check, 0.0), (kind, bet)];
            }
        }
        let open_or_fold = self.history.is_empty()
            && matches!(game.root, Root::Hero { open_or_fold: true });

        let facing = self.facing();
        let mut ret = Vec::new();
        if facing > 0.0 {
            ret.push((Action::Fold, self.contrib[p]));
            ret.push((Action::Call, self.contrib[o]));
            if self.contrib[o] >= cap {
                return ret;
            }
        } else if open_or_fold {
            ret.push((Action::Fold, self.contrib[p]));
        } else {
            ret.push((Action::Check, self.contrib[p]));
        }

        if self.aggressions < MAX_AGGRESSIONS {
            let sizes: &[BetSize] = if self.aggressions == 0 {
                &BetSize::OPENING
            } else {
                &[BetSize::Pot]
            };
            let pot = self.pot();
            for &size in sizes {
                let fraction = size.fraction().unwrap_or(1.0);
                let total = self.contrib[o] + fraction * (pot + facing);
                if total >= cap || total <= self.contrib[o] {
                    continue;
                }
                let kind = if facing > 0.0 || open_or_fold {
                    Action::Raise(size)
                } else {
                    Action::Bet(size)
                };
                ret.push((kind, total));
            }
        }

        ret.push((Action::AllIn, cap));
        ret
    }
}
