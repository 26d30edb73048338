use crate::game_node::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Averaged strategy: for every public information set, one row per action
/// holding the probability of that action for each private state.
pub type Strategy = HashMap<PublicInfoSet, Vec<Vec<f64>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CfrVariant {
    /// Regret-matching+ with linearly weighted averaging.
    Plus,
    /// Plain cumulative regrets with uniform averaging.
    Vanilla,
}

impl Default for CfrVariant {
    fn default() -> Self {
        CfrVariant::Plus
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub iterations: usize,
    /// Stop once exploitability (in units of `scale`) drops below this.
    pub exploitability_threshold: f64,
    /// Exploitability is measured every `check_every` iterations.
    pub check_every: usize,
    pub variant: CfrVariant,
    /// Chips that exploitability is expressed against, usually the root pot.
    pub scale: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploitability_threshold: 0.001,
            check_every: 100,
            variant: CfrVariant::Plus,
            scale: 1.0,
        }
    }
}

/// The reported strategy is the least exploitable averaged strategy seen at
/// any checkpoint, so `history` never increases.
#[derive(Clone, Debug)]
pub struct TrainResult {
    pub strategy: Strategy,
    /// Expected value of the first player under the averaged strategy.
    pub ev: f64,
    /// The first player's counterfactual value for each private state,
    /// weighted by its deal probability; sums to `ev`.
    pub values: Vec<f64>,
    /// Exploitability of the averaged strategy, divided by `scale`.
    pub exploitability: f64,
    pub iterations: usize,
    /// Checkpoint whose averaged strategy is reported.
    pub best_iteration: usize,
    pub converged: bool,
    /// `(iteration, exploitability)` of the reported strategy at every
    /// checkpoint.
    pub history: Vec<(usize, f64)>,
}

/// Vector-scalar multiplication.
#[inline]
fn mul_scalar(vec: &mut [f64], scalar: f64) {
    for el in vec {
        *el *= scalar;
    }
}

/// Force each element to be non-negative.
#[inline]
fn nonneg_vector(vec: &mut [f64]) {
    for el in vec {
        *el = el.max(0.0);
    }
}

/// Element-wise vector addition.
#[inline]
fn add_vector(lhs: &mut [f64], rhs: &[f64]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l += r;
    }
}

/// Element-wise vector subtraction.
#[inline]
fn sub_vector(lhs: &mut [f64], rhs: &[f64]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l -= r;
    }
}

/// Element-wise vector multiplication.
#[inline]
fn mul_vector(lhs: &mut [f64], rhs: &[f64]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l *= r;
    }
}

/// Element-wise vector division. When denominator is zero, `default` value is used.
#[inline]
fn div_vector(lhs: &mut [f64], rhs: &[f64], default: f64) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        if *r == 0.0 {
            *l = default;
        } else {
            *l /= r;
        }
    }
}

/// Element-wise maximum.
#[inline]
fn max_vector(lhs: &mut [f64], rhs: &[f64]) {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l = l.max(*r);
    }
}

/// Rescales every column of `probs` to sum to one.
///
/// Panics when a column is off by more than 1e-9 before rescaling.
fn renormalize(probs: &mut [Vec<f64>]) {
    let len = probs.first().map_or(0, |row| row.len());
    for i in 0..len {
        let sum = probs.iter().map(|row| row[i]).sum::<f64>();
        assert!(
            (sum - 1.0).abs() < 1e-9,
            "strategy column {} sums to {}",
            i,
            sum
        );
        for row in probs.iter_mut() {
            row[i] /= sum;
        }
    }
}

/// Performs regret matching: each column is proportional to the positive
/// part of the cumulative regrets, uniform when none is positive.
pub fn regret_matching(cum_cfr: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut ret = Vec::new();
    let num_actions = cum_cfr.len();
    if num_actions == 0 {
        return ret;
    }
    let private_info_set_len = cum_cfr[0].len();
    let mut denom = vec![0.0; private_info_set_len];
    for cum_cfr_action in cum_cfr {
        let mut tmp = cum_cfr_action.clone();
        nonneg_vector(&mut tmp);
        add_vector(&mut denom, &tmp);
    }
    for cum_cfr_action in cum_cfr {
        let mut tmp = cum_cfr_action.clone();
        nonneg_vector(&mut tmp);
        div_vector(&mut tmp, &denom, 1.0 / num_actions as f64);
        ret.push(tmp);
    }
    renormalize(&mut ret);
    ret
}

/// Normalizes cumulative strategy sums into an average strategy.
fn average_strategy(cum_sgm: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let num_actions = cum_sgm.len();
    if num_actions == 0 {
        return Vec::new();
    }
    let mut denom = vec![0.0; cum_sgm[0].len()];
    for row in cum_sgm {
        add_vector(&mut denom, row);
    }
    let mut ret = cum_sgm
        .iter()
        .map(|row| {
            let mut tmp = row.clone();
            div_vector(&mut tmp, &denom, 1.0 / num_actions as f64);
            tmp
        })
        .collect::<Vec<_>>();
    renormalize(&mut ret);
    ret
}

struct ArenaNode<T> {
    node: T,
    children: Vec<usize>,
    cum_cfr: Vec<Vec<f64>>,
    cum_sgm: Vec<Vec<f64>>,
}

/// Every node of a game tree, stored flat and addressed by index. The
/// lookup table maps public information sets to their node.
pub struct Arena<T> {
    nodes: Vec<ArenaNode<T>>,
    index: HashMap<PublicInfoSet, usize>,
}

impl<T: GameNode> Arena<T> {
    pub fn build(root: T) -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        arena.insert(root);
        log::debug!(
            "game tree: {} nodes, {} decision points",
            arena.nodes.len(),
            arena.nodes.iter().filter(|n| !n.node.is_terminal_node()).count()
        );
        arena
    }

    fn insert(&mut self, node: T) -> usize {
        let id = self.nodes.len();
        let (num_actions, len) = if node.is_terminal_node() {
            (0, 0)
        } else {
            (node.num_actions(), node.private_info_set_len())
        };
        self.index.insert(node.public_info_set().clone(), id);
        let children = if node.is_terminal_node() {
            Vec::new()
        } else {
            node.actions().map(|action| node.play(action)).collect()
        };
        self.nodes.push(ArenaNode {
            node,
            children: Vec::with_capacity(num_actions),
            cum_cfr: vec![vec![0.0; len]; num_actions],
            cum_sgm: vec![vec![0.0; len]; num_actions],
        });
        for child in children {
            let child_id = self.insert(child);
            self.nodes[id].children.push(child_id);
        }
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &T {
        &self.nodes[0].node
    }

    /// Game node stored under `key`.
    pub fn get(&self, key: &PublicInfoSet) -> Option<&T> {
        self.index.get(key).map(|&id| &self.nodes[id].node)
    }

    /// Average strategy of every decision node.
    pub fn strategy(&self) -> Strategy {
        self.nodes
            .iter()
            .filter(|n| !n.node.is_terminal_node())
            .map(|n| (n.node.public_info_set().clone(), average_strategy(&n.cum_sgm)))
            .collect()
    }

    /// Performs counterfactual regret minimization.
    /// Returns: counterfactual value
    fn cfr_rec(
        &mut self,
        id: usize,
        iter: usize,
        player: usize,
        variant: CfrVariant,
        pi: &[f64],
        pmi: &[f64],
    ) -> Vec<f64> {
        // terminal node
        if self.nodes[id].node.is_terminal_node() {
            return self.nodes[id].node.evaluate(player, pmi);
        }

        let children = self.nodes[id].children.clone();
        let mut cfvalue = vec![0.0; self.nodes[id].node.private_info_set_len()];

        // compute current sigma
        let sigma = regret_matching(&self.nodes[id].cum_cfr);

        if self.nodes[id].node.current_player() == player {
            let mut cfvalue_action = Vec::with_capacity(children.len());

            for (action, &child) in children.iter().enumerate() {
                let mut pi = pi.to_vec();
                mul_vector(&mut pi, &sigma[action]);
                let mut tmp = self.cfr_rec(child, iter, player, variant, &pi, pmi);
                cfvalue_action.push(tmp.clone());
                mul_vector(&mut tmp, &sigma[action]);
                add_vector(&mut cfvalue, &tmp);
            }

            // update cumulative regrets and sigmas
            let weight = match variant {
                CfrVariant::Plus => iter as f64,
                CfrVariant::Vanilla => 1.0,
            };
            let arena_node = &mut self.nodes[id];
            for action in 0..children.len() {
                let r = &mut arena_node.cum_cfr[action];
                add_vector(r, &cfvalue_action[action]);
                sub_vector(r, &cfvalue);
                if variant == CfrVariant::Plus {
                    nonneg_vector(r);
                }

                let mut pi = pi.to_vec();
                mul_scalar(&mut pi, weight);
                mul_vector(&mut pi, &sigma[action]);
                add_vector(&mut arena_node.cum_sgm[action], &pi);
            }
        } else {
            for (action, &child) in children.iter().enumerate() {
                let mut pmi = pmi.to_vec();
                mul_vector(&mut pmi, &sigma[action]);
                let tmp = self.cfr_rec(child, iter, player, variant, pi, &pmi);
                add_vector(&mut cfvalue, &tmp);
            }
        }

        cfvalue
    }

    /// Counterfactual values of `player` when both sides follow `strategy`,
    /// or when `player` best-responds if `best_response` is set.
    fn value_rec(
        &self,
        id: usize,
        player: usize,
        strategy: &[Vec<Vec<f64>>],
        best_response: bool,
        pmi: &[f64],
    ) -> Vec<f64> {
        let arena_node = &self.nodes[id];
        if arena_node.node.is_terminal_node() {
            return arena_node.node.evaluate(player, pmi);
        }

        let sigma = &strategy[id];
        if arena_node.node.current_player() == player {
            let init = if best_response { f64::NEG_INFINITY } else { 0.0 };
            let mut cfvalue = vec![init; arena_node.node.private_info_set_len()];
            for (action, &child) in arena_node.children.iter().enumerate() {
                let mut tmp = self.value_rec(child, player, strategy, best_response, pmi);
                if best_response {
                    max_vector(&mut cfvalue, &tmp);
                } else {
                    mul_vector(&mut tmp, &sigma[action]);
                    add_vector(&mut cfvalue, &tmp);
                }
            }
            cfvalue
        } else {
            let mut cfvalue = vec![0.0; arena_node.node.private_info_set_len()];
            for (action, &child) in arena_node.children.iter().enumerate() {
                let mut pmi = pmi.to_vec();
                mul_vector(&mut pmi, &sigma[action]);
                let tmp = self.value_rec(child, player, strategy, best_response, &pmi);
                add_vector(&mut cfvalue, &tmp);
            }
            cfvalue
        }
    }

    fn average_by_id(&self) -> Vec<Vec<Vec<f64>>> {
        self.nodes
            .iter()
            .map(|n| average_strategy(&n.cum_sgm))
            .collect()
    }
}

impl<T: GameNode + Sync> Arena<T> {
    /// Returns the first player's values and the exploitability of the
    /// averaged strategy, both in chips.
    pub fn evaluate_average(&self) -> (Vec<f64>, f64) {
        let strategy = self.average_by_id();
        let root_len = self.root().private_info_set_len();
        let ones = vec![1.0; root_len];
        let values = self.value_rec(0, 0, &strategy, false, &ones);
        let (br0, br1) = rayon::join(
            || self.value_rec(0, 0, &strategy, true, &ones).iter().sum::<f64>(),
            || self.value_rec(0, 1, &strategy, true, &ones).iter().sum::<f64>(),
        );
        (values, (br0 + br1) / 2.0)
    }
}

/// Performs training.
pub fn train<T: GameNode + Sync>(root: T, config: &TrainConfig) -> TrainResult {
    let mut arena = Arena::build(root);
    train_arena(&mut arena, config)
}

/// Trains on a prebuilt arena; regrets carried in the arena are kept.
pub fn train_arena<T: GameNode + Sync>(arena: &mut Arena<T>, config: &TrainConfig) -> TrainResult {
    let len = arena.root().private_info_set_len();
    let pi = vec![1.0; len];
    let check_every = config.check_every.max(1);
    let scale = if config.scale > 0.0 { config.scale } else { 1.0 };

    let mut history = Vec::new();
    let mut converged = false;
    let mut values = vec![0.0; len];
    let mut strategy = Strategy::new();
    let mut exploitability = f64::INFINITY;
    let mut best_iteration = 0;
    let mut done = 0;

    for iter in 1..=config.iterations {
        for player in 0..2 {
            arena.cfr_rec(0, iter, player, config.variant, &pi, &pi);
        }
        done = iter;

        if iter % check_every == 0 || iter == config.iterations {
            let (latest, raw) = arena.evaluate_average();
            let current = raw / scale;
            log::debug!("iteration {}: exploitability {:.3e}", iter, current);
            if current <= exploitability {
                values = latest;
                strategy = arena.strategy();
                exploitability = current;
                best_iteration = iter;
            }
            history.push((iter, exploitability));
            if exploitability < config.exploitability_threshold {
                converged = true;
                break;
            }
        }
    }

    TrainResult {
        strategy,
        ev: values.iter().sum(),
        values,
        exploitability,
        iterations: done,
        best_iteration,
        converged,
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regret_matching_is_proportional_to_positive_regret() {
        let cum_cfr = vec![vec![3.0, -1.0], vec![1.0, -2.0], vec![-5.0, 0.0]];
        let sigma = regret_matching(&cum_cfr);
        assert!((sigma[0][0] - 0.75).abs() < 1e-12);
        assert!((sigma[1][0] - 0.25).abs() < 1e-12);
        assert_eq!(sigma[2][0], 0.0);
        // no positive regret: uniform
        for row in &sigma {
            assert!((row[1] - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn average_strategy_defaults_to_uniform() {
        let avg = average_strategy(&[vec![0.0, 2.0], vec![0.0, 6.0]]);
        assert_eq!(avg[0][0], 0.5);
        assert_eq!(avg[1][1], 0.75);
    }

    #[test]
    #[should_panic(expected = "sums to")]
    fn renormalize_rejects_broken_columns() {
        let mut probs = vec![vec![0.5], vec![0.2]];
        renormalize(&mut probs);
    }

    #[test]
    fn reports_the_least_exploitable_checkpoint() {
        let config = TrainConfig {
            iterations: 2_000,
            exploitability_threshold: 0.0,
            check_every: 50,
            variant: CfrVariant::Vanilla,
            scale: 1.0,
        };
        let result = train(crate::game_kuhn::KuhnNode::new(), &config);
        assert_eq!(result.iterations, 2_000);
        assert!(result.best_iteration <= 2_000 && result.best_iteration % 50 == 0);
        assert!(result
            .history
            .windows(2)
            .all(|pair| pair[1].1 <= pair[0].1));
        let best = result.history.iter().map(|&(_, e)| e).fold(f64::INFINITY, f64::min);
        assert_eq!(result.exploitability, best);
        assert!((result.values.iter().sum::<f64>() - result.ev).abs() < 1e-12);
    }

    #[test]
    fn variants_deserialize_from_lowercase() {
        let v: CfrVariant = serde_json::from_str("\"vanilla\"").unwrap();
        assert_eq!(v, CfrVariant::Vanilla);
        assert_eq!(CfrVariant::default(), CfrVariant::Plus);
    }
}
