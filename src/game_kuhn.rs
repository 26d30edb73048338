use crate::game_node::*;

/// Kuhn poker: three cards (J, Q, K), one-chip antes, one bet of one chip.
/// Actions are 0 => check/fold and 1 => bet/call.
#[derive(Clone, Debug, Default)]
pub struct KuhnNode {
    public_info_set: PublicInfoSet,
}

/// Probability of each ordered deal of two distinct cards.
const DEAL_PROB: f64 = 1.0 / 6.0;

impl GameNode for KuhnNode {
    #[inline]
    fn is_terminal_node(&self) -> bool {
        match self.public_info_set.as_slice() {
            [0, 1] => false,
            [_, _] => true,
            [_, _, _] => true,
            _ => false,
        }
    }

    #[inline]
    fn current_player(&self) -> usize {
        self.public_info_set.len() % 2
    }

    #[inline]
    fn num_actions(&self) -> usize {
        2
    }

    #[inline]
    fn play(&self, action: usize) -> Self {
        assert!(!self.is_terminal_node(), "play after terminal node");
        let mut ret = self.clone();
        ret.public_info_set.push(action as u8);
        ret
    }

    #[inline]
    fn public_info_set(&self) -> &PublicInfoSet {
        &self.public_info_set
    }

    #[inline]
    fn private_info_set_len(&self) -> usize {
        3
    }

    #[inline]
    fn evaluate(&self, player: usize, pmi: &[f64]) -> Vec<f64> {
        let mut ret = Vec::new();
        for i in 0..self.private_info_set_len() {
            let mut cfvalue = 0.0;
            for j in 0..self.private_info_set_len() {
                if i == j {
                    continue;
                }
                cfvalue += DEAL_PROB * self.payoff(player, i, j) * pmi[j];
            }
            ret.push(cfvalue);
        }
        ret
    }
}

impl KuhnNode {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn public_info_set_str(info_set: &PublicInfoSet) -> String {
        match info_set.as_slice() {
            [] => "(Empty)",
            [0] => "Check",
            [1] => "Bet",
            [0, 1] => "Check => Bet",
            _ => "(Terminal)",
        }
        .into()
    }

    #[inline]
    fn payoff(&self, player: usize, my_card: usize, opp_card: usize) -> f64 {
        if let [0, 0] = self.public_info_set.as_slice() {
            // check => check
            if my_card > opp_card {
                1.0
            } else {
                -1.0
            }
        } else if self.public_info_set.last() == Some(&0) {
            // last player folded
            if self.current_player() == player {
                1.0
            } else {
                -1.0
            }
        } else {
            // last player called
            if my_card > opp_card {
                2.0
            } else {
                -2.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_histories() {
        let root = KuhnNode::new();
        assert!(!root.is_terminal_node());
        assert!(root.play(0).play(0).is_terminal_node());
        assert!(root.play(1).play(0).is_terminal_node());
        assert!(!root.play(0).play(1).is_terminal_node());
        assert!(root.play(0).play(1).play(1).is_terminal_node());
        assert_eq!(root.play(0).play(1).current_player(), 0);
    }

    #[test]
    fn folder_loses_the_ante() {
        // bet => fold: player 0 wins one chip whatever the cards
        let node = KuhnNode::new().play(1).play(0);
        let values = node.evaluate(0, &[1.0, 1.0, 1.0]);
        for v in values {
            assert!((v - 2.0 * DEAL_PROB).abs() < 1e-12);
        }
    }

    #[test]
    fn payoffs_are_zero_sum() {
        let ones = [1.0; 3];
        for history in [vec![0, 0], vec![1, 0], vec![1, 1], vec![0, 1, 0], vec![0, 1, 1]] {
            let mut node = KuhnNode::new();
            for a in history {
                node = node.play(a);
            }
            let total = node.evaluate(0, &ones).iter().sum::<f64>()
                + node.evaluate(1, &ones).iter().sum::<f64>();
            assert!(total.abs() < 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "terminal")]
    fn cannot_play_after_showdown() {
        KuhnNode::new().play(0).play(0).play(1);
    }
}
