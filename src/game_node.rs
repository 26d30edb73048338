pub type PublicInfoSet = Vec<u8>;

/// A node of a two-player zero-sum game tree whose private information is a
/// vector: one entry per hand (or bucket) a player might hold.
pub trait GameNode: Sized {
    /// Returns whether the current node is a terminal node.
    fn is_terminal_node(&self) -> bool;

    /// Returns the current player's index.
    fn current_player(&self) -> usize;

    /// Returns the number of possible actions.
    fn num_actions(&self) -> usize;

    /// Returns a set of valid actions.
    #[inline]
    fn actions(&self) -> std::ops::Range<usize> {
        0..self.num_actions()
    }

    /// Plays `action` and returns a node after `action` played.
    /// Panics when called on a terminal node.
    fn play(&self, action: usize) -> Self;

    /// Returns the public information set.
    fn public_info_set(&self) -> &PublicInfoSet;

    /// Returns the length of private information set.
    fn private_info_set_len(&self) -> usize;

    /// Computes player's counterfactual values according to `pmi`, the
    /// opponent's reach probabilities. Chance probabilities of the private
    /// deal are folded into the result.
    fn evaluate(&self, player: usize, pmi: &[f64]) -> Vec<f64>;
}
