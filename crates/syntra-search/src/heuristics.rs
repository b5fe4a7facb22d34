//! Heuristics ordering the expansion worklist.
//!
//! A heuristic assigns every open node a cost; the search expands the node
//! with the smallest cost first. Heuristics are purely advisory: they change
//! the order of expansion, never the labels. Composite heuristics combine
//! weighted components.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use syntra_automata::Action;

use crate::tree::{NodeId, SearchTree};

/// A cost function over open search nodes; smaller costs are expanded first
pub trait Heuristic {
    /// Compute the cost of a node
    fn compute_cost(&mut self, tree: &SearchTree, node: NodeId) -> i64;
}

/// Expands nodes in creation order (breadth-first)
#[derive(Debug, Default)]
pub struct BfsHeuristic {
    counter: i64,
}

impl Heuristic for BfsHeuristic {
    fn compute_cost(&mut self, _tree: &SearchTree, _node: NodeId) -> i64 {
        self.counter += 1;
        self.counter
    }
}

/// Expands the most recently created node first (depth-first)
#[derive(Debug, Default)]
pub struct DfsHeuristic {
    counter: i64,
}

impl Heuristic for DfsHeuristic {
    fn compute_cost(&mut self, _tree: &SearchTree, _node: NodeId) -> i64 {
        self.counter += 1;
        -self.counter
    }
}

/// Prefers nodes reached via few region increments (short paths in time)
#[derive(Debug, Default)]
pub struct TimeHeuristic;

impl Heuristic for TimeHeuristic {
    fn compute_cost(&mut self, tree: &SearchTree, node: NodeId) -> i64 {
        let mut cost = 0;
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some((increments, _)) = &tree.node(id).incoming {
                // The node is reachable by its smallest increment.
                if let Some(increment) = increments.first() {
                    cost += i64::from(*increment);
                }
            }
            current = tree.node(id).parent;
        }
        cost
    }
}

/// Prefers nodes reached via an environment action
///
/// Expanding environment moves early exposes losing branches before effort
/// is spent below them.
#[derive(Debug)]
pub struct PreferEnvironmentActionHeuristic {
    environment_actions: BTreeSet<Action>,
}

impl PreferEnvironmentActionHeuristic {
    /// Create the heuristic for the given environment actions
    pub fn new(environment_actions: BTreeSet<Action>) -> Self {
        PreferEnvironmentActionHeuristic {
            environment_actions,
        }
    }
}

impl Heuristic for PreferEnvironmentActionHeuristic {
    fn compute_cost(&mut self, tree: &SearchTree, node: NodeId) -> i64 {
        match &tree.node(node).incoming {
            Some((_, action)) if self.environment_actions.contains(action) => 0,
            _ => 1,
        }
    }
}

/// Prefers nodes with few canonical words (small branching)
#[derive(Debug, Default)]
pub struct NumCanonicalWordsHeuristic;

impl Heuristic for NumCanonicalWordsHeuristic {
    fn compute_cost(&mut self, tree: &SearchTree, node: NodeId) -> i64 {
        tree.node(node).words.len() as i64
    }
}

/// A deterministic random tiebreak
///
/// Seeded explicitly so that runs are reproducible.
#[derive(Debug)]
pub struct RandomTiebreakHeuristic {
    rng: StdRng,
}

impl RandomTiebreakHeuristic {
    /// Create the heuristic with the given seed
    pub fn new(seed: u64) -> Self {
        RandomTiebreakHeuristic {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Heuristic for RandomTiebreakHeuristic {
    fn compute_cost(&mut self, _tree: &SearchTree, _node: NodeId) -> i64 {
        self.rng.gen_range(0..1024)
    }
}

/// A weighted sum of component heuristics
pub struct CompositeHeuristic {
    components: Vec<(i64, Box<dyn Heuristic>)>,
}

impl CompositeHeuristic {
    /// Create a composite from (weight, heuristic) pairs
    pub fn new(components: Vec<(i64, Box<dyn Heuristic>)>) -> Self {
        CompositeHeuristic { components }
    }
}

impl Heuristic for CompositeHeuristic {
    fn compute_cost(&mut self, tree: &SearchTree, node: NodeId) -> i64 {
        self.components
            .iter_mut()
            .map(|(weight, heuristic)| *weight * heuristic.compute_cost(tree, node))
            .sum()
    }
}
