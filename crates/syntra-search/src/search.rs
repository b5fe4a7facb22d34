//! The game-tree search deciding controllability.
//!
//! The search seeds the tree with the canonical word of the initial joint
//! (plant, ATA) configuration and expands nodes from a worklist ordered by a
//! heuristic. A node whose word set contains an accepting joint
//! configuration is labeled [`NodeLabel::Top`]; a node covered by an
//! ancestor is labeled [`NodeLabel::Canceled`]; a node without successors is
//! labeled [`NodeLabel::Bottom`]. Labels propagate to a fixpoint after every
//! change, and the search stops as soon as the root is decided.

use std::cmp::Reverse;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use log::{debug, trace};

use syntra_automata::regions::RegionIndex;
use syntra_automata::Action;
use syntra_logic::translator::SpecAta;

use crate::canonical_word::{
    canonical_word, is_set_dominated, CanonicalWord, CanonicalWordError,
};
use crate::heuristics::Heuristic;
use crate::plant::Plant;
use crate::successors::{candidate, symbol_successors, time_successors, SymbolSuccessors};
use crate::tree::{NodeId, NodeKind, NodeLabel, SearchTree};

/// A cloneable token to cancel a running search
///
/// Cancellation is checked before every node expansion; a cancelled search
/// leaves the tree in a consistent, partially expanded state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new, uncancelled token
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a finished [`TreeSearch::build_tree`] run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The search ran to completion (root decided or worklist exhausted)
    Finished,
    /// The search was cancelled; the tree may be resumed or discarded
    Cancelled,
}

/// Errors raised when setting up a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchSetupError {
    /// The controller and environment action sets overlap
    OverlappingActions(BTreeSet<Action>),
    /// The action sets do not cover the plant's alphabet
    IncompleteActionPartition(BTreeSet<Action>),
    /// The initial configuration has no valid canonical word
    InvalidWord(CanonicalWordError),
}

impl fmt::Display for SearchSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchSetupError::OverlappingActions(actions) => write!(
                f,
                "controller and environment actions overlap: {}",
                syntra_display_utils::join_iterator(actions.iter(), ", ")
            ),
            SearchSetupError::IncompleteActionPartition(actions) => write!(
                f,
                "plant actions assigned to neither player: {}",
                syntra_display_utils::join_iterator(actions.iter(), ", ")
            ),
            SearchSetupError::InvalidWord(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SearchSetupError {}

impl From<CanonicalWordError> for SearchSetupError {
    fn from(err: CanonicalWordError) -> Self {
        SearchSetupError::InvalidWord(err)
    }
}

/// Errors raised while the search runs
///
/// These indicate defects in the successor computation; they are surfaced
/// instead of being swallowed into labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A successor produced an invalid canonical word
    InvalidWord(CanonicalWordError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidWord(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<CanonicalWordError> for SearchError {
    fn from(err: CanonicalWordError) -> Self {
        SearchError::InvalidWord(err)
    }
}

/// The symbolic game-tree search
///
/// Decides whether the controller can restrict the plant's behavior such
/// that every emitted timed word satisfies the specification represented by
/// the ATA.
pub struct TreeSearch<'a, P: Plant> {
    plant: &'a P,
    ata: &'a SpecAta,
    controller_actions: BTreeSet<Action>,
    environment_actions: BTreeSet<Action>,
    k: u32,
    tree: SearchTree,
    queue: BinaryHeap<Reverse<(i64, u64, usize)>>,
    heuristic: Box<dyn Heuristic>,
    cancellation: CancellationToken,
    /// All distinct canonical words encountered, keyed by hash; shared and
    /// read-mostly
    word_table: RwLock<HashSet<u64>>,
    sequence: u64,
}

impl<'a, P: Plant> TreeSearch<'a, P> {
    /// Initialize the search
    ///
    /// The controller and environment actions must be disjoint and together
    /// cover the plant's alphabet; `k` must be at least the largest constant
    /// of plant and specification.
    pub fn new(
        plant: &'a P,
        ata: &'a SpecAta,
        controller_actions: BTreeSet<Action>,
        environment_actions: BTreeSet<Action>,
        k: u32,
        heuristic: Box<dyn Heuristic>,
    ) -> Result<Self, SearchSetupError> {
        let overlap: BTreeSet<Action> = controller_actions
            .intersection(&environment_actions)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(SearchSetupError::OverlappingActions(overlap));
        }
        let covered: BTreeSet<Action> = controller_actions
            .union(&environment_actions)
            .cloned()
            .collect();
        let uncovered: BTreeSet<Action> =
            plant.actions().difference(&covered).cloned().collect();
        if !uncovered.is_empty() {
            return Err(SearchSetupError::IncompleteActionPartition(uncovered));
        }

        let initial_word = canonical_word(
            &plant.initial_configuration(),
            &ata.initial_configuration(),
            k,
        )?;
        let tree = SearchTree::new(BTreeSet::from([initial_word]));
        let mut search = TreeSearch {
            plant,
            ata,
            controller_actions,
            environment_actions,
            k,
            tree,
            queue: BinaryHeap::new(),
            heuristic,
            cancellation: CancellationToken::new(),
            word_table: RwLock::new(HashSet::new()),
            sequence: 0,
        };
        search.enqueue(search.tree.root());
        Ok(search)
    }

    /// Install a cancellation token; the caller keeps a clone
    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    /// The search tree
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// The label of the root node
    pub fn root_label(&self) -> NodeLabel {
        self.tree.node(self.tree.root()).label
    }

    /// The controller actions
    pub fn controller_actions(&self) -> &BTreeSet<Action> {
        &self.controller_actions
    }

    /// The environment actions
    pub fn environment_actions(&self) -> &BTreeSet<Action> {
        &self.environment_actions
    }

    /// The number of distinct canonical words encountered so far
    pub fn distinct_word_count(&self) -> usize {
        self.word_table
            .read()
            .map(|table| table.len())
            .unwrap_or(0)
    }

    /// Expand a single node from the worklist
    ///
    /// Returns `false` when there is nothing left to do: the worklist is
    /// empty or the root has been decided.
    pub fn step(&mut self) -> Result<bool, SearchError> {
        if self.root_label() != NodeLabel::Unknown {
            return Ok(false);
        }
        let Some(Reverse((_, _, index))) = self.queue.pop() else {
            return Ok(false);
        };
        let id = NodeId(index);
        if self.tree.node(id).label != NodeLabel::Unknown {
            // Already decided through propagation.
            return Ok(true);
        }
        if self
            .tree
            .ancestors(id)
            .any(|ancestor| self.tree.node(ancestor).label != NodeLabel::Unknown)
        {
            // The node can no longer influence the outcome.
            return Ok(true);
        }
        self.expand(id)?;
        Ok(true)
    }

    /// Run the search until the root is decided, the worklist is exhausted,
    /// or the search is cancelled
    pub fn build_tree(&mut self) -> Result<SearchStatus, SearchError> {
        loop {
            if self.cancellation.is_cancelled() {
                debug!("Search cancelled after {} nodes", self.tree.len());
                return Ok(SearchStatus::Cancelled);
            }
            if !self.step()? {
                debug!(
                    "Search finished with {} nodes, {} distinct words",
                    self.tree.len(),
                    self.distinct_word_count()
                );
                return Ok(SearchStatus::Finished);
            }
        }
    }

    /// Resolve all remaining labels
    ///
    /// Canceled nodes whose covering ancestor is still undecided count as
    /// winning for the controller: the covered node can replay the
    /// ancestor's strategy indefinitely. Afterwards the propagation rules
    /// are applied bottom-up until every expanded node is decided.
    pub fn label(&mut self) {
        loop {
            let mut changed = false;
            for id in self.tree.ids().rev() {
                if self.tree.node(id).label != NodeLabel::Unknown {
                    continue;
                }
                if let Some(label) = self.derived_label(id, true) {
                    self.tree.node_mut(id).label = label;
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
    }

    fn enqueue(&mut self, id: NodeId) {
        let cost = self.heuristic.compute_cost(&self.tree, id);
        self.sequence += 1;
        self.queue.push(Reverse((cost, self.sequence, id.0)));
    }

    /// Check whether some word of the node contains an accepting joint
    /// configuration
    fn is_accepting_node(&self, id: NodeId) -> Result<bool, SearchError> {
        for word in &self.tree.node(id).words {
            let (plant_configuration, ata_configuration) = candidate(word)?;
            if self.plant.is_accepting_configuration(&plant_configuration)
                && self.ata.is_accepting_configuration(&ata_configuration)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Find an ancestor whose word set covers the node's word set
    fn dominating_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let words = &self.tree.node(id).words;
        self.tree
            .ancestors(id)
            .find(|ancestor| is_set_dominated(words, &self.tree.node(*ancestor).words))
    }

    fn expand(&mut self, id: NodeId) -> Result<(), SearchError> {
        trace!("Expanding {id}");
        if self.is_accepting_node(id)? {
            trace!("{id} contains an accepting configuration");
            self.decide(id, NodeLabel::Top);
            return Ok(());
        }
        if let Some(ancestor) = self.dominating_ancestor(id) {
            trace!("{id} is dominated by its ancestor {ancestor}");
            let node = self.tree.node_mut(id);
            node.label = NodeLabel::Canceled;
            node.dominating_ancestor = Some(ancestor);
            self.propagate_from(id);
            return Ok(());
        }

        // Materialize the successors. Children are grouped by action and
        // successor class: increments whose successors coincide collapse
        // into a single child carrying the set of increments.
        let words: Vec<CanonicalWord> = self.tree.node(id).words.iter().cloned().collect();
        let actions = self.plant.actions();
        let mut children: BTreeMap<(Action, BTreeSet<CanonicalWord>), BTreeSet<RegionIndex>> =
            BTreeMap::new();
        let mut violations: BTreeMap<(Action, BTreeSet<CanonicalWord>), BTreeSet<RegionIndex>> =
            BTreeMap::new();
        for word in &words {
            for (increment, successor) in time_successors(word, self.k) {
                let (plant_configuration, ata_configuration) = candidate(&successor)?;
                for action in &actions {
                    match symbol_successors(
                        self.plant,
                        self.ata,
                        &plant_configuration,
                        &ata_configuration,
                        &action,
                        self.k,
                    )? {
                        SymbolSuccessors::Disabled => {}
                        SymbolSuccessors::SpecViolation(next) => {
                            violations
                                .entry((action.clone(), next))
                                .or_default()
                                .insert(increment);
                        }
                        SymbolSuccessors::Joint(next) => {
                            children
                                .entry((action.clone(), next))
                                .or_default()
                                .insert(increment);
                        }
                    }
                }
            }
        }
        self.tree.node_mut(id).expanded = true;
        if children.is_empty() && violations.is_empty() {
            // A rejecting dead end: the plant is stuck without acceptance.
            trace!("{id} has no successors");
            self.decide(id, NodeLabel::Bottom);
            return Ok(());
        }
        if let Ok(mut table) = self.word_table.write() {
            for (_, word_set) in children.keys().chain(violations.keys()) {
                for word in word_set {
                    let mut hasher = DefaultHasher::new();
                    word.hash(&mut hasher);
                    table.insert(hasher.finish());
                }
            }
        }
        for ((action, child_words), increments) in children {
            let child = self.tree.add_child(id, child_words, (increments, action));
            self.enqueue(child);
        }
        // The plant can continue past the specification: those moves lose
        // immediately.
        for ((action, child_words), increments) in violations {
            let child = self.tree.add_child(id, child_words, (increments, action));
            trace!("{child} continues the plant outside the specification");
            self.decide(child, NodeLabel::Bottom);
        }
        Ok(())
    }

    /// Set a label and propagate the change towards the root
    fn decide(&mut self, id: NodeId, label: NodeLabel) {
        debug_assert!(self.tree.node(id).label == NodeLabel::Unknown);
        self.tree.node_mut(id).label = label;
        self.propagate_from(id);
    }

    /// Propagate a label change upwards to a fixpoint
    ///
    /// Labels are monotone: a node moves from `Unknown` to a decided label
    /// exactly once. Deciding a node may also decide canceled nodes covered
    /// by it, so those are re-propagated as well.
    fn propagate_from(&mut self, changed: NodeId) {
        let mut stack = vec![changed];
        while let Some(id) = stack.pop() {
            // Canceled nodes covered by a freshly decided node obtain an
            // effective label; their parents may now resolve.
            if matches!(
                self.tree.node(id).label,
                NodeLabel::Top | NodeLabel::Bottom
            ) {
                let dependents: Vec<NodeId> = self
                    .tree
                    .ids()
                    .filter(|other| {
                        self.tree.node(*other).label == NodeLabel::Canceled
                            && self.tree.node(*other).dominating_ancestor == Some(id)
                    })
                    .collect();
                stack.extend(dependents);
            }
            let Some(parent) = self.tree.node(id).parent else {
                continue;
            };
            if self.tree.node(parent).label != NodeLabel::Unknown {
                continue;
            }
            if let Some(label) = self.derived_label(parent, false) {
                trace!("Propagating: {parent} becomes {label}");
                self.tree.node_mut(parent).label = label;
                stack.push(parent);
            }
        }
    }

    /// The effective label of a child for its parent's resolution
    ///
    /// In the final pass, canceled nodes with an undecided covering ancestor
    /// count as `Top`.
    fn effective_label(&self, id: NodeId, final_pass: bool) -> Option<NodeLabel> {
        let node = self.tree.node(id);
        match node.label {
            NodeLabel::Top => Some(NodeLabel::Top),
            NodeLabel::Bottom => Some(NodeLabel::Bottom),
            NodeLabel::Unknown => None,
            NodeLabel::Canceled => match node
                .dominating_ancestor
                .map(|ancestor| self.tree.node(ancestor).label)
            {
                Some(NodeLabel::Top) => Some(NodeLabel::Top),
                Some(NodeLabel::Bottom) => Some(NodeLabel::Bottom),
                _ if final_pass => Some(NodeLabel::Top),
                _ => None,
            },
        }
    }

    /// Derive a node's label from its children, if determined
    fn derived_label(&self, id: NodeId, final_pass: bool) -> Option<NodeLabel> {
        let node = self.tree.node(id);
        if !node.expanded || node.children.is_empty() {
            return None;
        }
        let labels: Vec<Option<NodeLabel>> = node
            .children
            .iter()
            .map(|child| self.effective_label(*child, final_pass))
            .collect();
        match node.kind {
            NodeKind::Controller => {
                if labels.iter().any(|l| *l == Some(NodeLabel::Top)) {
                    Some(NodeLabel::Top)
                } else if labels.iter().all(|l| *l == Some(NodeLabel::Bottom)) {
                    Some(NodeLabel::Bottom)
                } else {
                    None
                }
            }
            NodeKind::Environment => {
                if labels.iter().any(|l| *l == Some(NodeLabel::Bottom)) {
                    Some(NodeLabel::Bottom)
                } else if labels.iter().all(|l| *l == Some(NodeLabel::Top)) {
                    Some(NodeLabel::Top)
                } else {
                    None
                }
            }
        }
    }
}
