//! Extraction of a controller from a solved search tree.
//!
//! The controller is a timed automaton over the winning part of the tree:
//! one location per included node, one transition per group of consecutive
//! region increments of an action. Guards reconstruct the time window of the
//! group from the region steps; canceled children loop back to the location
//! of their covering ancestor.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use syntra_automata::regions::{
    constraints_from_region_index, ConstraintBoundType, RegionIndex,
};
use syntra_automata::ta::builder::{TaBuildError, TimedAutomatonBuilder};
use syntra_automata::ta::{TimedAutomaton, Transition};
use syntra_automata::{Action, ClockConstraint, Location};

use crate::canonical_word::{reg_a, AbRegionSymbol, CanonicalWord};
use crate::successors::nth_time_successor;
use crate::tree::{NodeId, NodeKind, NodeLabel, SearchTree};

/// Errors raised during controller extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The root of the tree is not labeled `Top`
    RootNotTop,
    /// The extracted parts do not form a valid automaton
    Construction(TaBuildError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::RootNotTop => write!(
                f,
                "cannot extract a controller: the controller has no winning strategy"
            ),
            ControllerError::Construction(err) => {
                write!(f, "controller construction failed: {err}")
            }
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<TaBuildError> for ControllerError {
    fn from(err: TaBuildError) -> Self {
        ControllerError::Construction(err)
    }
}

/// The name of the controller location for a tree node
fn node_location(id: NodeId) -> Location {
    Location::new(id.to_string())
}

/// Collect the guard constraints of one time-successor step
///
/// Takes the plant projection of the source word advanced by `increment`
/// region steps and turns each plant state's region into clock constraints
/// with the requested bound type.
fn constraints_from_time_successor(
    word: &CanonicalWord,
    increment: RegionIndex,
    k: u32,
    bound_type: ConstraintBoundType,
) -> BTreeMap<String, Vec<ClockConstraint>> {
    let successor = nth_time_successor(word, increment, k);
    let max_region_index = 2 * k + 1;
    let mut res: BTreeMap<String, Vec<ClockConstraint>> = BTreeMap::new();
    for partition in &successor {
        for symbol in partition {
            if let AbRegionSymbol::Plant(state) = symbol {
                for constraint in constraints_from_region_index(
                    state.region_index,
                    max_region_index,
                    bound_type,
                ) {
                    res.entry(state.clock.clone()).or_default().push(constraint);
                }
            }
        }
    }
    res
}

/// Walks the winning part of the tree and collects the controller parts
struct ControllerParts {
    locations: BTreeSet<Location>,
    clocks: BTreeSet<String>,
    actions: BTreeSet<Action>,
    transitions: Vec<Transition>,
}

impl ControllerParts {
    fn add_transition(
        &mut self,
        source: &Location,
        target: &Location,
        action: &Action,
        guard: BTreeMap<String, Vec<ClockConstraint>>,
    ) {
        self.clocks.extend(guard.keys().cloned());
        self.actions.insert(action.clone());
        let mut transition = Transition::new(source.clone(), action.clone(), target.clone());
        transition.guard = guard;
        self.transitions.push(transition);
    }
}

/// Extract a controller from a solved search tree
///
/// The root must be labeled `Top`. At a controller node exactly one winning
/// child is kept; at an environment node every winning child is kept, which
/// includes in particular every environment action the plant may take. The
/// resulting automaton refines the plant: its runs are plant runs, and by
/// construction they satisfy the specification.
pub fn create_controller(
    tree: &SearchTree,
    k: u32,
) -> Result<TimedAutomaton, ControllerError> {
    if tree.node(tree.root()).label != NodeLabel::Top {
        return Err(ControllerError::RootNotTop);
    }
    let mut parts = ControllerParts {
        locations: BTreeSet::from([node_location(tree.root())]),
        clocks: BTreeSet::new(),
        actions: BTreeSet::new(),
        transitions: Vec::new(),
    };
    add_node(tree, tree.root(), k, &mut parts);

    debug!(
        "Extracted a controller with {} locations and {} transitions",
        parts.locations.len(),
        parts.transitions.len()
    );
    let locations = parts.locations.clone();
    Ok(TimedAutomatonBuilder::new()
        .with_locations(parts.locations.iter().cloned())
        .with_alphabet(parts.actions)
        .with_clocks(parts.clocks)
        .with_initial_location(node_location(tree.root()))
        .with_final_locations(locations)
        .with_transitions(parts.transitions)
        .build()?)
}

/// Whether a child is winning for the purpose of extraction
fn is_winning(tree: &SearchTree, id: NodeId) -> bool {
    match tree.node(id).label {
        NodeLabel::Top => true,
        NodeLabel::Canceled => tree
            .node(id)
            .dominating_ancestor
            .is_some_and(|ancestor| tree.node(ancestor).label == NodeLabel::Top),
        _ => false,
    }
}

fn add_node(tree: &SearchTree, id: NodeId, k: u32, parts: &mut ControllerParts) {
    let node = tree.node(id);
    let source = node_location(id);
    // Guards are built from the plant projection of the node's first word;
    // the words of a node agree on the plant region up to the successor
    // grouping.
    let Some(source_word) = node.words.iter().next().map(reg_a) else {
        return;
    };

    // Collect the winning children, one strategy branch per child.
    let mut winning: Vec<NodeId> = node
        .children
        .iter()
        .copied()
        .filter(|child| is_winning(tree, *child))
        .collect();
    if node.kind == NodeKind::Controller {
        // The controller commits to a single choice; keep the first winning
        // child in deterministic order.
        winning.truncate(1);
    }

    for child_id in winning {
        let child = tree.node(child_id);
        let Some((increments, action)) = child.incoming.clone() else {
            continue;
        };
        let target = match child.label {
            NodeLabel::Canceled => match child.dominating_ancestor {
                Some(ancestor) => node_location(ancestor),
                None => node_location(child_id),
            },
            _ => node_location(child_id),
        };
        parts.locations.insert(target.clone());
        // Merge consecutive increments into one transition: the guard's
        // lower bound comes from the first increment of a run, the upper
        // bound from its last.
        let entries: Vec<RegionIndex> = increments.into_iter().collect();
        let mut group_start = 0;
        for i in 0..entries.len() {
            let is_group_end = i + 1 == entries.len() || entries[i + 1] > entries[i] + 1;
            if !is_group_end {
                continue;
            }
            let mut guard = constraints_from_time_successor(
                &source_word,
                entries[group_start],
                k,
                ConstraintBoundType::Lower,
            );
            for (clock, constraints) in constraints_from_time_successor(
                &source_word,
                entries[i],
                k,
                ConstraintBoundType::Upper,
            ) {
                guard.entry(clock).or_default().extend(constraints);
            }
            parts.add_transition(&source, &target, &action, guard);
            group_start = i + 1;
        }
    }

    // Recurse into the winning children that made it into the controller.
    for child in &node.children {
        if tree.node(*child).label == NodeLabel::Top
            && parts.locations.contains(&node_location(*child))
        {
            add_node(tree, *child, k, parts);
        }
    }
}
