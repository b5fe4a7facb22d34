//! Symbolic search for a controller against a metric temporal specification.
//!
//! Given a plant (anything implementing [`plant::Plant`], typically a timed
//! automaton), an alternating timed automaton obtained from an MTL formula,
//! and a partition of the action alphabet into controller- and
//! environment-controlled actions, [`search::TreeSearch`] decides whether
//! the controller has a winning strategy. The search works on
//! [`canonical_word::CanonicalWord`]s, the region abstraction of joint
//! (plant, ATA) configurations, and expands an AND/OR game tree whose nodes
//! are labeled bottom-up. From a solved tree,
//! [`controller::create_controller`] emits the strategy as a timed
//! automaton.

pub mod canonical_word;
pub mod controller;
pub mod heuristics;
pub mod plant;
pub mod search;
pub mod successors;
pub mod tree;

pub use search::{CancellationToken, SearchStatus, TreeSearch};
pub use tree::{NodeLabel, SearchTree};
