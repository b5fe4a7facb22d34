//! End-to-end tests of the game-tree search on small plants.

use std::collections::BTreeSet;

use syntra_automata::ta::builder::TimedAutomatonBuilder;
use syntra_automata::ta::{TimedAutomaton, Transition};
use syntra_automata::{Action, ClockConstraint, Location};
use syntra_logic::translator::translate;
use syntra_logic::{finally, MtlFormula, TimeInterval};
use syntra_search::controller::create_controller;
use syntra_search::heuristics::BfsHeuristic;
use syntra_search::search::SearchStatus;
use syntra_search::{CancellationToken, NodeLabel, TreeSearch};

fn actions(names: &[&str]) -> BTreeSet<Action> {
    names.iter().map(Action::new).collect()
}

/// A plant that can emit `a` forever
fn looping_plant() -> TimedAutomaton {
    TimedAutomatonBuilder::new()
        .with_locations([Location::new("s0"), Location::new("s1")])
        .with_alphabet([Action::new("a")])
        .with_clock("x")
        .with_initial_location(Location::new("s0"))
        .with_final_locations([Location::new("s1")])
        .with_transitions([
            Transition::new(Location::new("s0"), Action::new("a"), Location::new("s1")),
            Transition::new(Location::new("s1"), Action::new("a"), Location::new("s1")),
        ])
        .build()
        .unwrap()
}

/// A plant that can emit `a` exactly once
fn one_shot_plant() -> TimedAutomaton {
    TimedAutomatonBuilder::new()
        .with_locations([Location::new("s0"), Location::new("s1")])
        .with_alphabet([Action::new("a")])
        .with_clock("x")
        .with_initial_location(Location::new("s0"))
        .with_final_locations([Location::new("s1")])
        .with_transition(Transition::new(
            Location::new("s0"),
            Action::new("a"),
            Location::new("s1"),
        ))
        .build()
        .unwrap()
}

#[test]
fn test_search_finds_winning_strategy() {
    let plant = looping_plant();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let mut search = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        BTreeSet::new(),
        0,
        Box::new(BfsHeuristic::default()),
    )
    .unwrap();
    assert_eq!(search.build_tree().unwrap(), SearchStatus::Finished);
    search.label();
    assert_eq!(search.root_label(), NodeLabel::Top);

    // The extracted controller refines the plant and realizes the spec.
    let controller = create_controller(search.tree(), 0).unwrap();
    assert!(controller.alphabet().is_subset(plant.alphabet()));
    let word = vec![(Action::new("a"), 0.), (Action::new("a"), 0.7)];
    assert!(controller.accepts_word(&word).unwrap());
    assert!(plant.accepts_word(&word).unwrap());
}

#[test]
fn test_search_detects_unrealizable_spec() {
    // The plant can emit only one `a`, but the until needs a second symbol
    // to discharge.
    let plant = one_shot_plant();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let mut search = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        BTreeSet::new(),
        0,
        Box::new(BfsHeuristic::default()),
    )
    .unwrap();
    assert_eq!(search.build_tree().unwrap(), SearchStatus::Finished);
    search.label();
    assert_eq!(search.root_label(), NodeLabel::Bottom);
    assert!(create_controller(search.tree(), 0).is_err());
}

#[test]
fn test_guard_semantics_respected_by_search() {
    // s0 -a[x<1]-> s1: the action is only available in the first region.
    let plant = TimedAutomatonBuilder::new()
        .with_locations([Location::new("s0"), Location::new("s1")])
        .with_alphabet([Action::new("a")])
        .with_clock("x")
        .with_initial_location(Location::new("s0"))
        .with_final_locations([Location::new("s1")])
        .with_transitions([
            Transition::new(Location::new("s0"), Action::new("a"), Location::new("s1"))
                .with_guard("x", ClockConstraint::LessThan(1)),
            Transition::new(Location::new("s1"), Action::new("a"), Location::new("s1")),
        ])
        .build()
        .unwrap();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let k = plant.largest_constant().max(spec.largest_constant());
    let mut search = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        BTreeSet::new(),
        k,
        Box::new(BfsHeuristic::default()),
    )
    .unwrap();
    search.build_tree().unwrap();
    search.label();
    assert_eq!(search.root_label(), NodeLabel::Top);

    // Every root child must be reached before the guard expires: the first
    // `a` only fires in regions 0 and 1 (x < 1).
    let tree = search.tree();
    let root = tree.root();
    for child in &tree.node(root).children {
        let (increments, action) = tree.node(*child).incoming.clone().unwrap();
        assert_eq!(action, Action::new("a"));
        assert!(increments.iter().all(|increment| *increment <= 1));
    }
}

#[test]
fn test_setup_validation() {
    let plant = looping_plant();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();

    // Overlapping action sets are rejected.
    let result = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        actions(&["a"]),
        0,
        Box::new(BfsHeuristic::default()),
    );
    assert!(result.is_err());

    // Both sets together must cover the alphabet.
    let result = TreeSearch::new(
        &plant,
        &ata,
        BTreeSet::new(),
        BTreeSet::new(),
        0,
        Box::new(BfsHeuristic::default()),
    );
    assert!(result.is_err());
}

#[test]
fn test_cancellation_leaves_partial_tree() {
    let plant = looping_plant();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let mut search = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        BTreeSet::new(),
        0,
        Box::new(BfsHeuristic::default()),
    )
    .unwrap();
    let token = CancellationToken::new();
    search.set_cancellation_token(token.clone());
    token.cancel();
    assert_eq!(search.build_tree().unwrap(), SearchStatus::Cancelled);
    assert_eq!(search.root_label(), NodeLabel::Unknown);

    // The search can be resumed after cancellation.
    search.set_cancellation_token(CancellationToken::new());
    assert_eq!(search.build_tree().unwrap(), SearchStatus::Finished);
    search.label();
    assert_eq!(search.root_label(), NodeLabel::Top);
}

#[test]
fn test_word_table_tracks_distinct_words() {
    let plant = looping_plant();
    let spec = finally(MtlFormula::ap("a"), TimeInterval::unbounded());
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let mut search = TreeSearch::new(
        &plant,
        &ata,
        actions(&["a"]),
        BTreeSet::new(),
        0,
        Box::new(BfsHeuristic::default()),
    )
    .unwrap();
    search.build_tree().unwrap();
    assert!(search.distinct_word_count() > 0);
}
