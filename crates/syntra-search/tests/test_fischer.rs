//! Case study: two Fischer-style processes competing for a critical
//! section.
//!
//! Each process requests entry, assigns itself within `delay_self_assign`
//! time units and may enter after `delay_enter_critical` time units. The
//! environment drives the requests and assignments; the controller owns the
//! entry actions and has to schedule an entry eventually.

use std::collections::BTreeSet;

use syntra_automata::ta::builder::TimedAutomatonBuilder;
use syntra_automata::ta::product::product;
use syntra_automata::ta::{TimedAutomaton, Transition};
use syntra_automata::{Action, ClockConstraint, Location};
use syntra_logic::translator::translate;
use syntra_logic::{finally, MtlFormula, TimeInterval};
use syntra_search::heuristics::DfsHeuristic;
use syntra_search::{NodeLabel, TreeSearch};

/// One Fischer process template
fn fischer_process(
    index: usize,
    delay_self_assign: u32,
    delay_enter_critical: u32,
) -> TimedAutomaton {
    let clock = format!("c_{index}");
    let try_enter = Action::new(format!("try_enter_{index}"));
    let enter = Action::new(format!("enter_{index}"));
    let set_var = Action::new(format!("set_var_{index}"));
    let zero_var = Action::new(format!("zero_var_{index}"));
    let idle = Location::new(format!("IDLE_{index}"));
    let request = Location::new(format!("REQUEST_{index}"));
    let wait = Location::new(format!("WAIT_{index}"));
    let critical = Location::new(format!("CRITICAL_{index}"));
    TimedAutomatonBuilder::new()
        .with_locations([idle.clone(), request.clone(), wait.clone(), critical.clone()])
        .with_alphabet([try_enter.clone(), enter.clone(), set_var.clone(), zero_var.clone()])
        .with_clock(&clock)
        .with_initial_location(idle.clone())
        .with_final_locations([idle.clone()])
        .with_transitions([
            Transition::new(idle.clone(), try_enter, request.clone()).with_reset(&clock),
            Transition::new(request, set_var, wait.clone())
                .with_guard(&clock, ClockConstraint::LessThan(delay_self_assign))
                .with_reset(&clock),
            Transition::new(wait, enter, critical.clone())
                .with_guard(&clock, ClockConstraint::GreaterThan(delay_enter_critical)),
            Transition::new(critical, zero_var, idle),
        ])
        .build()
        .unwrap()
}

#[test]
fn test_two_process_fischer_is_controllable() {
    let processes = vec![
        fischer_process(1, 2, 3),
        fischer_process(2, 2, 3),
    ];
    let plant = product(&processes, &BTreeSet::new()).unwrap();

    let controller_actions: BTreeSet<Action> =
        ["enter_1", "enter_2"].iter().map(Action::new).collect();
    let environment_actions: BTreeSet<Action> = plant
        .alphabet()
        .difference(&controller_actions)
        .cloned()
        .collect();

    // Some process eventually enters the critical section.
    let spec = finally(
        MtlFormula::ap("enter_1") | MtlFormula::ap("enter_2"),
        TimeInterval::unbounded(),
    );
    let ata = translate(&spec, plant.alphabet().iter().cloned()).unwrap();
    let k = plant.largest_constant().max(spec.largest_constant());
    assert_eq!(k, 3);

    let mut search = TreeSearch::new(
        &plant,
        &ata,
        controller_actions,
        environment_actions,
        k,
        Box::new(DfsHeuristic::default()),
    )
    .unwrap();
    search.build_tree().unwrap();
    search.label();
    assert_eq!(search.root_label(), NodeLabel::Top);
}
