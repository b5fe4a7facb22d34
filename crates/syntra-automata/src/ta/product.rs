//! The product of timed automata.
//!
//! The product interleaves the component automata: every letter is owned by
//! the component(s) whose alphabet contains it, and a product transition
//! moves exactly one component while the others stay put. Synchronized
//! actions are not supported by this core; requesting a non-empty
//! synchronization set is reported as [`ProductError::SynchronizedActions`]
//! so that callers can detect the unsupported configuration.

use std::collections::BTreeSet;
use std::fmt;

use syntra_display_utils::join_iterator;

use crate::{Action, Location};

use super::builder::{TaBuildError, TimedAutomatonBuilder};
use super::{TimedAutomaton, Transition};

/// Error raised when constructing a product automaton
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The product of zero automata was requested
    NoComponents,
    /// Two components share a clock name
    SharedClocks(BTreeSet<String>),
    /// A non-empty synchronization set was requested (unsupported)
    SynchronizedActions(BTreeSet<Action>),
    /// The combined components do not form a valid automaton
    Construction(TaBuildError),
}

impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductError::NoComponents => {
                write!(f, "cannot compute the product of zero automata")
            }
            ProductError::SharedClocks(clocks) => write!(
                f,
                "cannot compute the product of automata with shared clocks: {}",
                join_iterator(clocks.iter(), ", ")
            ),
            ProductError::SynchronizedActions(actions) => write!(
                f,
                "synchronized product actions are not supported: {}",
                join_iterator(actions.iter(), ", ")
            ),
            ProductError::Construction(err) => {
                write!(f, "product construction failed: {err}")
            }
        }
    }
}

impl std::error::Error for ProductError {}

impl From<TaBuildError> for ProductError {
    fn from(err: TaBuildError) -> Self {
        ProductError::Construction(err)
    }
}

/// Render a tuple of component locations as a single product location
fn product_location(components: &[&Location]) -> Location {
    Location::new(format!(
        "({})",
        join_iterator(components.iter(), ",")
    ))
}

/// Compute the interleaving product of the given automata
///
/// The component automata must have pairwise disjoint clock names. The
/// product has tuple locations, the union of the alphabets and clocks, and
/// one transition family per component; final locations are tuples of
/// component final locations.
pub fn product(
    automata: &[TimedAutomaton],
    synchronized: &BTreeSet<Action>,
) -> Result<TimedAutomaton, ProductError> {
    if automata.is_empty() {
        return Err(ProductError::NoComponents);
    }
    if !synchronized.is_empty() {
        return Err(ProductError::SynchronizedActions(synchronized.clone()));
    }
    for (i, first) in automata.iter().enumerate() {
        for second in &automata[i + 1..] {
            let shared: BTreeSet<String> =
                first.clocks().intersection(second.clocks()).cloned().collect();
            if !shared.is_empty() {
                return Err(ProductError::SharedClocks(shared));
            }
        }
    }

    // All tuples of component locations.
    let mut location_tuples: Vec<Vec<&Location>> = vec![vec![]];
    for ta in automata {
        let mut augmented = Vec::new();
        for tuple in &location_tuples {
            for location in ta.locations() {
                let mut extended = tuple.clone();
                extended.push(location);
                augmented.push(extended);
            }
        }
        location_tuples = augmented;
    }
    let mut final_tuples: Vec<Vec<&Location>> = vec![vec![]];
    for ta in automata {
        let mut augmented = Vec::new();
        for tuple in &final_tuples {
            for location in ta.final_locations() {
                let mut extended = tuple.clone();
                extended.push(location);
                augmented.push(extended);
            }
        }
        final_tuples = augmented;
    }

    let initial_tuple: Vec<&Location> = automata.iter().map(|ta| ta.initial_location()).collect();

    let mut builder = TimedAutomatonBuilder::new()
        .with_locations(location_tuples.iter().map(|t| product_location(t)))
        .with_initial_location(product_location(&initial_tuple))
        .with_final_locations(final_tuples.iter().map(|t| product_location(t)));
    for ta in automata {
        builder = builder
            .with_alphabet(ta.alphabet().iter().cloned())
            .with_clocks(ta.clocks().iter().cloned());
    }

    // One transition family per component: component i moves, the others
    // remain put.
    let mut transitions = Vec::new();
    for (i, ta) in automata.iter().enumerate() {
        for transition in ta.transitions() {
            for tuple in &location_tuples {
                if tuple[i] != &transition.source {
                    continue;
                }
                let mut target_tuple = tuple.clone();
                target_tuple[i] = &transition.target;
                let mut product_transition = Transition::new(
                    product_location(tuple),
                    transition.action.clone(),
                    product_location(&target_tuple),
                );
                product_transition.guard = transition.guard.clone();
                product_transition.resets = transition.resets.clone();
                transitions.push(product_transition);
            }
        }
    }

    Ok(builder.with_transitions(transitions).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClockConstraint;

    fn component(name_prefix: &str, action: &str, clock: &str) -> TimedAutomaton {
        let l0 = Location::new(format!("{name_prefix}0"));
        let l1 = Location::new(format!("{name_prefix}1"));
        TimedAutomatonBuilder::new()
            .with_locations([l0.clone(), l1.clone()])
            .with_alphabet([Action::new(action)])
            .with_clock(clock)
            .with_initial_location(l0.clone())
            .with_final_locations([l1.clone()])
            .with_transition(
                Transition::new(l0, Action::new(action), l1)
                    .with_guard(clock, ClockConstraint::LessThan(2)),
            )
            .build()
            .unwrap()
    }

    /// A single-location automaton without transitions or clocks
    fn trivial_ta() -> TimedAutomaton {
        TimedAutomatonBuilder::new()
            .with_location(Location::new("t"))
            .with_initial_location(Location::new("t"))
            .with_final_locations([Location::new("t")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_product_interleaves() {
        let a = component("a", "go_a", "x");
        let b = component("b", "go_b", "y");
        let p = product(&[a, b], &BTreeSet::new()).unwrap();
        assert_eq!(p.locations().len(), 4);
        assert_eq!(p.initial_location(), &Location::new("(a0,b0)"));
        assert_eq!(p.final_locations().len(), 1);
        assert!(p.final_locations().contains(&Location::new("(a1,b1)")));
        // Each component transition is instantiated for both locations of the
        // other component.
        assert_eq!(p.transitions().count(), 4);
        assert_eq!(p.clocks().len(), 2);
    }

    #[test]
    fn test_product_with_trivial_ta_preserves_language() {
        let a = component("a", "go_a", "x");
        let p = product(&[a.clone(), trivial_ta()], &BTreeSet::new()).unwrap();
        let accepted = vec![(Action::new("go_a"), 0.5)];
        let rejected = vec![(Action::new("go_a"), 2.5)];
        assert_eq!(
            a.accepts_word(&accepted).unwrap(),
            p.accepts_word(&accepted).unwrap()
        );
        assert_eq!(
            a.accepts_word(&rejected).unwrap(),
            p.accepts_word(&rejected).unwrap()
        );
    }

    #[test]
    fn test_product_rejects_shared_clocks() {
        let a = component("a", "go_a", "x");
        let b = component("b", "go_b", "x");
        let result = product(&[a, b], &BTreeSet::new());
        assert!(matches!(result, Err(ProductError::SharedClocks(_))));
    }

    #[test]
    fn test_product_rejects_synchronization() {
        let a = component("a", "go", "x");
        let b = component("b", "go", "y");
        let sync = BTreeSet::from([Action::new("go")]);
        let result = product(&[a, b], &sync);
        assert!(matches!(result, Err(ProductError::SynchronizedActions(_))));
    }

    #[test]
    fn test_product_of_nothing() {
        assert!(matches!(
            product(&[], &BTreeSet::new()),
            Err(ProductError::NoComponents)
        ));
    }
}
