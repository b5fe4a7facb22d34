//! Positive boolean formulas over ATA locations and the single ATA clock.
//!
//! A transition of an alternating timed automaton maps to a [`Formula`]
//! whose minimal models determine the successor configurations. Formulas are
//! owned trees without sharing; minimal-model enumeration returns value-typed
//! sets of states.

use std::collections::BTreeSet;
use std::fmt;

use crate::{Clock, ClockConstraint, ClockValuation};

use super::AtaState;

/// A positive boolean formula with atoms `true`, `false`, locations, clock
/// constraints and clock resets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Formula<L> {
    /// Always satisfied
    True,
    /// Never satisfied
    False,
    /// Satisfied iff the configuration contains the location with the
    /// current clock valuation
    Location(L),
    /// Satisfied iff the clock constraint holds for the current valuation
    ClockConstraint(ClockConstraint),
    /// Conjunction of two formulas
    And(Box<Formula<L>>, Box<Formula<L>>),
    /// Disjunction of two formulas
    Or(Box<Formula<L>>, Box<Formula<L>>),
    /// The sub-formula evaluated with the clock reset to 0
    ResetClock(Box<Formula<L>>),
}

impl<L: Clone + Ord> Formula<L> {
    /// Conjunction of two boxed formulas
    pub fn and(lhs: Formula<L>, rhs: Formula<L>) -> Formula<L> {
        Formula::And(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of two boxed formulas
    pub fn or(lhs: Formula<L>, rhs: Formula<L>) -> Formula<L> {
        Formula::Or(Box::new(lhs), Box::new(rhs))
    }

    /// The reset of a formula
    pub fn reset(sub_formula: Formula<L>) -> Formula<L> {
        Formula::ResetClock(Box::new(sub_formula))
    }

    /// Conjunction over an iterator of formulas (`true` if empty)
    pub fn conjunction(formulas: impl IntoIterator<Item = Formula<L>>) -> Formula<L> {
        formulas
            .into_iter()
            .reduce(Formula::and)
            .unwrap_or(Formula::True)
    }

    /// Disjunction over an iterator of formulas (`false` if empty)
    pub fn disjunction(formulas: impl IntoIterator<Item = Formula<L>>) -> Formula<L> {
        formulas
            .into_iter()
            .reduce(Formula::or)
            .unwrap_or(Formula::False)
    }

    /// Check if the formula is satisfied by a configuration at a clock
    /// valuation
    pub fn is_satisfied(&self, states: &BTreeSet<AtaState<L>>, valuation: ClockValuation) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Location(location) => states.contains(&AtaState {
                location: location.clone(),
                clock_valuation: Clock::new(valuation),
            }),
            Formula::ClockConstraint(constraint) => constraint.is_satisfied(valuation),
            Formula::And(lhs, rhs) => {
                lhs.is_satisfied(states, valuation) && rhs.is_satisfied(states, valuation)
            }
            Formula::Or(lhs, rhs) => {
                lhs.is_satisfied(states, valuation) || rhs.is_satisfied(states, valuation)
            }
            Formula::ResetClock(sub_formula) => sub_formula.is_satisfied(states, 0.),
        }
    }

    /// Compute the minimal models of the formula at the given valuation
    ///
    /// Each model is a set of states whose inclusion in a configuration makes
    /// the formula true; only ⊆-minimal models are returned. `True` has the
    /// single empty model, `False` has none.
    pub fn minimal_models(
        &self,
        valuation: ClockValuation,
    ) -> BTreeSet<BTreeSet<AtaState<L>>> {
        match self {
            Formula::True => BTreeSet::from([BTreeSet::new()]),
            Formula::False => BTreeSet::new(),
            Formula::Location(location) => BTreeSet::from([BTreeSet::from([AtaState {
                location: location.clone(),
                clock_valuation: Clock::new(valuation),
            }])]),
            Formula::ClockConstraint(constraint) => {
                if constraint.is_satisfied(valuation) {
                    BTreeSet::from([BTreeSet::new()])
                } else {
                    BTreeSet::new()
                }
            }
            Formula::And(lhs, rhs) => {
                let lhs_models = lhs.minimal_models(valuation);
                let rhs_models = rhs.minimal_models(valuation);
                let mut models = BTreeSet::new();
                for lhs_model in &lhs_models {
                    for rhs_model in &rhs_models {
                        let mut union = lhs_model.clone();
                        union.extend(rhs_model.iter().cloned());
                        models.insert(union);
                    }
                }
                minimize(models)
            }
            Formula::Or(lhs, rhs) => {
                let mut models = lhs.minimal_models(valuation);
                models.extend(rhs.minimal_models(valuation));
                minimize(models)
            }
            Formula::ResetClock(sub_formula) => sub_formula.minimal_models(0.),
        }
    }
}

/// Keep only the ⊆-minimal sets
fn minimize<T: Ord + Clone>(models: BTreeSet<BTreeSet<T>>) -> BTreeSet<BTreeSet<T>> {
    models
        .iter()
        .filter(|model| {
            !models
                .iter()
                .any(|other| other.len() < model.len() && other.is_subset(model))
        })
        .cloned()
        .collect()
}

impl<L: fmt::Display> fmt::Display for Formula<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "⊤"),
            Formula::False => write!(f, "⊥"),
            Formula::Location(location) => write!(f, "{location}"),
            Formula::ClockConstraint(constraint) => write!(f, "{constraint}"),
            Formula::And(lhs, rhs) => write!(f, "({lhs} ∧ {rhs})"),
            Formula::Or(lhs, rhs) => write!(f, "({lhs} ∨ {rhs})"),
            Formula::ResetClock(sub_formula) => write!(f, "x.{sub_formula}"),
        }
    }
}
