//! Translation of MTL formulas into alternating timed automata.
//!
//! The construction follows the closure approach: the ATA's locations are
//! the until and dual-until subformulas of the input formula (in positive
//! normal form) plus a distinguished initial location. A fresh obligation
//! spawned by a transition resets the ATA clock, so that its interval is
//! measured from the spawn point; obligations active from system start keep
//! the running clock and measure from time 0. Dual-until locations are
//! accepting: an invariant may be maintained forever, a pending until
//! obligation rejects.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;

use syntra_automata::ata::{AlternatingTimedAutomaton, AtaTransition, Formula};
use syntra_automata::{Action, ClockConstraint};

use crate::{BoundKind, MtlFormula, TimeInterval};

/// The reserved name of the ATA's initial location
pub const INITIAL_LOCATION_NAME: &str = "phi_i";

/// An ATA whose locations are MTL formulas
pub type SpecAta = AlternatingTimedAutomaton<MtlFormula>;

/// Errors raised by the translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The alphabet contains the reserved initial-location symbol
    ReservedSymbol(Action),
    /// The formula uses symbols that are not in the alphabet
    MissingSymbols(BTreeSet<Action>),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::ReservedSymbol(symbol) => {
                write!(f, "the symbol '{symbol}' is reserved for the initial location")
            }
            TranslationError::MissingSymbols(symbols) => write!(
                f,
                "the formula uses symbols that are not in the alphabet: {}",
                syntra_display_utils::join_iterator(symbols.iter(), ", ")
            ),
        }
    }
}

impl std::error::Error for TranslationError {}

/// The distinguished initial location of a translated ATA
pub fn initial_location() -> MtlFormula {
    MtlFormula::ap(INITIAL_LOCATION_NAME)
}

/// A formula requiring the clock to lie within the interval
fn contains(interval: TimeInterval) -> Formula<MtlFormula> {
    let lower = match interval.lower_kind() {
        BoundKind::Infinite => Formula::True,
        BoundKind::Weak => {
            Formula::ClockConstraint(ClockConstraint::GreaterEqual(interval.lower()))
        }
        BoundKind::Strict => {
            Formula::ClockConstraint(ClockConstraint::GreaterThan(interval.lower()))
        }
    };
    let upper = match interval.upper_kind() {
        BoundKind::Infinite => Formula::True,
        BoundKind::Weak => Formula::ClockConstraint(ClockConstraint::LessEqual(interval.upper())),
        BoundKind::Strict => Formula::ClockConstraint(ClockConstraint::LessThan(interval.upper())),
    };
    Formula::and(lower, upper)
}

/// A formula requiring the clock to lie outside the interval
fn not_contains(interval: TimeInterval) -> Formula<MtlFormula> {
    let lower = match interval.lower_kind() {
        BoundKind::Infinite => Formula::False,
        BoundKind::Weak => Formula::ClockConstraint(ClockConstraint::LessThan(interval.lower())),
        BoundKind::Strict => {
            Formula::ClockConstraint(ClockConstraint::LessEqual(interval.lower()))
        }
    };
    let upper = match interval.upper_kind() {
        BoundKind::Infinite => Formula::False,
        BoundKind::Weak => {
            Formula::ClockConstraint(ClockConstraint::GreaterThan(interval.upper()))
        }
        BoundKind::Strict => {
            Formula::ClockConstraint(ClockConstraint::GreaterEqual(interval.upper()))
        }
    };
    Formula::or(lower, upper)
}

/// Map a subformula in positive normal form to the ATA formula triggered by
/// reading `symbol`
///
/// Until and dual-until subformulas become location atoms; `reset_spawns`
/// selects whether such freshly spawned obligations reset the clock (they do
/// everywhere except on the initial transitions, where obligations measure
/// from time 0).
fn init(formula: &MtlFormula, symbol: &Action, reset_spawns: bool) -> Formula<MtlFormula> {
    match formula {
        MtlFormula::True => Formula::True,
        MtlFormula::False => Formula::False,
        MtlFormula::Ap(action) => {
            if action == symbol {
                Formula::True
            } else {
                Formula::False
            }
        }
        MtlFormula::Neg(inner) => match inner.as_ref() {
            MtlFormula::Ap(action) => {
                if action == symbol {
                    Formula::False
                } else {
                    Formula::True
                }
            }
            // The input is normalized, so a non-literal negation can only
            // appear in hand-built formulas; normalize it on the fly.
            _ => init(&formula.to_positive_normal_form(), symbol, reset_spawns),
        },
        MtlFormula::And(lhs, rhs) => Formula::and(
            init(lhs, symbol, reset_spawns),
            init(rhs, symbol, reset_spawns),
        ),
        MtlFormula::Or(lhs, rhs) => Formula::or(
            init(lhs, symbol, reset_spawns),
            init(rhs, symbol, reset_spawns),
        ),
        MtlFormula::Until(_, _, _) | MtlFormula::DualUntil(_, _, _) => {
            if reset_spawns {
                Formula::reset(Formula::Location(formula.clone()))
            } else {
                Formula::Location(formula.clone())
            }
        }
    }
}

/// Translate an MTL formula into an alternating timed automaton
///
/// The ATA reads the given alphabet, which defaults to the formula's atomic
/// propositions when empty; every proposition of the formula must be
/// contained in it. The ATA accepts a timed word iff the word satisfies the
/// formula.
pub fn translate(
    input_formula: &MtlFormula,
    alphabet: impl IntoIterator<Item = Action>,
) -> Result<SpecAta, TranslationError> {
    let formula = input_formula.to_positive_normal_form();
    let aps = formula.alphabet();
    let mut sigma: BTreeSet<Action> = alphabet.into_iter().collect();
    if sigma.is_empty() {
        sigma = aps.clone();
    }
    let reserved = Action::new(INITIAL_LOCATION_NAME);
    if sigma.contains(&reserved) || aps.contains(&reserved) {
        return Err(TranslationError::ReservedSymbol(reserved));
    }
    if !aps.is_subset(&sigma) {
        return Err(TranslationError::MissingSymbols(
            aps.difference(&sigma).cloned().collect(),
        ));
    }

    let untils = formula.until_subformulas();
    let dual_untils = formula.dual_until_subformulas();

    let mut transitions = Vec::new();
    for symbol in &sigma {
        transitions.push(AtaTransition {
            source: initial_location(),
            symbol: symbol.clone(),
            formula: init(&formula, symbol, false),
        });
        for until in &untils {
            let MtlFormula::Until(lhs, rhs, interval) = until else {
                continue;
            };
            transitions.push(AtaTransition {
                source: until.clone(),
                symbol: symbol.clone(),
                formula: Formula::or(
                    Formula::and(init(rhs, symbol, true), contains(*interval)),
                    Formula::and(init(lhs, symbol, true), Formula::Location(until.clone())),
                ),
            });
        }
        for dual_until in &dual_untils {
            let MtlFormula::DualUntil(lhs, rhs, interval) = dual_until else {
                continue;
            };
            transitions.push(AtaTransition {
                source: dual_until.clone(),
                symbol: symbol.clone(),
                formula: Formula::and(
                    Formula::or(init(rhs, symbol, true), not_contains(*interval)),
                    Formula::or(init(lhs, symbol, true), Formula::Location(dual_until.clone())),
                ),
            });
        }
    }

    let location_count = 1 + untils.len() + dual_untils.len();
    debug!("Translated {input_formula} into an ATA with {location_count} locations");
    Ok(AlternatingTimedAutomaton::new(
        sigma,
        initial_location(),
        dual_untils,
        transitions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{finally, MtlWord};
    use syntra_automata::{Time, TimedWord};

    fn word(letters: &[(&str, Time)]) -> TimedWord<Action> {
        letters
            .iter()
            .map(|(name, time)| (Action::new(name), *time))
            .collect()
    }

    #[test]
    fn test_simple_until() {
        let phi = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::unbounded());
        let ata = translate(&phi, []).unwrap();
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 2.5)])).unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 1.5)])).unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("b", 1.5)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("b", 0.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("b", 0.), ("b", 0.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("b", 0.), ("b", 1.)])).unwrap());
        // c is not in the alphabet, so no run exists.
        assert!(!ata.accepts_word(&word(&[("c", 0.), ("b", 1.5)])).unwrap());
    }

    #[test]
    fn test_true_literal_in_until() {
        let phi = finally(MtlFormula::ap("b"), TimeInterval::unbounded());
        let ata = translate(&phi, [Action::new("a"), Action::new("b")]).unwrap();
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 2.)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("a", 2.)])).unwrap());
    }

    #[test]
    fn test_false_literal_in_until() {
        let phi = MtlFormula::False.until(MtlFormula::ap("b"), TimeInterval::unbounded());
        let ata = translate(&phi, [Action::new("a"), Action::new("b")]).unwrap();
        // The left-hand side can never be maintained past one step.
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 2.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("b", 2.)])).unwrap());
    }

    #[test]
    fn test_until_with_time_bounds() {
        let phi = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::new(2, 3));
        let ata = translate(&phi, []).unwrap();
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 0.5), ("b", 2.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 3.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 2.9), ("b", 3.)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 1.), ("b", 3.1)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 5.), ("b", 7.)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 0.1), ("b", 1.9)])).unwrap());
    }

    #[test]
    fn test_until_with_strict_lower_bound() {
        let phi = MtlFormula::ap("a").until(
            MtlFormula::ap("b"),
            TimeInterval::new_with_bounds(2, BoundKind::Strict, 0, BoundKind::Infinite),
        );
        let ata = translate(&phi, []).unwrap();
        assert!(ata.accepts_word(&word(&[("a", 0.), ("a", 0.5), ("b", 2.1)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("a", 0.), ("a", 0.5), ("b", 2.)])).unwrap());
        assert!(ata
            .accepts_word(&word(&[("a", 0.), ("a", 0.5), ("a", 5.), ("a", 10.), ("b", 12.)]))
            .unwrap());
        assert!(ata.accepts_word(&word(&[("a", 0.), ("b", 12.)])).unwrap());
    }

    #[test]
    fn test_dual_until_as_globally() {
        // G[0,2] ¬release: no release during the first two time units.
        let phi = crate::globally(!MtlFormula::ap("release"), TimeInterval::new(0, 2));
        let ata = translate(
            &phi,
            [Action::new("move"), Action::new("release")],
        )
        .unwrap();
        assert!(ata.accepts_word(&word(&[("move", 0.), ("move", 1.), ("move", 3.)])).unwrap());
        assert!(!ata.accepts_word(&word(&[("move", 0.), ("release", 1.)])).unwrap());
        assert!(ata.accepts_word(&word(&[("move", 0.), ("release", 2.5)])).unwrap());
        // The invariant location is accepting, so the word may also just end.
        assert!(ata.accepts_word(&word(&[("move", 0.)])).unwrap());
    }

    #[test]
    fn test_closure_size() {
        // F[1,2] p has exactly two locations: the initial location and the
        // until subformula.
        let phi = finally(MtlFormula::ap("p"), TimeInterval::new(1, 2));
        let pnf = phi.to_positive_normal_form();
        assert_eq!(pnf.until_subformulas().len(), 1);
        assert_eq!(pnf.dual_until_subformulas().len(), 0);
        let ata = translate(&phi, []).unwrap();
        let locations: std::collections::BTreeSet<_> =
            ata.transitions().map(|t| t.source.clone()).collect();
        assert_eq!(locations.len(), 2);

        // The until transition on p produces the expected minimal models:
        // discharge within the interval or keep the obligation.
        let until = pnf.clone();
        let transition = ata
            .transitions()
            .find(|t| t.source == until && t.symbol == Action::new("p"))
            .unwrap();
        // Inside the interval the obligation is discharged; the self-loop
        // model is subsumed by the empty model.
        let models = transition.formula.minimal_models(1.5);
        assert_eq!(models, BTreeSet::from([BTreeSet::new()]));
        // Outside the interval only the self-loop remains.
        let models = transition.formula.minimal_models(2.5);
        assert_eq!(models.len(), 1);
        assert!(!models.contains(&BTreeSet::new()));
    }

    #[test]
    fn test_reserved_symbol_is_rejected() {
        let phi = MtlFormula::ap(INITIAL_LOCATION_NAME);
        assert!(matches!(
            translate(&phi, []),
            Err(TranslationError::ReservedSymbol(_))
        ));
    }

    #[test]
    fn test_missing_symbols_are_rejected() {
        let phi = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::unbounded());
        let result = translate(&phi, [Action::new("a")]);
        assert_eq!(
            result.unwrap_err(),
            TranslationError::MissingSymbols(BTreeSet::from([Action::new("b")]))
        );
    }

    #[test]
    fn test_translation_agrees_with_pointwise_satisfaction() {
        let phi = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::new(1, 2));
        let ata = translate(&phi, []).unwrap();
        let words = [
            vec![("a", 0.), ("b", 1.5)],
            vec![("a", 0.), ("b", 0.5)],
            vec![("a", 0.), ("a", 0.5), ("b", 1.5)],
            vec![("a", 0.), ("b", 2.5)],
            vec![("b", 0.), ("b", 1.)],
            vec![("a", 0.), ("a", 1.2), ("a", 1.8)],
        ];
        for letters in &words {
            let timed = word(letters);
            let pointwise = MtlWord::new(
                letters
                    .iter()
                    .map(|(name, time)| (BTreeSet::from([Action::new(*name)]), *time))
                    .collect(),
            );
            assert_eq!(
                ata.accepts_word(&timed).unwrap(),
                pointwise.satisfies(&phi),
                "disagreement on {timed:?}"
            );
        }
    }
}
