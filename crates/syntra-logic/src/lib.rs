//! Metric temporal logic over plant actions.
//!
//! An [`MtlFormula`] is built from atomic propositions (plant [`Action`]s),
//! boolean connectives, and the interval-constrained *until* and *dual
//! until* operators. Formulas are translated into alternating timed automata
//! by [`translator::translate`]; [`MtlWord`] provides the direct pointwise
//! satisfaction relation used to cross-check the translation.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use syntra_automata::{Action, Endpoint, Time};

pub mod interval;
pub mod translator;

pub use interval::{BoundKind, TimeInterval};

/// A metric temporal logic formula
///
/// ```
/// use syntra_logic::{MtlFormula, TimeInterval};
///
/// // (a U[0, 2] b) ∧ ¬c
/// let _ = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::new(0, 2))
///     & !MtlFormula::ap("c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MtlFormula {
    /// Always true
    True,
    /// Always false
    False,
    /// An atomic proposition, drawn from the plant's action alphabet
    Ap(Action),
    /// Negation
    Neg(Box<MtlFormula>),
    /// Conjunction
    And(Box<MtlFormula>, Box<MtlFormula>),
    /// Disjunction
    Or(Box<MtlFormula>, Box<MtlFormula>),
    /// The metric until operator
    Until(Box<MtlFormula>, Box<MtlFormula>, TimeInterval),
    /// The metric dual-until operator, `φ D_I ψ ≡ ¬(¬φ U_I ¬ψ)`
    DualUntil(Box<MtlFormula>, Box<MtlFormula>, TimeInterval),
}

impl MtlFormula {
    /// Create an atomic proposition
    pub fn ap(name: impl ToString) -> Self {
        MtlFormula::Ap(Action::new(name))
    }

    /// The until operator `self U_I rhs`
    pub fn until(self, rhs: MtlFormula, interval: TimeInterval) -> Self {
        MtlFormula::Until(Box::new(self), Box::new(rhs), interval)
    }

    /// The dual-until operator `self D_I rhs`
    pub fn dual_until(self, rhs: MtlFormula, interval: TimeInterval) -> Self {
        MtlFormula::DualUntil(Box::new(self), Box::new(rhs), interval)
    }

    /// Conjunction over an iterator of formulas (`true` if empty)
    pub fn conjunction(formulas: impl IntoIterator<Item = MtlFormula>) -> Self {
        formulas
            .into_iter()
            .reduce(|lhs, rhs| lhs & rhs)
            .unwrap_or(MtlFormula::True)
    }

    /// Disjunction over an iterator of formulas (`false` if empty)
    pub fn disjunction(formulas: impl IntoIterator<Item = MtlFormula>) -> Self {
        formulas
            .into_iter()
            .reduce(|lhs, rhs| lhs | rhs)
            .unwrap_or(MtlFormula::False)
    }

    /// Rewrite the formula into positive normal form
    ///
    /// All negations are pushed down to the atomic propositions; until and
    /// dual-until are exchanged under negation.
    pub fn to_positive_normal_form(&self) -> MtlFormula {
        match self {
            MtlFormula::True | MtlFormula::False | MtlFormula::Ap(_) => self.clone(),
            MtlFormula::And(lhs, rhs) => MtlFormula::And(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            MtlFormula::Or(lhs, rhs) => MtlFormula::Or(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
            ),
            MtlFormula::Until(lhs, rhs, interval) => MtlFormula::Until(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            MtlFormula::DualUntil(lhs, rhs, interval) => MtlFormula::DualUntil(
                Box::new(lhs.to_positive_normal_form()),
                Box::new(rhs.to_positive_normal_form()),
                *interval,
            ),
            MtlFormula::Neg(inner) => match inner.as_ref() {
                MtlFormula::True => MtlFormula::False,
                MtlFormula::False => MtlFormula::True,
                MtlFormula::Ap(_) => self.clone(),
                MtlFormula::Neg(inner_inner) => inner_inner.to_positive_normal_form(),
                MtlFormula::And(lhs, rhs) => MtlFormula::Or(
                    Box::new(MtlFormula::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(MtlFormula::Neg(rhs.clone()).to_positive_normal_form()),
                ),
                MtlFormula::Or(lhs, rhs) => MtlFormula::And(
                    Box::new(MtlFormula::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(MtlFormula::Neg(rhs.clone()).to_positive_normal_form()),
                ),
                MtlFormula::Until(lhs, rhs, interval) => MtlFormula::DualUntil(
                    Box::new(MtlFormula::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(MtlFormula::Neg(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
                MtlFormula::DualUntil(lhs, rhs, interval) => MtlFormula::Until(
                    Box::new(MtlFormula::Neg(lhs.clone()).to_positive_normal_form()),
                    Box::new(MtlFormula::Neg(rhs.clone()).to_positive_normal_form()),
                    *interval,
                ),
            },
        }
    }

    /// Collect all atomic propositions of the formula
    pub fn alphabet(&self) -> BTreeSet<Action> {
        let mut res = BTreeSet::new();
        self.collect_alphabet(&mut res);
        res
    }

    fn collect_alphabet(&self, res: &mut BTreeSet<Action>) {
        match self {
            MtlFormula::True | MtlFormula::False => {}
            MtlFormula::Ap(action) => {
                res.insert(action.clone());
            }
            MtlFormula::Neg(inner) => inner.collect_alphabet(res),
            MtlFormula::And(lhs, rhs)
            | MtlFormula::Or(lhs, rhs)
            | MtlFormula::Until(lhs, rhs, _)
            | MtlFormula::DualUntil(lhs, rhs, _) => {
                lhs.collect_alphabet(res);
                rhs.collect_alphabet(res);
            }
        }
    }

    /// Collect all until subformulas (recursively, including the formula
    /// itself)
    pub fn until_subformulas(&self) -> BTreeSet<MtlFormula> {
        let mut res = BTreeSet::new();
        self.collect_subformulas(&mut res, true);
        res
    }

    /// Collect all dual-until subformulas (recursively, including the
    /// formula itself)
    pub fn dual_until_subformulas(&self) -> BTreeSet<MtlFormula> {
        let mut res = BTreeSet::new();
        self.collect_subformulas(&mut res, false);
        res
    }

    fn collect_subformulas(&self, res: &mut BTreeSet<MtlFormula>, untils: bool) {
        match self {
            MtlFormula::True | MtlFormula::False | MtlFormula::Ap(_) => {}
            MtlFormula::Neg(inner) => inner.collect_subformulas(res, untils),
            MtlFormula::And(lhs, rhs) | MtlFormula::Or(lhs, rhs) => {
                lhs.collect_subformulas(res, untils);
                rhs.collect_subformulas(res, untils);
            }
            MtlFormula::Until(lhs, rhs, _) => {
                if untils {
                    res.insert(self.clone());
                }
                lhs.collect_subformulas(res, untils);
                rhs.collect_subformulas(res, untils);
            }
            MtlFormula::DualUntil(lhs, rhs, _) => {
                if !untils {
                    res.insert(self.clone());
                }
                lhs.collect_subformulas(res, untils);
                rhs.collect_subformulas(res, untils);
            }
        }
    }

    /// The largest constant appearing in any interval of the formula
    pub fn largest_constant(&self) -> Endpoint {
        match self {
            MtlFormula::True | MtlFormula::False | MtlFormula::Ap(_) => 0,
            MtlFormula::Neg(inner) => inner.largest_constant(),
            MtlFormula::And(lhs, rhs) | MtlFormula::Or(lhs, rhs) => {
                lhs.largest_constant().max(rhs.largest_constant())
            }
            MtlFormula::Until(lhs, rhs, interval)
            | MtlFormula::DualUntil(lhs, rhs, interval) => lhs
                .largest_constant()
                .max(rhs.largest_constant())
                .max(interval.largest_constant().unwrap_or(0)),
        }
    }
}

impl Not for MtlFormula {
    type Output = Self;

    fn not(self) -> Self::Output {
        MtlFormula::Neg(Box::new(self))
    }
}

impl BitAnd for MtlFormula {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        MtlFormula::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for MtlFormula {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        MtlFormula::Or(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for MtlFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtlFormula::True => write!(f, "true"),
            MtlFormula::False => write!(f, "false"),
            MtlFormula::Ap(action) => write!(f, "{action}"),
            MtlFormula::Neg(inner) => write!(f, "!({inner})"),
            MtlFormula::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            MtlFormula::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
            MtlFormula::Until(lhs, rhs, interval) => {
                write!(f, "({lhs} U{interval} {rhs})")
            }
            MtlFormula::DualUntil(lhs, rhs, interval) => {
                write!(f, "({lhs} D{interval} {rhs})")
            }
        }
    }
}

/// The *finally* operator: `F_I φ ≡ ⊤ U_I φ`
pub fn finally(formula: MtlFormula, interval: TimeInterval) -> MtlFormula {
    MtlFormula::True.until(formula, interval)
}

/// The *globally* operator: `G_I φ ≡ ⊥ D_I φ`
pub fn globally(formula: MtlFormula, interval: TimeInterval) -> MtlFormula {
    MtlFormula::False.dual_until(formula, interval)
}

/// A finite timed word over sets of atomic propositions
///
/// Provides the direct pointwise MTL satisfaction relation. Until is strict:
/// at position i it quantifies over positions j > i, with the interval
/// anchored at the timestamp of position i. The formula as a whole is
/// evaluated at position 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlWord {
    word: Vec<(BTreeSet<Action>, Time)>,
}

impl MtlWord {
    /// Create a new word from (propositions, timestamp) pairs
    pub fn new(word: Vec<(BTreeSet<Action>, Time)>) -> Self {
        MtlWord { word }
    }

    /// Check satisfaction at position 0
    pub fn satisfies(&self, formula: &MtlFormula) -> bool {
        self.satisfies_at(formula, 0)
    }

    /// Check satisfaction at the given position
    pub fn satisfies_at(&self, formula: &MtlFormula, position: usize) -> bool {
        if position >= self.word.len() {
            return false;
        }
        match formula {
            MtlFormula::True => true,
            MtlFormula::False => false,
            MtlFormula::Ap(action) => self.word[position].0.contains(action),
            MtlFormula::Neg(inner) => !self.satisfies_at(inner, position),
            MtlFormula::And(lhs, rhs) => {
                self.satisfies_at(lhs, position) && self.satisfies_at(rhs, position)
            }
            MtlFormula::Or(lhs, rhs) => {
                self.satisfies_at(lhs, position) || self.satisfies_at(rhs, position)
            }
            MtlFormula::Until(lhs, rhs, interval) => {
                let anchor = self.word[position].1;
                (position + 1..self.word.len()).any(|j| {
                    interval.contains(self.word[j].1 - anchor)
                        && self.satisfies_at(rhs, j)
                        && (position + 1..j).all(|k| self.satisfies_at(lhs, k))
                })
            }
            MtlFormula::DualUntil(lhs, rhs, interval) => {
                let anchor = self.word[position].1;
                (position + 1..self.word.len()).all(|j| {
                    !interval.contains(self.word[j].1 - anchor)
                        || self.satisfies_at(rhs, j)
                        || (position + 1..j).any(|k| self.satisfies_at(lhs, k))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(aps: &[&str], time: Time) -> (BTreeSet<Action>, Time) {
        (aps.iter().map(Action::new).collect(), time)
    }

    #[test]
    fn test_positive_normal_form() {
        let a = MtlFormula::ap("a");
        let b = MtlFormula::ap("b");

        // ¬(a ∧ b) becomes ¬a ∨ ¬b.
        let formula = !(a.clone() & b.clone());
        assert_eq!(
            formula.to_positive_normal_form(),
            !a.clone() | !b.clone()
        );

        // ¬(a U b) becomes ¬a D ¬b.
        let interval = TimeInterval::new(0, 2);
        let formula = !(a.clone().until(b.clone(), interval));
        assert_eq!(
            formula.to_positive_normal_form(),
            (!a.clone()).dual_until(!b.clone(), interval)
        );

        // Double negation cancels.
        let formula = !!a.clone();
        assert_eq!(formula.to_positive_normal_form(), a.clone());
    }

    #[test]
    fn test_alphabet() {
        let formula = MtlFormula::ap("a").until(
            MtlFormula::ap("b") & !MtlFormula::ap("c"),
            TimeInterval::unbounded(),
        );
        assert_eq!(
            formula.alphabet(),
            BTreeSet::from([Action::new("a"), Action::new("b"), Action::new("c")])
        );
    }

    #[test]
    fn test_subformula_collection() {
        let inner = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::unbounded());
        let outer = MtlFormula::ap("c").dual_until(inner.clone(), TimeInterval::new(1, 2));
        assert_eq!(outer.until_subformulas(), BTreeSet::from([inner.clone()]));
        assert_eq!(outer.dual_until_subformulas(), BTreeSet::from([outer.clone()]));
    }

    #[test]
    fn test_largest_constant() {
        let formula = finally(MtlFormula::ap("a"), TimeInterval::new(1, 4))
            & globally(MtlFormula::ap("b"), TimeInterval::new(0, 2));
        assert_eq!(formula.largest_constant(), 4);
    }

    #[test]
    fn test_word_satisfaction_of_until() {
        let phi = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::new(2, 3));
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["a"], 1.), letter(&["b"], 2.5)]);
        assert!(word.satisfies(&phi));
        // Outside the interval.
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["b"], 1.)]);
        assert!(!word.satisfies(&phi));
        // The until position must satisfy the right-hand side.
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["a"], 2.5)]);
        assert!(!word.satisfies(&phi));
        // Intermediate positions must satisfy the left-hand side.
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["c"], 1.), letter(&["b"], 2.5)]);
        assert!(!word.satisfies(&phi));
    }

    #[test]
    fn test_word_satisfaction_of_dual_until() {
        // G[0,2] ¬b, violated by a b within the first two time units.
        let phi = globally(!MtlFormula::ap("b"), TimeInterval::new(0, 2));
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["a"], 1.), letter(&["a"], 3.)]);
        assert!(word.satisfies(&phi));
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["b"], 1.)]);
        assert!(!word.satisfies(&phi));
        let word = MtlWord::new(vec![letter(&["a"], 0.), letter(&["b"], 2.5)]);
        assert!(word.satisfies(&phi));
    }

    #[test]
    fn test_display() {
        let formula = MtlFormula::ap("a").until(MtlFormula::ap("b"), TimeInterval::new(0, 2));
        assert_eq!(formula.to_string(), "(a U[0, 2] b)");
        let formula = !MtlFormula::ap("a") & MtlFormula::True;
        assert_eq!(formula.to_string(), "(!(a) && true)");
    }
}
