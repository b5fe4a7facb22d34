//! Alternating timed automata.
//!
//! An alternating timed automaton (ATA) has a single clock per state and
//! transitions given by positive boolean [`Formula`]s. A configuration is a
//! finite set of (location, clock valuation) states; a symbol step replaces
//! every state by one of the minimal models of its transition formula, a
//! time step advances every clock. Runs strictly alternate between symbol
//! and time steps.

use std::collections::BTreeSet;
use std::fmt;

use syntra_display_utils::{display_set, join_iterator};

use crate::{Action, Clock, Time, TimedWord};

pub mod formula;

pub use formula::Formula;

/// A single state of an ATA: a location with its clock
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtaState<L> {
    /// The location of the state
    pub location: L,
    /// The valuation of the state's clock
    pub clock_valuation: Clock,
}

impl<L: fmt::Display> fmt::Display for AtaState<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location, self.clock_valuation)
    }
}

/// A configuration of an ATA: a finite set of states
pub type AtaConfiguration<L> = BTreeSet<AtaState<L>>;

/// One step of a run: the symbol read or the time elapsed
#[derive(Debug, Clone, PartialEq)]
pub enum RunStep {
    /// A symbol was read
    Symbol(Action),
    /// Time elapsed
    Time(Time),
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStep::Symbol(action) => write!(f, "→ {action}"),
            RunStep::Time(time) => write!(f, "⇢ {time}"),
        }
    }
}

/// A run of an ATA: the sequence of steps taken with the configuration
/// reached after each step
pub type Run<L> = Vec<(RunStep, AtaConfiguration<L>)>;

/// Errors raised by ATA run construction
#[derive(Debug, Clone, PartialEq)]
pub enum AtaError {
    /// The symbol/time alternation of a run was violated
    WrongTransitionType(String),
    /// A time step with a negative delta was attempted
    NegativeTimeDelta(Time),
    /// A timed word is malformed (e.g. does not start at time 0)
    InvalidTimedWord(String),
}

impl fmt::Display for AtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtaError::WrongTransitionType(msg) => write!(f, "wrong transition type: {msg}"),
            AtaError::NegativeTimeDelta(delta) => write!(
                f,
                "cannot do a time transition with negative time delta (= {delta})"
            ),
            AtaError::InvalidTimedWord(msg) => write!(f, "invalid timed word: {msg}"),
        }
    }
}

impl std::error::Error for AtaError {}

/// A transition of an alternating timed automaton
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AtaTransition<L> {
    /// The source location
    pub source: L,
    /// The symbol the transition fires on
    pub symbol: Action,
    /// The formula determining the successor configurations
    pub formula: Formula<L>,
}

impl<L: fmt::Display> fmt::Display for AtaTransition<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} → {}", self.source, self.symbol, self.formula)
    }
}

/// An alternating timed automaton
///
/// Generic over the location type `L`; the MTL → ATA translation
/// instantiates `L` with MTL formulas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternatingTimedAutomaton<L: Ord> {
    alphabet: BTreeSet<Action>,
    initial_location: L,
    final_locations: BTreeSet<L>,
    transitions: Vec<AtaTransition<L>>,
}

impl<L: Clone + Ord + fmt::Debug + fmt::Display> AlternatingTimedAutomaton<L> {
    /// Create a new ATA
    pub fn new(
        alphabet: BTreeSet<Action>,
        initial_location: L,
        final_locations: BTreeSet<L>,
        transitions: Vec<AtaTransition<L>>,
    ) -> Self {
        AlternatingTimedAutomaton {
            alphabet,
            initial_location,
            final_locations,
            transitions,
        }
    }

    /// Get the alphabet of the automaton
    pub fn alphabet(&self) -> &BTreeSet<Action> {
        &self.alphabet
    }

    /// Get the initial location
    pub fn initial_location(&self) -> &L {
        &self.initial_location
    }

    /// Get the final locations
    pub fn final_locations(&self) -> &BTreeSet<L> {
        &self.final_locations
    }

    /// Iterate over the transitions
    pub fn transitions(&self) -> impl Iterator<Item = &AtaTransition<L>> {
        self.transitions.iter()
    }

    /// The initial configuration: the initial location with clock 0
    pub fn initial_configuration(&self) -> AtaConfiguration<L> {
        BTreeSet::from([AtaState {
            location: self.initial_location.clone(),
            clock_valuation: Clock::default(),
        }])
    }

    /// A configuration is accepting iff all its locations are final
    ///
    /// In particular the empty configuration is accepting: all obligations
    /// have been discharged.
    pub fn is_accepting_configuration(&self, configuration: &AtaConfiguration<L>) -> bool {
        configuration
            .iter()
            .all(|state| self.final_locations.contains(&state.location))
    }

    /// Look up the transition formula for a location and symbol
    fn transition_formula(&self, location: &L, symbol: &Action) -> Option<&Formula<L>> {
        self.transitions
            .iter()
            .find(|t| t.source == *location && t.symbol == *symbol)
            .map(|t| &t.formula)
    }

    /// Compute the successor configurations after reading a symbol
    ///
    /// Every state is replaced by one of the minimal models of its transition
    /// formula; the result combines the per-state choices. A state without a
    /// transition for the symbol behaves as `false`, killing the run. The
    /// empty configuration steps to itself.
    pub fn make_symbol_step(
        &self,
        configuration: &AtaConfiguration<L>,
        symbol: &Action,
    ) -> BTreeSet<AtaConfiguration<L>> {
        if configuration.is_empty() {
            return BTreeSet::from([BTreeSet::new()]);
        }
        let mut per_state_models = Vec::new();
        for state in configuration {
            let models = match self.transition_formula(&state.location, symbol) {
                Some(formula) => formula.minimal_models(state.clock_valuation.valuation()),
                None => BTreeSet::new(),
            };
            if models.is_empty() {
                // One obligation cannot be discharged, there is no successor.
                return BTreeSet::new();
            }
            per_state_models.push(models);
        }
        let mut configurations: BTreeSet<AtaConfiguration<L>> =
            per_state_models[0].iter().cloned().collect();
        for models in &per_state_models[1..] {
            let mut expanded = BTreeSet::new();
            for model in models {
                for configuration in &configurations {
                    let mut union = configuration.clone();
                    union.extend(model.iter().cloned());
                    expanded.insert(union);
                }
            }
            configurations = expanded;
        }
        configurations
    }

    /// Advance every clock of the configuration by the given delta
    pub fn make_time_step(
        &self,
        configuration: &AtaConfiguration<L>,
        delta: Time,
    ) -> Result<AtaConfiguration<L>, AtaError> {
        if delta < 0. {
            return Err(AtaError::NegativeTimeDelta(delta));
        }
        Ok(configuration
            .iter()
            .map(|state| {
                let mut clock = state.clock_valuation;
                clock.tick(delta);
                AtaState {
                    location: state.location.clone(),
                    clock_valuation: clock,
                }
            })
            .collect())
    }

    /// Extend the given runs by reading a symbol
    ///
    /// Returns an error if a run would make two symbol transitions in a row.
    pub fn make_symbol_transition(
        &self,
        runs: Vec<Run<L>>,
        symbol: &Action,
    ) -> Result<Vec<Run<L>>, AtaError> {
        let mut res = Vec::new();
        for run in runs {
            if matches!(run.last(), Some((RunStep::Symbol(_), _))) {
                return Err(AtaError::WrongTransitionType(
                    "cannot do two subsequent symbol transitions, transitions must alternate \
                     between symbol and time"
                        .into(),
                ));
            }
            let start_states = match run.last() {
                Some((_, configuration)) => configuration.clone(),
                None => self.initial_configuration(),
            };
            for configuration in self.make_symbol_step(&start_states, symbol) {
                let mut expanded = run.clone();
                expanded.push((RunStep::Symbol(symbol.clone()), configuration));
                res.push(expanded);
            }
        }
        Ok(res)
    }

    /// Extend the given runs by letting time pass
    ///
    /// Returns an error if a run is empty (a run must start with a symbol
    /// transition) or would make two time transitions in a row.
    pub fn make_time_transition(
        &self,
        runs: Vec<Run<L>>,
        delta: Time,
    ) -> Result<Vec<Run<L>>, AtaError> {
        let mut res = Vec::new();
        for mut run in runs {
            match run.last() {
                None => {
                    return Err(AtaError::WrongTransitionType(
                        "cannot do a time transition on an empty run, a run must start with a \
                         symbol transition"
                            .into(),
                    ))
                }
                Some((RunStep::Time(_), _)) => {
                    return Err(AtaError::WrongTransitionType(
                        "cannot do two subsequent time transitions, transitions must alternate \
                         between symbol and time"
                            .into(),
                    ))
                }
                Some((RunStep::Symbol(_), configuration)) => {
                    let next = self.make_time_step(configuration, delta)?;
                    run.push((RunStep::Time(delta), next));
                    res.push(run);
                }
            }
        }
        Ok(res)
    }

    /// Check whether the automaton accepts the given timed word
    ///
    /// The word carries absolute timestamps and must start at time 0. The
    /// word is accepted iff some run ends in an accepting configuration.
    pub fn accepts_word(&self, word: &TimedWord<Action>) -> Result<bool, AtaError> {
        let Some(((first_symbol, first_time), rest)) = word.split_first() else {
            return Ok(false);
        };
        if *first_time != 0. {
            return Err(AtaError::InvalidTimedWord(format!(
                "the first timestamp must be 0, got {first_time}"
            )));
        }
        // A run on (a0,t0) (a1,t1) … is C0 →a0 C1 →(t1-t0) C1' →a1 C2 …: it
        // interleaves symbol steps with the time difference to the *next*
        // timed symbol.
        let mut runs = self.make_symbol_transition(vec![Vec::new()], first_symbol)?;
        let mut last_time = *first_time;
        for (symbol, time) in rest {
            if *time < last_time {
                return Err(AtaError::InvalidTimedWord(format!(
                    "timestamp {time} is smaller than its predecessor {last_time}"
                )));
            }
            runs = self.make_time_transition(runs, time - last_time)?;
            last_time = *time;
            runs = self.make_symbol_transition(runs, symbol)?;
        }
        Ok(runs.iter().any(|run| {
            run.last()
                .is_some_and(|(_, configuration)| self.is_accepting_configuration(configuration))
        }))
    }
}

impl<L: Clone + Ord + fmt::Debug + fmt::Display> fmt::Display for AlternatingTimedAutomaton<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alphabet: {{{}}}, initial location: {}, final locations: {}, transitions:",
            join_iterator(self.alphabet.iter(), ", "),
            self.initial_location,
            display_set(self.final_locations.iter()),
        )?;
        for transition in &self.transitions {
            write!(f, "\n  {transition}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClockConstraint;

    /// A small ATA over locations "s0"/"s1": on `a`, s0 spawns both s0 and
    /// s1; on `b`, s0 is discharged if the clock is below 1, s1 is always
    /// discharged.
    fn example_ata() -> AlternatingTimedAutomaton<String> {
        AlternatingTimedAutomaton::new(
            BTreeSet::from([Action::new("a"), Action::new("b")]),
            "s0".to_string(),
            BTreeSet::new(),
            vec![
                AtaTransition {
                    source: "s0".to_string(),
                    symbol: Action::new("a"),
                    formula: Formula::and(
                        Formula::Location("s0".to_string()),
                        Formula::reset(Formula::Location("s1".to_string())),
                    ),
                },
                AtaTransition {
                    source: "s0".to_string(),
                    symbol: Action::new("b"),
                    formula: Formula::ClockConstraint(ClockConstraint::LessThan(1)),
                },
                AtaTransition {
                    source: "s1".to_string(),
                    symbol: Action::new("b"),
                    formula: Formula::True,
                },
            ],
        )
    }

    #[test]
    fn test_symbol_step_spawns_states() {
        let ata = example_ata();
        let successors = ata.make_symbol_step(&ata.initial_configuration(), &Action::new("a"));
        assert_eq!(successors.len(), 1);
        let successor = successors.first().unwrap();
        assert_eq!(successor.len(), 2);
    }

    #[test]
    fn test_symbol_step_on_empty_configuration() {
        let ata = example_ata();
        let successors = ata.make_symbol_step(&BTreeSet::new(), &Action::new("a"));
        assert_eq!(successors, BTreeSet::from([BTreeSet::new()]));
    }

    #[test]
    fn test_missing_transition_kills_the_run() {
        let ata = example_ata();
        // s1 has no transition on `a`.
        let configuration = BTreeSet::from([AtaState {
            location: "s1".to_string(),
            clock_valuation: Clock::new(0.),
        }]);
        assert!(ata.make_symbol_step(&configuration, &Action::new("a")).is_empty());
    }

    #[test]
    fn test_time_step() {
        let ata = example_ata();
        let configuration = ata.initial_configuration();
        let stepped = ata.make_time_step(&configuration, 1.5).unwrap();
        assert_eq!(
            stepped.first().unwrap().clock_valuation,
            Clock::new(1.5)
        );
        assert!(matches!(
            ata.make_time_step(&configuration, -0.5),
            Err(AtaError::NegativeTimeDelta(_))
        ));
    }

    #[test]
    fn test_alternation_is_enforced() {
        let ata = example_ata();
        let runs = ata
            .make_symbol_transition(vec![Vec::new()], &Action::new("a"))
            .unwrap();
        // Two symbol transitions in a row are rejected.
        assert!(matches!(
            ata.make_symbol_transition(runs.clone(), &Action::new("a")),
            Err(AtaError::WrongTransitionType(_))
        ));
        // A time transition on an empty run is rejected.
        assert!(matches!(
            ata.make_time_transition(vec![Vec::new()], 1.),
            Err(AtaError::WrongTransitionType(_))
        ));
        // Two time transitions in a row are rejected.
        let runs = ata.make_time_transition(runs, 1.).unwrap();
        assert!(matches!(
            ata.make_time_transition(runs, 1.),
            Err(AtaError::WrongTransitionType(_))
        ));
    }

    #[test]
    fn test_accepts_word() {
        let ata = example_ata();
        // a at 0 spawns (s0, 0) and (s1, 0); b at 0.5 discharges both.
        assert!(ata
            .accepts_word(&vec![(Action::new("a"), 0.), (Action::new("b"), 0.5)])
            .unwrap());
        // At time 1.5 the s0 obligation (clock < 1) can no longer be
        // discharged.
        assert!(!ata
            .accepts_word(&vec![(Action::new("a"), 0.), (Action::new("b"), 1.5)])
            .unwrap());
        // The empty word is rejected.
        assert!(!ata.accepts_word(&vec![]).unwrap());
    }

    #[test]
    fn test_word_must_start_at_zero() {
        let ata = example_ata();
        assert!(matches!(
            ata.accepts_word(&vec![(Action::new("a"), 1.)]),
            Err(AtaError::InvalidTimedWord(_))
        ));
    }
}
