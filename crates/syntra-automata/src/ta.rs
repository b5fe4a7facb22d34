//! Timed automata: locations, guarded transitions, configurations and timed
//! word acceptance.
//!
//! A [`TimedAutomaton`] is built through the [`builder::TimedAutomatonBuilder`],
//! which validates that transitions only reference declared locations, clocks
//! and actions. Symbol steps are nondeterministic: [`TimedAutomaton::make_symbol_step`]
//! returns every enabled outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::trace;
use syntra_display_utils::join_iterator;

use crate::{Action, Clock, ClockConstraint, Location, Time, TimedWord};

pub mod builder;
pub mod product;

/// A mapping from clock names to clocks
pub type ClockSetValuation = BTreeMap<String, Clock>;

/// A configuration of a timed automaton: a location and a clock valuation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Configuration {
    /// The current location
    pub location: Location,
    /// The current valuation of every clock
    pub clock_valuations: ClockSetValuation,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clocks = self
            .clock_valuations
            .iter()
            .map(|(name, clock)| format!("({name}: {clock})"));
        write!(f, "({}, {})", self.location, join_iterator(clocks, ""))
    }
}

/// Errors occurring while simulating a timed automaton
#[derive(Debug, Clone, PartialEq)]
pub enum TaError {
    /// A timed word has decreasing timestamps
    InvalidTimedWord(String),
    /// A time step with a negative delta was attempted
    NegativeTimeDelta(Time),
}

impl fmt::Display for TaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaError::InvalidTimedWord(msg) => write!(f, "invalid timed word: {msg}"),
            TaError::NegativeTimeDelta(delta) => {
                write!(f, "cannot advance time by a negative delta (= {delta})")
            }
        }
    }
}

impl std::error::Error for TaError {}

/// A transition of a timed automaton
///
/// A transition from `source` to `target` fires on `action` if every guard
/// constraint is satisfied; the clocks in `resets` are then set to 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    /// The source location
    pub source: Location,
    /// The action this transition fires on
    pub action: Action,
    /// The target location
    pub target: Location,
    /// Guard constraints per clock; all of them must hold for the transition
    /// to be enabled
    pub guard: BTreeMap<String, Vec<ClockConstraint>>,
    /// The clocks reset to 0 when the transition fires
    pub resets: BTreeSet<String>,
}

impl Transition {
    /// Create a new transition without guards or resets
    pub fn new(source: Location, action: Action, target: Location) -> Self {
        Transition {
            source,
            action,
            target,
            guard: BTreeMap::new(),
            resets: BTreeSet::new(),
        }
    }

    /// Add a guard constraint on the given clock
    pub fn with_guard(mut self, clock: impl ToString, constraint: ClockConstraint) -> Self {
        self.guard
            .entry(clock.to_string())
            .or_default()
            .push(constraint);
        self
    }

    /// Add a clock to be reset when the transition fires
    pub fn with_reset(mut self, clock: impl ToString) -> Self {
        self.resets.insert(clock.to_string());
        self
    }

    /// Check whether the transition is enabled for the given action and clock
    /// valuation
    pub fn is_enabled(&self, action: &Action, clock_valuations: &ClockSetValuation) -> bool {
        if *action != self.action {
            return false;
        }
        self.guard.iter().all(|(clock, constraints)| {
            clock_valuations.get(clock).is_some_and(|valuation| {
                constraints
                    .iter()
                    .all(|constraint| constraint.is_satisfied(valuation.valuation()))
            })
        })
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guards = self
            .guard
            .iter()
            .flat_map(|(clock, constraints)| {
                constraints.iter().map(move |c| format!("{clock} {}", DisplayGuard(c)))
            })
            .collect::<Vec<_>>();
        write!(f, "{} → {}", self.source, self.action)?;
        if !guards.is_empty() {
            write!(f, " [{}]", guards.join(" ∧ "))?;
        }
        if !self.resets.is_empty() {
            write!(f, " {{{}}}", join_iterator(self.resets.iter(), ", "))?;
        }
        write!(f, " → {}", self.target)
    }
}

/// Display a constraint without the leading clock placeholder
struct DisplayGuard<'a>(&'a ClockConstraint);

impl fmt::Display for DisplayGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ClockConstraint renders as "x ⋈ n"; strip the placeholder.
        let rendered = self.0.to_string();
        write!(f, "{}", rendered.trim_start_matches("x "))
    }
}

/// A timed automaton
///
/// A timed automaton consists of locations, an alphabet, an initial location,
/// a set of final locations, named clocks, and guarded transitions. Use the
/// [`builder::TimedAutomatonBuilder`] to construct a validated automaton:
///
/// ```
/// use syntra_automata::ta::builder::TimedAutomatonBuilder;
/// use syntra_automata::ta::Transition;
/// use syntra_automata::{Action, ClockConstraint, Location};
///
/// let ta = TimedAutomatonBuilder::new()
///     .with_locations([Location::new("s0"), Location::new("s1")])
///     .with_alphabet([Action::new("a")])
///     .with_clock("x")
///     .with_initial_location(Location::new("s0"))
///     .with_final_locations([Location::new("s1")])
///     .with_transition(
///         Transition::new(Location::new("s0"), Action::new("a"), Location::new("s1"))
///             .with_guard("x", ClockConstraint::LessThan(1)),
///     )
///     .build()
///     .unwrap();
/// assert!(ta.accepts_word(&[(Action::new("a"), 0.5)]).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedAutomaton {
    pub(crate) alphabet: BTreeSet<Action>,
    pub(crate) locations: BTreeSet<Location>,
    pub(crate) initial_location: Location,
    pub(crate) final_locations: BTreeSet<Location>,
    pub(crate) clocks: BTreeSet<String>,
    pub(crate) transitions: BTreeMap<Location, Vec<Transition>>,
}

impl TimedAutomaton {
    /// Get the alphabet of the automaton
    pub fn alphabet(&self) -> &BTreeSet<Action> {
        &self.alphabet
    }

    /// Get the locations of the automaton
    pub fn locations(&self) -> &BTreeSet<Location> {
        &self.locations
    }

    /// Get the initial location
    pub fn initial_location(&self) -> &Location {
        &self.initial_location
    }

    /// Get the final locations
    pub fn final_locations(&self) -> &BTreeSet<Location> {
        &self.final_locations
    }

    /// Get the clock names of the automaton
    pub fn clocks(&self) -> &BTreeSet<String> {
        &self.clocks
    }

    /// Iterate over all transitions
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values().flatten()
    }

    /// Get the outgoing transitions of a location
    pub fn outgoing_transitions(&self, location: &Location) -> impl Iterator<Item = &Transition> {
        self.transitions.get(location).into_iter().flatten()
    }

    /// Get the initial configuration, with every clock at 0
    pub fn initial_configuration(&self) -> Configuration {
        Configuration {
            location: self.initial_location.clone(),
            clock_valuations: self
                .clocks
                .iter()
                .map(|name| (name.clone(), Clock::default()))
                .collect(),
        }
    }

    /// Check whether a configuration is in a final location
    pub fn is_accepting_configuration(&self, configuration: &Configuration) -> bool {
        self.final_locations.contains(&configuration.location)
    }

    /// Get the transitions enabled in the given configuration, for any action
    pub fn enabled_transitions(&self, configuration: &Configuration) -> Vec<&Transition> {
        self.outgoing_transitions(&configuration.location)
            .filter(|t| t.is_enabled(&t.action, &configuration.clock_valuations))
            .collect()
    }

    /// Get the largest constant any clock is compared against
    pub fn largest_constant(&self) -> u32 {
        self.transitions()
            .flat_map(|t| t.guard.values().flatten())
            .map(|constraint| constraint.comparand())
            .max()
            .unwrap_or(0)
    }

    /// Compute the configurations reached by firing the given action
    ///
    /// Determinism is not assumed: all enabled outcomes are returned. The
    /// result is empty if no transition is enabled.
    pub fn make_symbol_step(
        &self,
        configuration: &Configuration,
        action: &Action,
    ) -> BTreeSet<Configuration> {
        trace!("Symbol step with {action} from {configuration}");
        let mut res = BTreeSet::new();
        for transition in self.outgoing_transitions(&configuration.location) {
            if !transition.is_enabled(action, &configuration.clock_valuations) {
                continue;
            }
            let mut next_clocks = configuration.clock_valuations.clone();
            for name in &transition.resets {
                if let Some(clock) = next_clocks.get_mut(name) {
                    clock.reset();
                }
            }
            res.insert(Configuration {
                location: transition.target.clone(),
                clock_valuations: next_clocks,
            });
        }
        res
    }

    /// Advance every clock of the configuration by the given delta
    pub fn tick_configuration(
        &self,
        configuration: &Configuration,
        delta: Time,
    ) -> Result<Configuration, TaError> {
        if delta < 0. {
            return Err(TaError::NegativeTimeDelta(delta));
        }
        let mut next = configuration.clone();
        for clock in next.clock_valuations.values_mut() {
            clock.tick(delta);
        }
        Ok(next)
    }

    /// Advance time by delta, then fire the given action
    pub fn step(
        &self,
        configuration: &Configuration,
        action: &Action,
        delta: Time,
    ) -> Result<BTreeSet<Configuration>, TaError> {
        let ticked = self.tick_configuration(configuration, delta)?;
        Ok(self.make_symbol_step(&ticked, action))
    }

    /// Check whether the automaton accepts the given timed word
    ///
    /// The word carries absolute, monotonically non-decreasing timestamps.
    /// All runs are simulated in parallel; the word is accepted if some run
    /// ends in a final location.
    pub fn accepts_word(&self, word: &TimedWord<Action>) -> Result<bool, TaError> {
        let mut configurations = BTreeSet::from([self.initial_configuration()]);
        let mut last_time = 0.;
        for (action, time) in word {
            if *time < last_time {
                return Err(TaError::InvalidTimedWord(format!(
                    "timestamp {time} is smaller than its predecessor {last_time}"
                )));
            }
            let mut next_configurations = BTreeSet::new();
            for configuration in &configurations {
                next_configurations.extend(self.step(configuration, action, time - last_time)?);
            }
            last_time = *time;
            configurations = next_configurations;
            if configurations.is_empty() {
                return Ok(false);
            }
        }
        Ok(configurations
            .iter()
            .any(|c| self.is_accepting_configuration(c)))
    }
}

impl fmt::Display for TimedAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Alphabet: {{{}}}, initial location: {}, final locations: {{{}}}, clocks: {{{}}}",
            join_iterator(self.alphabet.iter(), ", "),
            self.initial_location,
            join_iterator(self.final_locations.iter(), ", "),
            join_iterator(self.clocks.iter(), ", "),
        )?;
        for transition in self.transitions() {
            writeln!(f, "  {transition}")?;
        }
        Ok(())
    }
}
