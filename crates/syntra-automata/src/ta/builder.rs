//! Factory for building a valid [`TimedAutomaton`]
//!
//! The builder ensures that the automaton is well-formed: the initial and
//! final locations are declared, and every transition only references
//! declared locations, clocks and actions. Malformed input is rejected at
//! construction with a typed [`TaBuildError`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Action, Location};

use super::{TimedAutomaton, Transition};

/// Error raised when constructing an invalid timed automaton
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaBuildError {
    /// The same location was declared twice
    DuplicateLocation(Location),
    /// The same clock was declared twice
    DuplicateClock(String),
    /// A transition or the initial/final set references an undeclared location
    UnknownLocation(Location),
    /// A guard or reset references an undeclared clock
    UnknownClock(String),
    /// A transition fires on an action outside the alphabet
    UnknownAction(Action),
    /// No initial location was set
    MissingInitialLocation,
}

impl fmt::Display for TaBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaBuildError::DuplicateLocation(l) => write!(f, "duplicate location '{l}'"),
            TaBuildError::DuplicateClock(c) => write!(f, "duplicate clock '{c}'"),
            TaBuildError::UnknownLocation(l) => write!(f, "unknown location '{l}'"),
            TaBuildError::UnknownClock(c) => write!(f, "unknown clock '{c}'"),
            TaBuildError::UnknownAction(a) => write!(f, "unknown action '{a}'"),
            TaBuildError::MissingInitialLocation => write!(f, "no initial location was set"),
        }
    }
}

impl std::error::Error for TaBuildError {}

/// Builder for a [`TimedAutomaton`]
///
/// Locations, the alphabet and clocks are declared first; the initial
/// location, final locations and transitions are validated against those
/// declarations when [`TimedAutomatonBuilder::build`] is called.
#[derive(Debug, Clone, Default)]
pub struct TimedAutomatonBuilder {
    locations: Vec<Location>,
    alphabet: BTreeSet<Action>,
    clocks: Vec<String>,
    initial_location: Option<Location>,
    final_locations: BTreeSet<Location>,
    transitions: Vec<Transition>,
}

impl TimedAutomatonBuilder {
    /// Create a new, empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a location
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// Declare multiple locations
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations.extend(locations);
        self
    }

    /// Declare an action
    pub fn with_action(mut self, action: Action) -> Self {
        self.alphabet.insert(action);
        self
    }

    /// Declare the alphabet
    pub fn with_alphabet(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.alphabet.extend(actions);
        self
    }

    /// Declare a clock
    pub fn with_clock(mut self, clock: impl ToString) -> Self {
        self.clocks.push(clock.to_string());
        self
    }

    /// Declare multiple clocks
    pub fn with_clocks<C: ToString>(mut self, clocks: impl IntoIterator<Item = C>) -> Self {
        self.clocks.extend(clocks.into_iter().map(|c| c.to_string()));
        self
    }

    /// Set the initial location
    pub fn with_initial_location(mut self, location: Location) -> Self {
        self.initial_location = Some(location);
        self
    }

    /// Set the final locations
    pub fn with_final_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.final_locations.extend(locations);
        self
    }

    /// Add a transition
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions
    pub fn with_transitions(mut self, transitions: impl IntoIterator<Item = Transition>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Validate the declarations and build the automaton
    pub fn build(self) -> Result<TimedAutomaton, TaBuildError> {
        let mut locations = BTreeSet::new();
        for location in self.locations {
            if !locations.insert(location.clone()) {
                return Err(TaBuildError::DuplicateLocation(location));
            }
        }
        let mut clocks = BTreeSet::new();
        for clock in self.clocks {
            if !clocks.insert(clock.clone()) {
                return Err(TaBuildError::DuplicateClock(clock));
            }
        }
        let initial_location = self
            .initial_location
            .ok_or(TaBuildError::MissingInitialLocation)?;
        if !locations.contains(&initial_location) {
            return Err(TaBuildError::UnknownLocation(initial_location));
        }
        for location in &self.final_locations {
            if !locations.contains(location) {
                return Err(TaBuildError::UnknownLocation(location.clone()));
            }
        }
        let mut transitions: BTreeMap<Location, Vec<Transition>> = BTreeMap::new();
        for transition in self.transitions {
            if !self.alphabet.contains(&transition.action) {
                return Err(TaBuildError::UnknownAction(transition.action));
            }
            if !locations.contains(&transition.source) {
                return Err(TaBuildError::UnknownLocation(transition.source));
            }
            if !locations.contains(&transition.target) {
                return Err(TaBuildError::UnknownLocation(transition.target));
            }
            for clock in transition.guard.keys() {
                if !clocks.contains(clock) {
                    return Err(TaBuildError::UnknownClock(clock.clone()));
                }
            }
            for clock in &transition.resets {
                if !clocks.contains(clock) {
                    return Err(TaBuildError::UnknownClock(clock.clone()));
                }
            }
            transitions
                .entry(transition.source.clone())
                .or_default()
                .push(transition);
        }
        Ok(TimedAutomaton {
            alphabet: self.alphabet,
            locations,
            initial_location,
            final_locations: self.final_locations,
            clocks,
            transitions,
        })
    }
}
