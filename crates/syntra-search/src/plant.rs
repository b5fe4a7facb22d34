//! The plant capability set.
//!
//! The search is generic over the plant: anything that can report its
//! initial configuration, step on an action and tell accepting
//! configurations apart can be controlled. [`syntra_automata::ta::TimedAutomaton`]
//! is the canonical implementation; alternative front ends (e.g. an agent
//! program interpreter) map their state into the same
//! [`Configuration`] shape and, when they require process-wide
//! initialization, guard it with an [`ExclusiveHandle`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use syntra_automata::ta::{Configuration, TaError, TimedAutomaton};
use syntra_automata::{Action, Time};

/// The capability set a plant must provide to the search
pub trait Plant {
    /// The configuration the plant starts in
    fn initial_configuration(&self) -> Configuration;

    /// Check whether a configuration is accepting
    fn is_accepting_configuration(&self, configuration: &Configuration) -> bool;

    /// Compute all configurations reached by firing the given action
    fn make_symbol_step(
        &self,
        configuration: &Configuration,
        action: &Action,
    ) -> BTreeSet<Configuration>;

    /// Advance every clock of a configuration by the given delta
    fn tick_configuration(
        &self,
        configuration: &Configuration,
        delta: Time,
    ) -> Result<Configuration, TaError>;

    /// Advance time by delta, then fire the given action
    fn step(
        &self,
        configuration: &Configuration,
        action: &Action,
        delta: Time,
    ) -> Result<BTreeSet<Configuration>, TaError> {
        let ticked = self.tick_configuration(configuration, delta)?;
        Ok(self.make_symbol_step(&ticked, action))
    }

    /// The largest constant any clock is compared against
    fn largest_constant(&self) -> u32;

    /// The clock names of the plant
    fn clocks(&self) -> BTreeSet<String>;

    /// The action alphabet of the plant
    fn actions(&self) -> BTreeSet<Action>;
}

impl Plant for TimedAutomaton {
    fn initial_configuration(&self) -> Configuration {
        TimedAutomaton::initial_configuration(self)
    }

    fn is_accepting_configuration(&self, configuration: &Configuration) -> bool {
        TimedAutomaton::is_accepting_configuration(self, configuration)
    }

    fn make_symbol_step(
        &self,
        configuration: &Configuration,
        action: &Action,
    ) -> BTreeSet<Configuration> {
        TimedAutomaton::make_symbol_step(self, configuration, action)
    }

    fn tick_configuration(
        &self,
        configuration: &Configuration,
        delta: Time,
    ) -> Result<Configuration, TaError> {
        TimedAutomaton::tick_configuration(self, configuration, delta)
    }

    fn largest_constant(&self) -> u32 {
        TimedAutomaton::largest_constant(self)
    }

    fn clocks(&self) -> BTreeSet<String> {
        TimedAutomaton::clocks(self).clone()
    }

    fn actions(&self) -> BTreeSet<Action> {
        self.alphabet().clone()
    }
}

/// Error raised when a second exclusive handle is requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyAcquired;

impl fmt::Display for AlreadyAcquired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the exclusive plant handle is already acquired")
    }
}

impl std::error::Error for AlreadyAcquired {}

/// A scoped guard for plant back ends with process-wide state
///
/// Some plant front ends wrap an interpreter that can only be initialized
/// once per process. Such back ends acquire the handle before initializing;
/// at most one handle exists at a time, and dropping it releases the slot.
///
/// ```
/// use syntra_search::plant::ExclusiveHandle;
///
/// let handle = ExclusiveHandle::acquire().unwrap();
/// assert!(ExclusiveHandle::acquire().is_err());
/// drop(handle);
/// assert!(ExclusiveHandle::acquire().is_ok());
/// ```
#[derive(Debug)]
pub struct ExclusiveHandle {
    _private: (),
}

static HANDLE_TAKEN: AtomicBool = AtomicBool::new(false);

impl ExclusiveHandle {
    /// Acquire the process-wide handle
    ///
    /// Fails with [`AlreadyAcquired`] while another handle is live.
    pub fn acquire() -> Result<ExclusiveHandle, AlreadyAcquired> {
        if HANDLE_TAKEN
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(ExclusiveHandle { _private: () })
        } else {
            Err(AlreadyAcquired)
        }
    }
}

impl Drop for ExclusiveHandle {
    fn drop(&mut self) {
        HANDLE_TAKEN.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syntra_automata::ta::builder::TimedAutomatonBuilder;
    use syntra_automata::Location;

    #[test]
    fn test_timed_automaton_as_plant() {
        let ta = TimedAutomatonBuilder::new()
            .with_locations([Location::new("s0"), Location::new("s1")])
            .with_alphabet([Action::new("a")])
            .with_clock("x")
            .with_initial_location(Location::new("s0"))
            .with_final_locations([Location::new("s1")])
            .with_transition(syntra_automata::ta::Transition::new(
                Location::new("s0"),
                Action::new("a"),
                Location::new("s1"),
            ))
            .build()
            .unwrap();
        let plant: &dyn Plant = &ta;
        let initial = plant.initial_configuration();
        assert!(!plant.is_accepting_configuration(&initial));
        let successors = plant.step(&initial, &Action::new("a"), 0.5).unwrap();
        assert_eq!(successors.len(), 1);
        assert!(plant.is_accepting_configuration(successors.first().unwrap()));
        assert_eq!(plant.actions(), BTreeSet::from([Action::new("a")]));
        assert_eq!(plant.clocks(), BTreeSet::from(["x".to_string()]));
    }

    #[test]
    fn test_exclusive_handle_is_exclusive() {
        let handle = ExclusiveHandle::acquire().unwrap();
        assert_eq!(ExclusiveHandle::acquire().unwrap_err(), AlreadyAcquired);
        drop(handle);
        let _handle = ExclusiveHandle::acquire().unwrap();
    }
}
