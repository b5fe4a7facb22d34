//! Symbol and time successors of canonical words.
//!
//! Because only the region indexes and the ordering of fractional parts
//! matter, a canonical word has finitely many time successors: either the
//! clocks on integer boundaries move into the adjacent open regions, or the
//! clocks with the largest fractional part cross the next integer boundary.
//! Symbol successors are computed on a concrete representative
//! ([`candidate`]) and re-abstracted.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use syntra_automata::ata::{AtaConfiguration, AtaState};
use syntra_automata::regions::RegionIndex;
use syntra_automata::ta::Configuration;
use syntra_automata::{Action, Clock, Time};
use syntra_logic::translator::SpecAta;
use syntra_logic::MtlFormula;

use crate::canonical_word::{
    canonical_word, display_word, validate_canonical_word, AbRegionSymbol, CanonicalWord,
    CanonicalWordError,
};
use crate::plant::Plant;

/// Increment the region indexes of a partition, capped at the maximal index
///
/// Members that reach the maximal (unbounded) region are split off into the
/// second component.
fn increment_partition(
    partition: &BTreeSet<AbRegionSymbol>,
    max_region_index: RegionIndex,
) -> (BTreeSet<AbRegionSymbol>, BTreeSet<AbRegionSymbol>) {
    let mut incremented = BTreeSet::new();
    let mut maxed = BTreeSet::new();
    for symbol in partition {
        let region_index = symbol.region_index();
        let next = if region_index < max_region_index {
            region_index + 1
        } else {
            region_index
        };
        if next == max_region_index {
            maxed.insert(symbol.with_region_index(next));
        } else {
            incremented.insert(symbol.with_region_index(next));
        }
    }
    (incremented, maxed)
}

/// Compute the direct time successor of a canonical word
///
/// If the first partition lies on integer boundaries (even region indexes),
/// its members move into the adjacent open regions and stay in front
/// (smallest fractional part). Otherwise the last non-maxed partition (the
/// largest fractional part) crosses the next integer boundary and becomes
/// the new first partition. Members reaching the unbounded region collect in
/// a trailing partition that never moves again; a word whose members are all
/// in the unbounded region is its own successor.
pub fn time_successor(word: &CanonicalWord, k: u32) -> CanonicalWord {
    debug_assert!(validate_canonical_word(word).is_ok());
    if word.is_empty() {
        return word.clone();
    }
    let max_region_index = 2 * k + 1;

    // Split off the trailing partition holding only unbounded regions.
    let mut nonmaxed: Vec<&BTreeSet<AbRegionSymbol>> = word.iter().collect();
    let mut maxed_partition: BTreeSet<AbRegionSymbol> = BTreeSet::new();
    if let Some(last) = nonmaxed.last() {
        if last
            .iter()
            .all(|symbol| symbol.region_index() == max_region_index)
        {
            maxed_partition = (*last).clone();
            nonmaxed.pop();
        }
    }
    let Some(first) = nonmaxed.first() else {
        // Everything is maxed, nothing can change anymore.
        return word.clone();
    };

    let mut res: CanonicalWord = Vec::new();
    let first_is_integral = first
        .iter()
        .any(|symbol| symbol.region_index() % 2 == 0);
    if first_is_integral {
        // The clocks on integer boundaries enter the adjacent open regions;
        // they keep the smallest fractional part and stay in front.
        let (incremented, newly_maxed) = increment_partition(first, max_region_index);
        maxed_partition.extend(newly_maxed);
        if !incremented.is_empty() {
            res.push(incremented);
        }
        res.extend(nonmaxed[1..].iter().map(|p| (*p).clone()));
    } else if let Some((last, rest)) = nonmaxed.split_last() {
        // The clocks with the largest fractional part reach the next integer
        // boundary and become the new first partition.
        let (incremented, newly_maxed) = increment_partition(last, max_region_index);
        maxed_partition.extend(newly_maxed);
        if !incremented.is_empty() {
            res.push(incremented);
        }
        res.extend(rest.iter().map(|p| (*p).clone()));
    }
    if !maxed_partition.is_empty() {
        res.push(maxed_partition);
    }
    debug_assert!(validate_canonical_word(&res).is_ok());
    res
}

/// Get the nth time successor of a canonical word
pub fn nth_time_successor(word: &CanonicalWord, n: RegionIndex, k: u32) -> CanonicalWord {
    let mut res = word.clone();
    for _ in 0..n {
        res = time_successor(&res, k);
    }
    res
}

/// Enumerate all time successors of a canonical word
///
/// Returns the word itself and every distinct successor, each paired with
/// the region increment reaching it, in increasing order. The enumeration
/// stops at the fixpoint where all members are in the unbounded region.
pub fn time_successors(
    word: &CanonicalWord,
    k: u32,
) -> Vec<(RegionIndex, CanonicalWord)> {
    trace!("Computing time successors of {} with K={k}", display_word(word));
    let mut current = word.clone();
    let mut successors = vec![(0, current.clone())];
    let mut index: RegionIndex = 1;
    loop {
        let next = time_successor(&current, k);
        if next == current {
            return successors;
        }
        successors.push((index, next.clone()));
        current = next;
        index += 1;
    }
}

/// Construct a concrete (plant, ATA) configuration represented by the word
///
/// The integral part of each clock is `region / 2`; clocks in odd regions of
/// partition i (out of n) get the fractional part `(i+1)/(n+1)`, clocks in
/// even regions get 0.
pub fn candidate(
    word: &CanonicalWord,
) -> Result<(Configuration, AtaConfiguration<MtlFormula>), CanonicalWordError> {
    debug_assert!(validate_canonical_word(word).is_ok());
    let time_delta = 1. / (word.len() as Time + 1.);
    let mut location = None;
    let mut clock_valuations = BTreeMap::new();
    let mut ata_configuration = AtaConfiguration::new();
    for (i, partition) in word.iter().enumerate() {
        for symbol in partition {
            let region_index = symbol.region_index();
            let fractional_part = if region_index % 2 == 0 {
                0.
            } else {
                time_delta * (i as Time + 1.)
            };
            let integral_part = Time::from(region_index / 2);
            match symbol {
                AbRegionSymbol::Plant(state) => {
                    location = Some(state.location.clone());
                    clock_valuations.insert(
                        state.clock.clone(),
                        Clock::new(integral_part + fractional_part),
                    );
                }
                AbRegionSymbol::Ata(state) => {
                    ata_configuration.insert(AtaState {
                        location: state.formula.clone(),
                        clock_valuation: Clock::new(integral_part + fractional_part),
                    });
                }
            }
        }
    }
    let location = location.ok_or(CanonicalWordError::MissingPlantState)?;
    Ok((
        Configuration {
            location,
            clock_valuations,
        },
        ata_configuration,
    ))
}

/// The outcome of firing one action on a joint configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSuccessors {
    /// The plant cannot fire the action
    Disabled,
    /// The plant moves, but the specification automaton has no run; the
    /// words describe the plant successors on their own
    SpecViolation(BTreeSet<CanonicalWord>),
    /// The joint successors of plant and specification automaton
    Joint(BTreeSet<CanonicalWord>),
}

/// Compute the canonical words reached from a joint configuration by one
/// action
///
/// Combines every plant symbol successor with every ATA symbol successor and
/// canonicalizes the results; duplicates collapse by word equality. When the
/// plant can fire the action but the ATA cannot follow, the continuation
/// violates the specification and is reported as such.
pub fn symbol_successors<P: Plant>(
    plant: &P,
    ata: &SpecAta,
    plant_configuration: &Configuration,
    ata_configuration: &AtaConfiguration<MtlFormula>,
    action: &Action,
    k: u32,
) -> Result<SymbolSuccessors, CanonicalWordError> {
    let plant_successors = plant.make_symbol_step(plant_configuration, action);
    if plant_successors.is_empty() {
        return Ok(SymbolSuccessors::Disabled);
    }
    let ata_successors = ata.make_symbol_step(ata_configuration, action);
    if ata_successors.is_empty() {
        let mut words = BTreeSet::new();
        for plant_successor in &plant_successors {
            words.insert(canonical_word(plant_successor, &AtaConfiguration::new(), k)?);
        }
        return Ok(SymbolSuccessors::SpecViolation(words));
    }
    let mut words = BTreeSet::new();
    for plant_successor in &plant_successors {
        for ata_successor in &ata_successors {
            words.insert(canonical_word(plant_successor, ata_successor, k)?);
        }
    }
    Ok(SymbolSuccessors::Joint(words))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_word::{AtaRegionState, PlantRegionState};
    use syntra_automata::Location;

    fn plant_state(clock: &str, region_index: RegionIndex) -> AbRegionSymbol {
        AbRegionSymbol::Plant(PlantRegionState {
            location: Location::new("l"),
            clock: clock.to_string(),
            region_index,
        })
    }

    fn ata_state(name: &str, region_index: RegionIndex) -> AbRegionSymbol {
        AbRegionSymbol::Ata(AtaRegionState {
            formula: MtlFormula::ap(name),
            region_index,
        })
    }

    #[test]
    fn test_time_successor_of_single_partition() {
        // A single clock walks through all regions: 0 → 1 → … → 2K+1.
        let word = vec![BTreeSet::from([plant_state("x", 0)])];
        let mut current = word;
        for expected in 1..=5 {
            current = time_successor(&current, 2);
            assert_eq!(
                current,
                vec![BTreeSet::from([plant_state("x", expected)])]
            );
        }
        // The unbounded region is a fixpoint.
        assert_eq!(
            time_successor(&current, 2),
            vec![BTreeSet::from([plant_state("x", 5)])]
        );
    }

    #[test]
    fn test_time_successor_moves_integral_partition_first() {
        // x on the boundary, y in an open region: the immediate successor
        // only moves x off the boundary.
        let word = vec![
            BTreeSet::from([plant_state("x", 0)]),
            BTreeSet::from([plant_state("y", 1)]),
        ];
        let successor = time_successor(&word, 2);
        assert_eq!(
            successor,
            vec![
                BTreeSet::from([plant_state("x", 1)]),
                BTreeSet::from([plant_state("y", 1)]),
            ]
        );
        // Next, y (largest fractional part) crosses the boundary and comes
        // first.
        let successor = time_successor(&successor, 2);
        assert_eq!(
            successor,
            vec![
                BTreeSet::from([plant_state("y", 2)]),
                BTreeSet::from([plant_state("x", 1)]),
            ]
        );
    }

    #[test]
    fn test_time_successor_collects_maxed_states() {
        // With K = 1 the maximal region is 3.
        let word = vec![
            BTreeSet::from([plant_state("x", 2)]),
            BTreeSet::from([plant_state("y", 3), ata_state("a", 1)]),
        ];
        // x moves into (1, ∞) = region 3 and joins the unbounded states.
        let successor = time_successor(&word, 1);
        assert_eq!(
            successor,
            vec![
                BTreeSet::from([plant_state("y", 3), ata_state("a", 1)]),
                BTreeSet::from([plant_state("x", 3)]),
            ]
        );
    }

    #[test]
    fn test_time_successors_enumeration() {
        let word = vec![BTreeSet::from([plant_state("x", 0), ata_state("a", 0)])];
        let successors = time_successors(&word, 1);
        // 0 (the word itself) through 3 (the unbounded region), K = 1.
        assert_eq!(successors.len(), 4);
        assert_eq!(successors[0].0, 0);
        assert_eq!(successors[0].1, word);
        assert_eq!(
            successors[3].1,
            vec![BTreeSet::from([plant_state("x", 3), ata_state("a", 3)])]
        );
    }

    #[test]
    fn test_candidate_reconstructs_regions() {
        let word = vec![
            BTreeSet::from([plant_state("x", 0)]),
            BTreeSet::from([plant_state("y", 1), ata_state("a", 3)]),
        ];
        let (plant_configuration, ata_configuration) = candidate(&word).unwrap();
        assert_eq!(plant_configuration.location, Location::new("l"));
        assert_eq!(plant_configuration.clock_valuations["x"], Clock::new(0.));
        // Partition 1 of 2 gets the fractional part 2/3.
        let y = plant_configuration.clock_valuations["y"].valuation();
        assert!(y > 0. && y < 1.);
        let a = ata_configuration.first().unwrap().clock_valuation.valuation();
        assert!(a > 1. && a < 2.);
        // Re-abstracting the candidate yields the original word.
        assert_eq!(canonical_word(&plant_configuration, &ata_configuration, 1).unwrap(), word);
    }

    #[test]
    fn test_candidate_requires_a_plant_state() {
        let word = vec![BTreeSet::from([ata_state("a", 1)])];
        assert_eq!(
            candidate(&word).unwrap_err(),
            CanonicalWordError::MissingPlantState
        );
    }
}
