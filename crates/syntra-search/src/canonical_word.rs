//! Canonical words: the region abstraction of joint (plant, ATA)
//! configurations.
//!
//! A canonical word expands a plant configuration into (location, clock,
//! valuation) triples, merges them with the states of the ATA configuration,
//! partitions the result by the fractional parts of the clock valuations and
//! replaces every valuation by its region index. Two joint configurations
//! are region-equivalent iff their canonical words are equal, so canonical
//! words serve as the symbolic states of the search.

use std::collections::BTreeSet;
use std::fmt;

use syntra_automata::ata::AtaConfiguration;
use syntra_automata::regions::{RegionIndex, RegionSet};
use syntra_automata::ta::Configuration;
use syntra_automata::{numbers, Location};
use syntra_display_utils::{display_set, join_iterator};
use syntra_logic::MtlFormula;

/// A regionalized plant state: one clock of the plant with its location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlantRegionState {
    /// The plant location
    pub location: Location,
    /// The name of the clock
    pub clock: String,
    /// The region index of the clock
    pub region_index: RegionIndex,
}

impl fmt::Display for PlantRegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.location, self.clock, self.region_index)
    }
}

/// A regionalized ATA state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtaRegionState {
    /// The ATA location (an MTL formula)
    pub formula: MtlFormula,
    /// The region index of the state's clock
    pub region_index: RegionIndex,
}

impl fmt::Display for AtaRegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.formula, self.region_index)
    }
}

/// One symbol of a canonical word: a regionalized plant or ATA state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbRegionSymbol {
    /// A plant state
    Plant(PlantRegionState),
    /// An ATA state
    Ata(AtaRegionState),
}

impl AbRegionSymbol {
    /// The region index of the symbol
    pub fn region_index(&self) -> RegionIndex {
        match self {
            AbRegionSymbol::Plant(state) => state.region_index,
            AbRegionSymbol::Ata(state) => state.region_index,
        }
    }

    /// Replace the region index of the symbol
    pub fn with_region_index(&self, region_index: RegionIndex) -> AbRegionSymbol {
        match self {
            AbRegionSymbol::Plant(state) => AbRegionSymbol::Plant(PlantRegionState {
                region_index,
                ..state.clone()
            }),
            AbRegionSymbol::Ata(state) => AbRegionSymbol::Ata(AtaRegionState {
                region_index,
                formula: state.formula.clone(),
            }),
        }
    }
}

impl fmt::Display for AbRegionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbRegionSymbol::Plant(state) => write!(f, "{state}"),
            AbRegionSymbol::Ata(state) => write!(f, "{state}"),
        }
    }
}

/// A canonical word: partitions of regionalized states ordered by increasing
/// fractional part
pub type CanonicalWord = Vec<BTreeSet<AbRegionSymbol>>;

/// Render a canonical word
pub fn display_word(word: &CanonicalWord) -> String {
    if word.is_empty() {
        return "[]".to_string();
    }
    format!(
        "[ {} ]",
        join_iterator(word.iter().map(|partition| display_set(partition.iter())), ", ")
    )
}

/// Errors raised when a canonical word is malformed
///
/// These indicate a bug in the successor computation rather than bad user
/// input, but they are surfaced as typed errors so the search never turns
/// them into silent labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalWordError {
    /// The plant configuration has no clocks
    PlantWithoutClocks,
    /// The word has no partitions
    EmptyWord,
    /// The word contains an empty partition
    EmptyPartition,
    /// A partition mixes even and odd region indexes
    MixedParity(String),
    /// A partition after the first contains an even region index
    MisplacedIntegralPartition(String),
    /// The word contains no plant state
    MissingPlantState,
}

impl fmt::Display for CanonicalWordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalWordError::PlantWithoutClocks => {
                write!(f, "plants without clocks are not supported")
            }
            CanonicalWordError::EmptyWord => write!(f, "the canonical word is empty"),
            CanonicalWordError::EmptyPartition => {
                write!(f, "the canonical word contains an empty partition")
            }
            CanonicalWordError::MixedParity(word) => write!(
                f,
                "a partition of '{word}' mixes even and odd region indexes"
            ),
            CanonicalWordError::MisplacedIntegralPartition(word) => write!(
                f,
                "a partition after the first of '{word}' has an even region index"
            ),
            CanonicalWordError::MissingPlantState => {
                write!(f, "the canonical word contains no plant state")
            }
        }
    }
}

impl std::error::Error for CanonicalWordError {}

/// Compute the canonical word of a joint (plant, ATA) configuration
///
/// The plant configuration is expanded into one entry per clock; entries are
/// partitioned by the (approximate) fractional part of their valuation and
/// regionalized with the largest constant `K`.
pub fn canonical_word(
    plant_configuration: &Configuration,
    ata_configuration: &AtaConfiguration<MtlFormula>,
    k: u32,
) -> Result<CanonicalWord, CanonicalWordError> {
    if plant_configuration.clock_valuations.is_empty() {
        return Err(CanonicalWordError::PlantWithoutClocks);
    }
    let regions = RegionSet { largest_constant: k };

    // Expand into (fractional part, regionalized symbol) pairs.
    let mut entries: Vec<(f64, AbRegionSymbol)> = Vec::new();
    for (clock, valuation) in &plant_configuration.clock_valuations {
        entries.push((
            normalized_fraction(valuation.valuation()),
            AbRegionSymbol::Plant(PlantRegionState {
                location: plant_configuration.location.clone(),
                clock: clock.clone(),
                region_index: regions.region_index(valuation.valuation()),
            }),
        ));
    }
    for state in ata_configuration {
        entries.push((
            normalized_fraction(state.clock_valuation.valuation()),
            AbRegionSymbol::Ata(AtaRegionState {
                formula: state.location.clone(),
                region_index: regions.region_index(state.clock_valuation.valuation()),
            }),
        ));
    }

    // Partition by fractional part, in increasing order.
    entries.sort_by(|(f1, s1), (f2, s2)| f1.total_cmp(f2).then_with(|| s1.cmp(s2)));
    let mut word: CanonicalWord = Vec::new();
    let mut current_fraction = f64::NAN;
    for (fraction, symbol) in entries {
        if word.is_empty() || !numbers::approx_eq(fraction, current_fraction) {
            word.push(BTreeSet::new());
            current_fraction = fraction;
        }
        if let Some(partition) = word.last_mut() {
            partition.insert(symbol);
        }
    }
    debug_assert!(validate_canonical_word(&word).is_ok());
    Ok(word)
}

/// The fractional part used for partitioning, with near-integral values
/// mapped to 0
fn normalized_fraction(valuation: f64) -> f64 {
    let fraction = numbers::fractional_part(valuation);
    if numbers::is_near_zero(fraction) {
        0.
    } else {
        fraction
    }
}

/// Check that a canonical word is well-formed
///
/// Every partition must be non-empty and uniformly even or uniformly odd,
/// and only the first partition may hold even region indexes (fractional
/// part 0).
pub fn validate_canonical_word(word: &CanonicalWord) -> Result<(), CanonicalWordError> {
    if word.is_empty() {
        return Err(CanonicalWordError::EmptyWord);
    }
    for partition in word {
        if partition.is_empty() {
            return Err(CanonicalWordError::EmptyPartition);
        }
        let has_even = partition.iter().any(|s| s.region_index() % 2 == 0);
        let has_odd = partition.iter().any(|s| s.region_index() % 2 == 1);
        if has_even && has_odd {
            return Err(CanonicalWordError::MixedParity(display_word(word)));
        }
    }
    for partition in word.iter().skip(1) {
        if partition.iter().any(|s| s.region_index() % 2 == 0) {
            return Err(CanonicalWordError::MisplacedIntegralPartition(display_word(
                word,
            )));
        }
    }
    Ok(())
}

/// Project a canonical word to its plant components
///
/// The result keeps only the plant states of every partition; partitions
/// that become empty are dropped.
pub fn reg_a(word: &CanonicalWord) -> CanonicalWord {
    word.iter()
        .filter_map(|partition| {
            let plant_only: BTreeSet<AbRegionSymbol> = partition
                .iter()
                .filter(|symbol| matches!(symbol, AbRegionSymbol::Plant(_)))
                .cloned()
                .collect();
            (!plant_only.is_empty()).then_some(plant_only)
        })
        .collect()
}

/// Check whether `word` is monotonically dominated by `other`
///
/// Every partition of `word` must be included in a partition of `other`,
/// with the matching partitions appearing in the same order.
pub fn is_monotonically_dominated(word: &CanonicalWord, other: &CanonicalWord) -> bool {
    let mut next_other_idx = 0;
    for partition in word {
        let mut found = false;
        for (other_idx, other_partition) in other.iter().enumerate().skip(next_other_idx) {
            if partition.is_subset(other_partition) {
                next_other_idx = other_idx + 1;
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }
    }
    true
}

/// Check whether a set of canonical words is dominated by another set
///
/// Each word of `words` must be monotonically dominated by some word of
/// `other`. Used for the monotone-coverage check against ancestor nodes.
pub fn is_set_dominated(
    words: &BTreeSet<CanonicalWord>,
    other: &BTreeSet<CanonicalWord>,
) -> bool {
    words
        .iter()
        .all(|word| other.iter().any(|o| is_monotonically_dominated(word, o)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use syntra_automata::ata::AtaState;
    use syntra_automata::Clock;

    fn plant_state(location: &str, clock: &str, region_index: RegionIndex) -> AbRegionSymbol {
        AbRegionSymbol::Plant(PlantRegionState {
            location: Location::new(location),
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

    fn configuration(location: &str, clocks: &[(&str, f64)]) -> Configuration {
        Configuration {
            location: Location::new(location),
            clock_valuations: clocks
                .iter()
                .map(|(name, v)| (name.to_string(), Clock::new(*v)))
                .collect(),
        }
    }

    #[test]
    fn test_canonical_word_of_simple_state() {
        let ata_configuration = BTreeSet::from([AtaState {
            location: MtlFormula::ap("a"),
            clock_valuation: Clock::new(0.),
        }]);
        let word =
            canonical_word(&configuration("s", &[("c", 0.)]), &ata_configuration, 5).unwrap();
        assert_eq!(
            word,
            vec![BTreeSet::from([plant_state("s", "c", 0), ata_state("a", 0)])]
        );
    }

    #[test]
    fn test_canonical_word_partitions_by_fraction() {
        let ata_configuration = BTreeSet::from([
            AtaState {
                location: MtlFormula::ap("a"),
                clock_valuation: Clock::new(0.5),
            },
            AtaState {
                location: MtlFormula::ap("b"),
                clock_valuation: Clock::new(1.5),
            },
        ]);
        let word = canonical_word(
            &configuration("s", &[("c1", 0.1), ("c2", 0.5)]),
            &ata_configuration,
            3,
        )
        .unwrap();
        assert_eq!(
            word,
            vec![
                BTreeSet::from([plant_state("s", "c1", 1)]),
                BTreeSet::from([
                    plant_state("s", "c2", 1),
                    ata_state("a", 1),
                    ata_state("b", 3)
                ]),
            ]
        );
    }

    #[test]
    fn test_canonical_word_requires_clocks() {
        let result = canonical_word(&configuration("s", &[]), &BTreeSet::new(), 3);
        assert_eq!(result.unwrap_err(), CanonicalWordError::PlantWithoutClocks);
    }

    #[test]
    fn test_canonical_word_equality_means_region_equivalence() {
        // 0.3 and 0.7 lie in the same region with the same fractional
        // ordering, 0.3/0.4 versus 0.4/0.3 do not.
        let w1 = canonical_word(
            &configuration("s", &[("c1", 0.3), ("c2", 0.4)]),
            &BTreeSet::new(),
            1,
        )
        .unwrap();
        let w2 = canonical_word(
            &configuration("s", &[("c1", 0.2), ("c2", 0.7)]),
            &BTreeSet::new(),
            1,
        )
        .unwrap();
        let w3 = canonical_word(
            &configuration("s", &[("c1", 0.4), ("c2", 0.3)]),
            &BTreeSet::new(),
            1,
        )
        .unwrap();
        assert_eq!(w1, w2);
        assert_ne!(w1, w3);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            validate_canonical_word(&vec![]),
            Err(CanonicalWordError::EmptyWord)
        );
        assert_eq!(
            validate_canonical_word(&vec![BTreeSet::new()]),
            Err(CanonicalWordError::EmptyPartition)
        );
        let mixed = vec![BTreeSet::from([
            plant_state("s", "c1", 0),
            plant_state("s", "c2", 1),
        ])];
        assert!(matches!(
            validate_canonical_word(&mixed),
            Err(CanonicalWordError::MixedParity(_))
        ));
        let misplaced = vec![
            BTreeSet::from([plant_state("s", "c1", 1)]),
            BTreeSet::from([plant_state("s", "c2", 2)]),
        ];
        assert!(matches!(
            validate_canonical_word(&misplaced),
            Err(CanonicalWordError::MisplacedIntegralPartition(_))
        ));
        let valid = vec![
            BTreeSet::from([plant_state("s", "c1", 0)]),
            BTreeSet::from([plant_state("s", "c2", 1)]),
        ];
        assert_eq!(validate_canonical_word(&valid), Ok(()));
    }

    #[test]
    fn test_reg_a_strips_ata_states() {
        let word = vec![
            BTreeSet::from([plant_state("s", "c", 0), ata_state("a", 0)]),
            BTreeSet::from([ata_state("b", 1)]),
        ];
        assert_eq!(
            reg_a(&word),
            vec![BTreeSet::from([plant_state("s", "c", 0)])]
        );
    }

    #[test]
    fn test_monotone_domination() {
        let small = vec![BTreeSet::from([plant_state("s", "c", 1)])];
        let large = vec![
            BTreeSet::from([plant_state("s", "c", 1), ata_state("a", 1)]),
            BTreeSet::from([ata_state("b", 3)]),
        ];
        assert!(is_monotonically_dominated(&small, &large));
        assert!(!is_monotonically_dominated(&large, &small));
        // Matching partitions must respect the order.
        let first = vec![
            BTreeSet::from([ata_state("a", 1)]),
            BTreeSet::from([ata_state("b", 1)]),
        ];
        let swapped = vec![
            BTreeSet::from([ata_state("b", 1)]),
            BTreeSet::from([ata_state("a", 1)]),
        ];
        assert!(!is_monotonically_dominated(&first, &swapped));
    }

    #[test]
    fn test_set_domination() {
        let word = vec![BTreeSet::from([plant_state("s", "c", 1)])];
        let bigger = vec![BTreeSet::from([plant_state("s", "c", 1), ata_state("a", 1)])];
        let node = BTreeSet::from([word.clone()]);
        let ancestor = BTreeSet::from([bigger.clone()]);
        assert!(is_set_dominated(&node, &ancestor));
        assert!(!is_set_dominated(&BTreeSet::from([bigger]), &BTreeSet::from([word])));
    }

    #[test]
    fn test_display_word() {
        let word = vec![BTreeSet::from([plant_state("s", "c", 1), ata_state("s", 2)])];
        assert_eq!(display_word(&word), "[ { (s, c, 1), (s, 2) } ]");
        assert_eq!(display_word(&vec![]), "[]");
    }
}
