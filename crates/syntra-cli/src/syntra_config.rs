//! Configuration file and environment settings for the CLI.
//!
//! Settings can come from an optional configuration file and from
//! `SYNTRA_`-prefixed environment variables; command line flags take
//! precedence.

use serde::Deserialize;

/// Tool configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyntraConfig {
    /// Weighted heuristics, e.g. `["time=16", "prefer-environment=4"]`
    #[serde(default)]
    pub heuristics: Vec<String>,
    /// Seed for the random tiebreak heuristic
    #[serde(default)]
    pub seed: Option<u64>,
}
