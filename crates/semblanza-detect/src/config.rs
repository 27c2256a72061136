//! Configuration for the detector layer

use semblanza_domain::TierTable;
use serde::{Deserialize, Serialize};

/// Tunable constants shared by the detector strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Calibrated confidence per assignment tier
    pub tiers: TierTable,

    /// Bytes inspected on each side of a surface match for metaphor
    /// indicators
    pub metaphor_window: usize,

    /// Bytes inspected before a surface match for negation indicators
    pub negation_window: usize,

    /// Minimum cosine similarity for an embedding-prototype match
    pub similarity_cutoff: f32,

    /// Ceiling for embedding-derived confidence; semantic hits never
    /// outrank explicit syntax
    pub semantic_confidence_cap: f64,
}

impl DetectorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.tiers.validate()?;
        if self.metaphor_window == 0 {
            return Err("metaphor_window must be greater than 0".to_string());
        }
        if self.negation_window == 0 {
            return Err("negation_window must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.similarity_cutoff) {
            return Err("similarity_cutoff must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.semantic_confidence_cap) {
            return Err("semantic_confidence_cap must be in [0, 1]".to_string());
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            metaphor_window: 40,
            negation_window: 30,
            similarity_cutoff: 0.75,
            semantic_confidence_cap: 0.85,
        }
    }
}
