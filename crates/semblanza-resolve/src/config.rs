//! Configuration for the resolution pipeline
//!
//! Every calibration tunable lives here: tier
//! confidences (via the detector config), voting weights, the
//! method-precision table, assignment thresholds, and arbitration limits.
//! All of it is plain data with TOML round-tripping; nothing is derived
//! at runtime.

use semblanza_detect::DetectorConfig;
use semblanza_domain::DetectionMethod;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Voting weight per detection method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodWeights {
    /// Weight of surface-pattern evidence
    pub pattern: f64,

    /// Weight of syntactic evidence
    pub dependency: f64,

    /// Weight of semantic-similarity evidence
    pub embedding: f64,
}

impl MethodWeights {
    /// Weight for a method
    pub fn weight(&self, method: DetectionMethod) -> f64 {
        match method {
            DetectionMethod::Pattern => self.pattern,
            DetectionMethod::Dependency => self.dependency,
            DetectionMethod::Embedding => self.embedding,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (name, w) in [
            ("pattern", self.pattern),
            ("dependency", self.dependency),
            ("embedding", self.embedding),
        ] {
            if w <= 0.0 {
                return Err(format!("weight {} must be positive, got {}", name, w));
            }
        }
        Ok(())
    }
}

impl Default for MethodWeights {
    fn default() -> Self {
        Self {
            pattern: 0.15,
            dependency: 0.20,
            embedding: 0.25,
        }
    }
}

/// Historical precision per detection method, used by the conflict
/// fallback when no arbiter is available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodPrecision {
    /// Observed precision of the pattern detector
    pub pattern: f64,

    /// Observed precision of the dependency detector
    pub dependency: f64,

    /// Observed precision of the embedding detector
    pub embedding: f64,
}

impl MethodPrecision {
    /// Precision for a method
    pub fn precision(&self, method: DetectionMethod) -> f64 {
        match method {
            DetectionMethod::Pattern => self.pattern,
            DetectionMethod::Dependency => self.dependency,
            DetectionMethod::Embedding => self.embedding,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (name, p) in [
            ("pattern", self.pattern),
            ("dependency", self.dependency),
            ("embedding", self.embedding),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("precision {} must be in [0, 1], got {}", name, p));
            }
        }
        Ok(())
    }
}

impl Default for MethodPrecision {
    fn default() -> Self {
        Self {
            pattern: 0.80,
            dependency: 0.85,
            embedding: 0.70,
        }
    }
}

/// Configuration for the whole resolution pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Detector-layer constants (tiers, windows, similarity cutoff)
    pub detect: DetectorConfig,

    /// Voting weights per method
    pub weights: MethodWeights,

    /// Method-precision table for the conflict fallback
    pub precision: MethodPrecision,

    /// Maximum same-sentence distance (bytes) for a strong proximity
    /// assignment
    pub proximity_distance: usize,

    /// Confidence ceiling for assignments that cross a sentence boundary
    pub cross_sentence_cap: f64,

    /// Resolved attributes below this confidence are discarded
    pub min_confidence: f64,

    /// Relative consensus boost applied to unanimous groups
    pub unanimous_boost: f64,

    /// Absolute ceiling for boosted unanimous confidence
    pub unanimous_cap: f64,

    /// Consensus penalty applied to majority resolutions
    pub majority_penalty: f64,

    /// Penalty applied by the precision fallback
    pub fallback_penalty: f64,

    /// Confidence for arbiter decisions matching a candidate value
    pub arbiter_confidence: f64,

    /// Confidence for arbiter decisions introducing a novel value
    pub arbiter_novel_confidence: f64,

    /// Maximum conflicts described in one arbiter call
    pub max_arbitrated_conflicts: usize,

    /// Timeout for the single arbiter call (seconds)
    pub arbiter_timeout_secs: u64,
}

impl ResolverConfig {
    /// Get the arbiter timeout as a Duration
    pub fn arbiter_timeout(&self) -> Duration {
        Duration::from_secs(self.arbiter_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.detect.validate()?;
        self.weights.validate()?;
        self.precision.validate()?;
        if self.proximity_distance == 0 {
            return Err("proximity_distance must be greater than 0".to_string());
        }
        for (name, value) in [
            ("cross_sentence_cap", self.cross_sentence_cap),
            ("min_confidence", self.min_confidence),
            ("unanimous_cap", self.unanimous_cap),
            ("majority_penalty", self.majority_penalty),
            ("fallback_penalty", self.fallback_penalty),
            ("arbiter_confidence", self.arbiter_confidence),
            ("arbiter_novel_confidence", self.arbiter_novel_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }
        if self.unanimous_boost < 0.0 {
            return Err("unanimous_boost must not be negative".to_string());
        }
        if self.max_arbitrated_conflicts == 0 {
            return Err("max_arbitrated_conflicts must be greater than 0".to_string());
        }
        if self.arbiter_timeout_secs == 0 {
            return Err("arbiter_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            detect: DetectorConfig::default(),
            weights: MethodWeights::default(),
            precision: MethodPrecision::default(),
            proximity_distance: 120,
            cross_sentence_cap: 0.45,
            min_confidence: 0.30,
            unanimous_boost: 0.10,
            unanimous_cap: 0.98,
            majority_penalty: 0.90,
            fallback_penalty: 0.85,
            arbiter_confidence: 0.95,
            arbiter_novel_confidence: 0.88,
            max_arbitrated_conflicts: 8,
            arbiter_timeout_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let mut config = ResolverConfig::default();
        config.weights.dependency = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_cap_rejected() {
        let mut config = ResolverConfig::default();
        config.cross_sentence_cap = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_arbiter_budget_rejected() {
        let mut config = ResolverConfig::default();
        config.max_arbitrated_conflicts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ResolverConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = ResolverConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.weights, parsed.weights);
        assert_eq!(config.precision, parsed.precision);
        assert_eq!(config.proximity_distance, parsed.proximity_distance);
        assert_eq!(config.max_arbitrated_conflicts, parsed.max_arbitrated_conflicts);
    }

    #[test]
    fn test_tier_constants_survive_toml() {
        let config = ResolverConfig::default();
        let parsed = ResolverConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.detect.tiers.syntactic_tacit, 0.78);
        assert_eq!(parsed.detect.tiers.llm_verified, 0.95);
    }
}
