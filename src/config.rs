//! Engine configuration
//!
//! The whole configuration surface of the core: supplied once at
//! construction, never mutated mid-run. The engine is a pure function
//! of (records, field spec, config).

use serde::{Deserialize, Serialize};

/// How the combinatorial search treats the field list.
///
/// One code path serves both modes; the mode only decides whether a
/// fixed primary pair (age bracket x income bracket) partitions the
/// population before subsets of the remaining fields are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    /// Search subsets over the full field list (canonical default).
    Unstratified,
    /// Partition by age bracket x income bracket first, then search
    /// subsets of the remaining fields within each stratum.
    Stratified,
}

/// Ranking key for time-slot patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankPolicy {
    /// Success probability, then confidence, descending (default).
    SuccessConfidence,
    /// Raw pickup rate, then duration, descending.
    RawPerformance,
}

/// Static configuration consumed by the clustering core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum member count for a qualifying cluster.
    pub min_cluster_size: usize,

    /// Maximum pickup-rate gap (percentage points) between adjacent
    /// hours merged into one time slot.
    pub pickup_threshold: f32,

    /// Maximum call-duration gap (seconds) between adjacent hours
    /// merged into one time slot.
    pub duration_threshold: f32,

    /// Minimum sample count for an hour to enter segmentation.
    pub min_samples: usize,

    /// Grouping mode for the combinatorial search.
    pub grouping: GroupingMode,

    /// Ranking key for best-time selection.
    pub rank: RankPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 6000,
            pickup_threshold: 3.0,
            duration_threshold: 30.0,
            min_samples: 50,
            grouping: GroupingMode::Unstratified,
            rank: RankPolicy::SuccessConfidence,
        }
    }
}

impl EngineConfig {
    /// Validate configuration before a run starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_cluster_size == 0 {
            return Err("min_cluster_size must be >= 1".to_string());
        }

        if self.min_samples == 0 {
            return Err("min_samples must be >= 1".to_string());
        }

        if !self.pickup_threshold.is_finite() || self.pickup_threshold < 0.0 {
            return Err(format!(
                "pickup_threshold must be non-negative, got {}",
                self.pickup_threshold
            ));
        }

        if !self.duration_threshold.is_finite() || self.duration_threshold < 0.0 {
            return Err(format!(
                "duration_threshold must be non-negative, got {}",
                self.duration_threshold
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.min_cluster_size, 6000);
        assert_eq!(config.pickup_threshold, 3.0);
        assert_eq!(config.duration_threshold, 30.0);
        assert_eq!(config.min_samples, 50);
        assert_eq!(config.grouping, GroupingMode::Unstratified);
        assert_eq!(config.rank, RankPolicy::SuccessConfidence);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_min_cluster_size() {
        let config = EngineConfig {
            min_cluster_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_pickup_threshold() {
        let config = EngineConfig {
            pickup_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_min_samples() {
        let config = EngineConfig {
            min_samples: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = EngineConfig {
            grouping: GroupingMode::Stratified,
            rank: RankPolicy::RawPerformance,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let back: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
