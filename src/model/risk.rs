//! Risk assessment models

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// Upper bounds (exclusive) of the LOW, MEDIUM and HIGH bands; anything above is CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.25,
            medium: 0.5,
            high: 0.75,
        }
    }
}

impl RiskThresholds {
    /// Thresholds must be strictly ascending inside (0, 1)
    pub fn is_valid(&self) -> bool {
        0.0 < self.low && self.low < self.medium && self.medium < self.high && self.high < 1.0
    }

    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score < self.low {
            RiskLevel::Low
        } else if score < self.medium {
            RiskLevel::Medium
        } else if score < self.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Centre of the MEDIUM band
    pub fn medium_midpoint(&self) -> f64 {
        (self.low + self.medium) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskAssessment {
    /// Within [0, 1]
    pub score: f64,
    pub level: RiskLevel,
    pub rationale: Vec<String>,
    /// Scoring algorithm identifier, e.g. `weighted-v1`
    pub algorithm: String,
    pub thresholds: RiskThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_levels() {
        let t = RiskThresholds::default();
        assert_eq!(t.level_for(0.0), RiskLevel::Low);
        assert_eq!(t.level_for(0.2499), RiskLevel::Low);
        assert_eq!(t.level_for(0.25), RiskLevel::Medium);
        assert_eq!(t.level_for(0.5), RiskLevel::High);
        assert_eq!(t.level_for(0.75), RiskLevel::Critical);
        assert_eq!(t.level_for(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_threshold_validation() {
        let thresholds = |low, medium, high| RiskThresholds { low, medium, high };

        assert!(RiskThresholds::default().is_valid());
        assert!(!thresholds(0.5, 0.4, 0.9).is_valid());
        assert!(!thresholds(0.0, 0.4, 0.9).is_valid());
        assert!(!thresholds(0.2, 0.4, 1.0).is_valid());
    }

    #[test]
    fn test_medium_midpoint_is_medium() {
        let t = RiskThresholds::default();
        assert_eq!(t.level_for(t.medium_midpoint()), RiskLevel::Medium);
    }
}
