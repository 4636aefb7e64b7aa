use serde::{Deserialize, Serialize};

use super::config::RulesError;
use super::scoring::RiskScore;

/// Ordinal dropout risk band, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub const fn is_at_risk(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Lower edges of each band on the probability scale, inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    /// Probability above which a student is predicted to drop out.
    pub decision_boundary: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 0.8,
            high: 0.6,
            medium: 0.4,
            decision_boundary: 0.5,
        }
    }
}

impl RiskThresholds {
    /// Bands ordered from most to least severe.
    pub fn bands(&self) -> [(f64, RiskLevel); 3] {
        [
            (self.critical, RiskLevel::Critical),
            (self.high, RiskLevel::High),
            (self.medium, RiskLevel::Medium),
        ]
    }

    pub fn classify(&self, probability: f64) -> RiskLevel {
        self.bands()
            .into_iter()
            .find(|(lower, _)| probability >= *lower)
            .map(|(_, level)| level)
            .unwrap_or(RiskLevel::Low)
    }

    /// Same table applied to the 0..=100 score scale.
    pub fn classify_score(&self, score: u32) -> RiskLevel {
        self.classify(f64::from(score) / 100.0)
    }

    pub fn predicts_dropout(&self, probability: f64) -> bool {
        probability > self.decision_boundary
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        let edges = [
            ("critical", self.critical),
            ("high", self.high),
            ("medium", self.medium),
            ("decision_boundary", self.decision_boundary),
        ];
        if let Some((name, value)) = edges
            .iter()
            .find(|(_, value)| !(0.0..=1.0).contains(value))
        {
            return Err(RulesError::Invalid(format!(
                "threshold {name} = {value} must lie within [0, 1]"
            )));
        }
        if !(self.medium <= self.high && self.high <= self.critical) {
            return Err(RulesError::Invalid(format!(
                "thresholds must be ordered medium <= high <= critical (got {} / {} / {})",
                self.medium, self.high, self.critical
            )));
        }
        Ok(())
    }
}

/// Table-driven mapping from a [`RiskScore`] to its [`RiskLevel`].
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn classify(&self, score: &RiskScore) -> RiskLevel {
        self.thresholds.classify(score.severity())
    }
}
