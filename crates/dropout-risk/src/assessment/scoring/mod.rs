//! Two interchangeable scoring strategies behind [`RiskScorer`].

mod config;
mod policy;
mod rules;

pub use config::{
    AcademicRiskPoints, BandedPoints, PointBand, ProbabilityMapping, ScoringConfig,
    SocioeconomicPoints, TechnologyPoints,
};
pub use rules::{PointBreakdown, PointCategory, PointComponent};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::encoding::EncodedFeatureVector;
use super::model::{ModelError, RiskModel};
use super::profile::StudentProfile;
use policy::{points_to_probability, scaled_score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Model,
    Heuristic,
}

impl Strategy {
    pub const fn label(self) -> &'static str {
        match self {
            Strategy::Model => "model",
            Strategy::Heuristic => "heuristic",
        }
    }
}

/// Probability of dropout with its integer rendering and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub probability: f64,
    /// `round(probability * 100)`.
    pub risk_score: u8,
    pub strategy: Strategy,
    /// Present only for heuristic scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PointBreakdown>,
}

impl RiskScore {
    pub fn from_probability(probability: f64, strategy: Strategy) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            probability,
            risk_score: scaled_score(probability),
            strategy,
            breakdown: None,
        }
    }

    pub fn heuristic_points(&self) -> Option<u32> {
        self.breakdown.as_ref().map(|breakdown| breakdown.total)
    }

    /// Value the risk bands are applied to: the point total on the unit
    /// scale for heuristic scores, the probability otherwise.
    pub fn severity(&self) -> f64 {
        match self.heuristic_points() {
            Some(points) => f64::from(points) / 100.0,
            None => self.probability,
        }
    }
}

/// Both views of a student a scorer may consult.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub profile: &'a StudentProfile,
    pub features: &'a EncodedFeatureVector,
}

pub trait RiskScorer: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn score(&self, input: ScoringInput<'_>) -> Result<RiskScore, ModelError>;
}

/// Deterministic point accumulation over the raw profile. Never fails.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    config: ScoringConfig,
}

impl HeuristicScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn assess(&self, profile: &StudentProfile) -> RiskScore {
        let breakdown = rules::score_profile(profile, &self.config);
        let probability = points_to_probability(breakdown.total, profile, &self.config.probability);
        RiskScore {
            breakdown: Some(breakdown),
            ..RiskScore::from_probability(probability, Strategy::Heuristic)
        }
    }
}

impl RiskScorer for HeuristicScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Heuristic
    }

    fn score(&self, input: ScoringInput<'_>) -> Result<RiskScore, ModelError> {
        Ok(self.assess(input.profile))
    }
}

/// Delegates to a trained classifier's positive-class probability.
#[derive(Clone)]
pub struct ModelScorer {
    model: Arc<dyn RiskModel>,
}

impl ModelScorer {
    pub fn new(model: Arc<dyn RiskModel>) -> Self {
        Self { model }
    }
}

impl RiskScorer for ModelScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Model
    }

    fn score(&self, input: ScoringInput<'_>) -> Result<RiskScore, ModelError> {
        let probability = self.model.predict_proba(input.features.as_slice())?;
        if !probability.is_finite() {
            return Err(ModelError::NonFiniteOutput);
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::ProbabilityOutOfRange(probability));
        }
        Ok(RiskScore::from_probability(probability, Strategy::Model))
    }
}
