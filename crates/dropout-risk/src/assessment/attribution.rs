use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::config::RulesError;
use super::encoding::{Feature, FEATURE_COUNT};
use super::model::{ModelError, RiskModel};
use super::scoring::{ScoringInput, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub feature: Feature,
    pub weight: f64,
}

/// Feature importances sorted by descending magnitude. Every schema feature
/// is present exactly once; ties keep schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAttribution {
    strategy: Strategy,
    entries: Vec<FeatureWeight>,
}

impl FeatureAttribution {
    /// Builds a ranking from signed raw values. Magnitudes are taken, non-finite
    /// values count as zero, and features absent from `raw` get zero weight.
    pub fn ranked(strategy: Strategy, raw: impl IntoIterator<Item = (Feature, f64)>) -> Self {
        let mut weights = [0.0; FEATURE_COUNT];
        for (feature, value) in raw {
            weights[feature.index()] = if value.is_finite() { value.abs() } else { 0.0 };
        }

        let mut entries: Vec<FeatureWeight> = Feature::ALL
            .iter()
            .map(|feature| FeatureWeight {
                feature: *feature,
                weight: weights[feature.index()],
            })
            .collect();
        entries.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        Self { strategy, entries }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn entries(&self) -> &[FeatureWeight] {
        &self.entries
    }

    pub fn top(&self, count: usize) -> &[FeatureWeight] {
        &self.entries[..count.min(self.entries.len())]
    }

    pub fn weight(&self, feature: Feature) -> f64 {
        self.entries
            .iter()
            .find(|entry| entry.feature == feature)
            .map(|entry| entry.weight)
            .unwrap_or(0.0)
    }

    pub fn rank_of(&self, feature: Feature) -> Option<usize> {
        self.entries.iter().position(|entry| entry.feature == feature)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }
}

impl Serialize for FeatureAttribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.feature.name(), &entry.weight)?;
        }
        map.end()
    }
}

pub trait Attributor: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn explain(&self, input: ScoringInput<'_>) -> Result<FeatureAttribution, ModelError>;
}

/// Weight applied when a boolean factor is set or unset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlagWeight {
    pub when_true: f64,
    pub when_false: f64,
}

impl FlagWeight {
    pub const fn new(when_true: f64, when_false: f64) -> Self {
        Self {
            when_true,
            when_false,
        }
    }

    fn pick(self, flag: bool) -> f64 {
        if flag {
            self.when_true
        } else {
            self.when_false
        }
    }
}

/// Heuristic importance weights. Features without a rule receive `baseline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionWeights {
    pub attendance_deficit: f64,
    pub performance_deficit: f64,
    pub first_generation: FlagWeight,
    pub part_time_work: FlagWeight,
    pub medium_changed: FlagWeight,
    pub income_shortfall: f64,
    pub income_reference: f64,
    pub baseline: f64,
}

impl Default for AttributionWeights {
    fn default() -> Self {
        Self {
            attendance_deficit: 0.30,
            performance_deficit: 0.25,
            first_generation: FlagWeight::new(0.20, 0.05),
            part_time_work: FlagWeight::new(0.15, 0.02),
            medium_changed: FlagWeight::new(0.15, 0.02),
            income_shortfall: 0.10,
            income_reference: 100_000.0,
            baseline: 0.05,
        }
    }
}

impl AttributionWeights {
    pub fn validate(&self) -> Result<(), RulesError> {
        let weights = [
            ("attendance_deficit", self.attendance_deficit),
            ("performance_deficit", self.performance_deficit),
            ("first_generation.when_true", self.first_generation.when_true),
            ("first_generation.when_false", self.first_generation.when_false),
            ("part_time_work.when_true", self.part_time_work.when_true),
            ("part_time_work.when_false", self.part_time_work.when_false),
            ("medium_changed.when_true", self.medium_changed.when_true),
            ("medium_changed.when_false", self.medium_changed.when_false),
            ("income_shortfall", self.income_shortfall),
            ("baseline", self.baseline),
        ];
        if let Some((name, value)) = weights
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(RulesError::Invalid(format!(
                "attribution.{name} = {value} must be finite and non-negative"
            )));
        }
        if !self.income_reference.is_finite() || self.income_reference <= 0.0 {
            return Err(RulesError::Invalid(format!(
                "attribution.income_reference {} must be positive",
                self.income_reference
            )));
        }
        Ok(())
    }
}

/// Input-dependent fixed weights over the raw profile. Never fails.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAttributor {
    weights: AttributionWeights,
}

impl HeuristicAttributor {
    pub fn new(weights: AttributionWeights) -> Self {
        Self { weights }
    }

    pub fn attribute(&self, input: ScoringInput<'_>) -> FeatureAttribution {
        let profile = input.profile;
        let weights = &self.weights;
        let deficit = |value: f64| ((100.0 - value) / 100.0).clamp(0.0, 1.0);
        let shortfall =
            ((weights.income_reference - profile.family_income) / weights.income_reference).max(0.0);

        let raw: Vec<(Feature, f64)> = Feature::ALL
            .iter()
            .map(|feature| {
                let weight = match feature {
                    Feature::AvgAttendanceLatestTerm => {
                        weights.attendance_deficit * deficit(profile.attendance)
                    }
                    Feature::AvgMarksLatestTerm => {
                        weights.performance_deficit * deficit(profile.latest_marks)
                    }
                    Feature::IsFirstGenerationLearner => {
                        weights.first_generation.pick(profile.first_generation)
                    }
                    Feature::WorksPartTime => weights.part_time_work.pick(profile.works_part_time),
                    Feature::MediumChanged => weights.medium_changed.pick(profile.medium_changed),
                    Feature::FamilyAnnualIncome => weights.income_shortfall * shortfall,
                    _ => weights.baseline,
                };
                (*feature, weight)
            })
            .collect();

        // Weights over the full feature set sum to at most 1.
        let total: f64 = raw.iter().map(|(_, weight)| weight).sum();
        let scale = if total > 1.0 { total.recip() } else { 1.0 };

        FeatureAttribution::ranked(
            Strategy::Heuristic,
            raw.into_iter()
                .map(|(feature, weight)| (feature, weight * scale)),
        )
    }
}

impl Attributor for HeuristicAttributor {
    fn strategy(&self) -> Strategy {
        Strategy::Heuristic
    }

    fn explain(&self, input: ScoringInput<'_>) -> Result<FeatureAttribution, ModelError> {
        Ok(self.attribute(input))
    }
}

/// Signed per-feature contributions from the trained model, ranked by magnitude.
#[derive(Clone)]
pub struct ExactAttributor {
    model: Arc<dyn RiskModel>,
}

impl ExactAttributor {
    pub fn new(model: Arc<dyn RiskModel>) -> Self {
        Self { model }
    }
}

impl Attributor for ExactAttributor {
    fn strategy(&self) -> Strategy {
        Strategy::Model
    }

    fn explain(&self, input: ScoringInput<'_>) -> Result<FeatureAttribution, ModelError> {
        let contributions = self.model.contributions(input.features.as_slice())?;
        if contributions.len() != FEATURE_COUNT {
            return Err(ModelError::FeatureCountMismatch {
                expected: FEATURE_COUNT,
                actual: contributions.len(),
            });
        }
        if contributions.iter().any(|value| !value.is_finite()) {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(FeatureAttribution::ranked(
            Strategy::Model,
            Feature::ALL.into_iter().zip(contributions),
        ))
    }
}
