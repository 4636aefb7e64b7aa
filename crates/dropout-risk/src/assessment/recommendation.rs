use serde::{Deserialize, Serialize};

use super::attribution::FeatureAttribution;
use super::classification::RiskLevel;
use super::config::RulesError;
use super::encoding::Feature;
use super::profile::StudentProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Intervention suggestion tied to a triggering factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub factor: String,
    /// `None` for entries raised by the overall risk level rather than one feature.
    pub feature: Option<Feature>,
    pub impact: ImpactTier,
    pub priority: Priority,
    pub description: String,
    pub intervention: String,
    pub estimated_effectiveness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// How many of the highest-ranked features are considered.
    pub top_factors: usize,
    pub attendance_below: f64,
    pub marks_below: f64,
    pub income_below: f64,
    /// Lowest level that appends the individual counseling entry.
    pub escalate_from: RiskLevel,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            top_factors: 3,
            attendance_below: 75.0,
            marks_below: 60.0,
            income_below: 100_000.0,
            escalate_from: RiskLevel::High,
        }
    }
}

impl RecommendationConfig {
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.top_factors == 0 {
            return Err(RulesError::Invalid(
                "recommendations.top_factors must be at least 1".to_string(),
            ));
        }
        let edges = [self.attendance_below, self.marks_below, self.income_below];
        if edges.iter().any(|edge| !edge.is_finite()) {
            return Err(RulesError::Invalid(
                "recommendation trigger thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deterministic rule set over the top attributed factors.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// One entry per triggered factor, in attribution rank order, followed by
    /// the escalation entry when the level warrants it.
    pub fn recommend(
        &self,
        profile: &StudentProfile,
        level: RiskLevel,
        attribution: &FeatureAttribution,
    ) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = attribution
            .top(self.config.top_factors)
            .iter()
            .filter_map(|entry| self.factor_rule(profile, entry.feature))
            .collect();

        if level >= self.config.escalate_from {
            recommendations.push(Recommendation {
                factor: "Overall Risk Level".to_string(),
                feature: None,
                impact: ImpactTier::High,
                priority: Priority::Critical,
                description: format!(
                    "{} dropout risk calls for immediate, coordinated follow-up",
                    level.label()
                ),
                intervention: "Schedule individual counseling session".to_string(),
                estimated_effectiveness: 0.85,
            });
        }

        recommendations
    }

    fn factor_rule(&self, profile: &StudentProfile, feature: Feature) -> Option<Recommendation> {
        let config = &self.config;
        let entry = |factor: &str,
                     impact: ImpactTier,
                     priority: Priority,
                     description: String,
                     intervention: &str,
                     estimated_effectiveness: f64| Recommendation {
            factor: factor.to_string(),
            feature: Some(feature),
            impact,
            priority,
            description,
            intervention: intervention.to_string(),
            estimated_effectiveness,
        };

        match feature {
            Feature::AvgAttendanceLatestTerm if profile.attendance < config.attendance_below => {
                Some(entry(
                    "Attendance Rate",
                    ImpactTier::High,
                    Priority::High,
                    format!(
                        "Low attendance rate ({:.1}%) significantly increases dropout risk",
                        profile.attendance
                    ),
                    "Implement attendance monitoring and family communication",
                    0.8,
                ))
            }
            Feature::AvgMarksLatestTerm if profile.latest_marks < config.marks_below => {
                Some(entry(
                    "Academic Performance",
                    ImpactTier::High,
                    Priority::High,
                    format!(
                        "Below-average performance ({:.1}%) indicates learning difficulties",
                        profile.latest_marks
                    ),
                    "Provide additional academic support and tutoring",
                    0.75,
                ))
            }
            Feature::IsFirstGenerationLearner if profile.first_generation => Some(entry(
                "First Generation Learner",
                ImpactTier::Medium,
                Priority::Medium,
                "Lack of family educational background increases risk".to_string(),
                "Provide additional guidance and mentorship programs",
                0.7,
            )),
            Feature::WorksPartTime if profile.works_part_time => Some(entry(
                "Part-time Employment",
                ImpactTier::Medium,
                Priority::Medium,
                "Working part-time may impact academic focus".to_string(),
                "Assess financial needs and provide support",
                0.65,
            )),
            Feature::FamilyAnnualIncome if profile.family_income < config.income_below => {
                Some(entry(
                    "Financial Stability",
                    ImpactTier::Medium,
                    Priority::Medium,
                    format!(
                        "Family income ({:.0}) may limit access to study resources",
                        profile.family_income
                    ),
                    "Connect the family with scholarship and fee-waiver programs",
                    0.6,
                ))
            }
            _ => None,
        }
    }
}
