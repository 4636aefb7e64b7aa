//! Student dropout risk assessment.
//!
//! A raw record is decoded into a [`StudentProfile`], encoded into the fixed
//! feature schema, scored (trained model first, heuristic points otherwise),
//! explained (exact tree attributions first, heuristic weights otherwise),
//! classified into a [`RiskLevel`] and turned into intervention
//! [`Recommendation`]s. [`RiskAssessmentService`] composes the steps and never
//! fails for a decodable record.

pub mod attribution;
pub mod classification;
pub mod config;
pub mod encoding;
pub mod import;
pub mod insights;
pub mod model;
pub mod profile;
pub mod recommendation;
pub mod result;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use attribution::{
    AttributionWeights, Attributor, ExactAttributor, FeatureAttribution, FeatureWeight,
    FlagWeight, HeuristicAttributor,
};
pub use classification::{RiskClassifier, RiskLevel, RiskThresholds};
pub use config::{AssessmentConfig, RulesError};
pub use encoding::{EncodedFeatureVector, Feature, FeatureEncoder, FEATURE_COUNT};
pub use import::{ImportError, ImportedProfiles, ProfileImporter, RejectedRow};
pub use insights::{CohortInsights, RiskDistribution};
pub use model::{DecisionForest, DecisionTree, ModelError, ModelHandle, ModelInfo, RiskModel, TreeNode};
pub use profile::{
    AccommodationType, AdmissionQuota, EducationLevel, Gender, ProfileError, RawStudentRecord,
    StudentProfile, UNKNOWN_STUDENT_ID,
};
pub use recommendation::{
    ImpactTier, Priority, Recommendation, RecommendationConfig, RecommendationEngine,
};
pub use result::{BatchEntry, ConversationSlots, PredictionResult, Provenance};
pub use router::assessment_router;
pub use scoring::{
    HeuristicScorer, ModelScorer, PointBreakdown, PointCategory, RiskScore, RiskScorer,
    ScoringConfig, ScoringInput, Strategy,
};
pub use service::{AssessmentError, RiskAssessmentService};
