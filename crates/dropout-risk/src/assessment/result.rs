use chrono::{DateTime, Utc};
use serde::Serialize;

use super::attribution::FeatureAttribution;
use super::classification::RiskLevel;
use super::recommendation::Recommendation;
use super::scoring::Strategy;

/// Which strategy produced the score and which produced the attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub scoring: Strategy,
    pub attribution: Strategy,
}

impl Provenance {
    pub fn is_fallback(&self) -> bool {
        self.scoring == Strategy::Heuristic || self.attribution == Strategy::Heuristic
    }
}

/// Complete assessment of one student. Built once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub student_id: String,
    pub dropout_probability: f64,
    pub dropout_prediction: bool,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    /// Point total of the heuristic scorer, absent for model scores.
    pub heuristic_points: Option<u32>,
    pub feature_importance: FeatureAttribution,
    pub recommendations: Vec<Recommendation>,
    pub model_version: String,
    pub data_source: Provenance,
    pub shap_available: bool,
    pub attendance: f64,
    pub performance: f64,
    pub prediction_timestamp: DateTime<Utc>,
}

/// Slots the conversational layer fills its canned replies from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversationSlots {
    pub risk_level: RiskLevel,
    pub attendance: f64,
    pub performance: f64,
}

impl PredictionResult {
    pub fn conversation_slots(&self) -> ConversationSlots {
        ConversationSlots {
            risk_level: self.risk_level,
            attendance: self.attendance,
            performance: self.performance,
        }
    }
}

/// Outcome for one item of an untyped batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Scored(Box<PredictionResult>),
    Rejected { index: usize, error: String },
}

impl BatchEntry {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            BatchEntry::Scored(result) => Some(&**result),
            BatchEntry::Rejected { .. } => None,
        }
    }
}
