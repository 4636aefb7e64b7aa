use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::assessment::model::{DecisionForest, DecisionTree, ModelError, RiskModel, TreeNode};
use crate::assessment::{
    AssessmentConfig, Feature, ModelHandle, RiskAssessmentService, StudentProfile, FEATURE_COUNT,
};

/// High-risk student: poor attendance and marks plus most socioeconomic flags.
pub(super) fn struggling_student() -> StudentProfile {
    StudentProfile {
        student_id: "STU-001".to_string(),
        attendance: 55.0,
        latest_marks: 35.0,
        is_rural: true,
        first_generation: true,
        family_income: 40_000.0,
        siblings: 4,
        works_part_time: true,
        failure_rate: 0.4,
        has_laptop: false,
        has_reliable_internet: false,
        ..StudentProfile::default()
    }
}

/// Low-risk student: strong record and full access to study resources.
pub(super) fn thriving_student() -> StudentProfile {
    StudentProfile {
        student_id: "STU-002".to_string(),
        attendance: 92.0,
        latest_marks: 88.0,
        is_rural: false,
        first_generation: false,
        family_income: 200_000.0,
        siblings: 1,
        works_part_time: false,
        failure_rate: 0.0,
        has_laptop: true,
        has_reliable_internet: true,
        ..StudentProfile::default()
    }
}

fn leaf(value: f64, cover: f64) -> TreeNode {
    TreeNode::Leaf { value, cover }
}

fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> TreeNode {
    TreeNode::Split {
        feature,
        threshold,
        left,
        right,
        cover,
    }
}

/// Two-tree forest over attendance (column 0) and latest marks (column 1).
///
/// Struggling student: (0.875 + 0.75) / 2 = 0.8125.
/// Thriving student: (0.125 + 0.25) / 2 = 0.1875.
/// Expected value: (0.375 + 0.4) / 2 = 0.3875.
pub(super) fn attendance_forest(version: &str) -> DecisionForest {
    let first = DecisionTree {
        nodes: vec![
            split(0, 65.0, 1, 2, 100.0),
            split(1, 40.0, 3, 4, 40.0),
            leaf(0.125, 60.0),
            leaf(0.875, 20.0),
            leaf(0.625, 20.0),
        ],
    };
    let second = DecisionTree {
        nodes: vec![split(1, 50.0, 1, 2, 100.0), leaf(0.75, 30.0), leaf(0.25, 70.0)],
    };

    DecisionForest::new(
        version,
        vec![Feature::AvgAttendanceLatestTerm, Feature::AvgMarksLatestTerm],
        vec![first, second],
    )
    .expect("fixture forest is valid")
}

pub(super) const FOREST_JSON: &str = r#"{
    "version": "rf-disk-2",
    "kind": "RandomForestClassifier",
    "feature_names": ["AvgMarks_LatestTerm"],
    "trees": [{
        "nodes": [
            {"kind": "split", "feature": 0, "threshold": 50.0, "left": 1, "right": 2, "cover": 10.0},
            {"kind": "leaf", "value": 0.75, "cover": 4.0},
            {"kind": "leaf", "value": 0.25, "cover": 6.0}
        ]
    }]
}"#;

/// Model whose inference always fails.
pub(super) struct FailingModel;

impl RiskModel for FailingModel {
    fn version(&self) -> &str {
        "broken-1"
    }

    fn kind(&self) -> &str {
        "FailingModel"
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<f64, ModelError> {
        Err(ModelError::FeatureCountMismatch {
            expected: FEATURE_COUNT + 1,
            actual: FEATURE_COUNT,
        })
    }
}

/// Model that scores but cannot explain itself.
pub(super) struct OpaqueModel(pub(super) f64);

impl RiskModel for OpaqueModel {
    fn version(&self) -> &str {
        "opaque-3"
    }

    fn kind(&self) -> &str {
        "OpaqueModel"
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<f64, ModelError> {
        Ok(self.0)
    }
}

/// Model advertising contributions but returning the wrong shape.
pub(super) struct MisshapenExplainer;

impl RiskModel for MisshapenExplainer {
    fn version(&self) -> &str {
        "misshapen-1"
    }

    fn kind(&self) -> &str {
        "MisshapenExplainer"
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<f64, ModelError> {
        Ok(0.42)
    }

    fn contributions(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
        Ok(vec![0.1; 3])
    }

    fn supports_contributions(&self) -> bool {
        true
    }
}

pub(super) fn build_service(model: Option<Arc<dyn RiskModel>>) -> RiskAssessmentService {
    let handle = match model {
        Some(model) => ModelHandle::with_model(model),
        None => ModelHandle::empty(),
    };
    RiskAssessmentService::new(AssessmentConfig::default(), handle)
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("valid json")
}
