use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attribution::AttributionWeights;
use super::classification::RiskThresholds;
use super::recommendation::RecommendationConfig;
use super::scoring::ScoringConfig;

/// Every tunable table of the assessment pipeline. Missing sections fall back
/// to the reference tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub thresholds: RiskThresholds,
    pub scoring: ScoringConfig,
    pub attribution: AttributionWeights,
    pub recommendations: RecommendationConfig,
}

impl AssessmentConfig {
    pub fn from_json(raw: &str) -> Result<Self, RulesError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(RulesError::Invalid(
                "assessment rules must be a JSON object".to_string(),
            ));
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        self.thresholds.validate()?;
        self.scoring.validate()?;
        self.attribution.validate()?;
        self.recommendations.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid assessment rules: {0}")]
    Invalid(String),
    #[error("failed to parse assessment rules: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read assessment rules {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::classification::RiskLevel;

    #[test]
    fn partial_documents_keep_reference_tables() {
        let config = AssessmentConfig::from_json(
            r#"{"thresholds": {"critical": 0.7}, "recommendations": {"escalate_from": "Critical"}}"#,
        )
        .expect("valid rules");

        assert_eq!(config.thresholds.critical, 0.7);
        assert_eq!(config.thresholds.high, 0.6);
        assert_eq!(config.recommendations.escalate_from, RiskLevel::Critical);
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let error = AssessmentConfig::from_json(r#"{"thresholds": {"medium": 0.9}}"#)
            .expect_err("unordered thresholds");
        assert!(matches!(error, RulesError::Invalid(_)));

        let error = AssessmentConfig::from_json(r#"{"attribution": {"baseline": -0.1}}"#)
            .expect_err("negative weight");
        assert!(error.to_string().contains("baseline"));

        assert!(matches!(
            AssessmentConfig::from_json("[]"),
            Err(RulesError::Invalid(_))
        ));
        assert!(matches!(
            AssessmentConfig::from_json("[{}]"),
            Err(RulesError::Invalid(_))
        ));
        assert!(matches!(
            AssessmentConfig::from_json(r#"[{"critical": 0.9}]"#),
            Err(RulesError::Invalid(_))
        ));
        assert!(matches!(
            AssessmentConfig::from_json("{"),
            Err(RulesError::Parse(_))
        ));
    }
}
