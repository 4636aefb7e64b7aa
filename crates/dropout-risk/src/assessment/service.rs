use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::attribution::{Attributor, ExactAttributor, FeatureAttribution, HeuristicAttributor};
use super::classification::RiskClassifier;
use super::config::{AssessmentConfig, RulesError};
use super::encoding::FeatureEncoder;
use super::insights::CohortInsights;
use super::model::{DecisionForest, ModelError, ModelHandle, ModelInfo, RiskModel};
use super::profile::{ProfileError, StudentProfile};
use super::recommendation::RecommendationEngine;
use super::result::{BatchEntry, PredictionResult, Provenance};
use super::scoring::{HeuristicScorer, ModelScorer, RiskScore, RiskScorer, ScoringInput, Strategy};

/// Prediction orchestrator: encode, score, attribute, classify, recommend.
///
/// Both strategy decisions fail open. A missing or failing model drops the
/// request to the heuristic scorer; exact attribution is only attempted after
/// a model-backed score and falls back to the heuristic weights. The result's
/// `data_source` records what actually ran.
pub struct RiskAssessmentService {
    encoder: FeatureEncoder,
    heuristic: Arc<HeuristicScorer>,
    heuristic_attribution: Arc<HeuristicAttributor>,
    classifier: Arc<RiskClassifier>,
    recommendations: Arc<RecommendationEngine>,
    models: ModelHandle,
    model_path: Option<PathBuf>,
}

impl RiskAssessmentService {
    pub fn new(config: AssessmentConfig, models: ModelHandle) -> Self {
        let AssessmentConfig {
            thresholds,
            scoring,
            attribution,
            recommendations,
        } = config;

        Self {
            encoder: FeatureEncoder,
            heuristic: Arc::new(HeuristicScorer::new(scoring)),
            heuristic_attribution: Arc::new(HeuristicAttributor::new(attribution)),
            classifier: Arc::new(RiskClassifier::new(thresholds)),
            recommendations: Arc::new(RecommendationEngine::new(recommendations)),
            models,
            model_path: None,
        }
    }

    /// Remember where [`RiskAssessmentService::reload_model`] reads the forest from.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn models(&self) -> &ModelHandle {
        &self.models
    }

    pub fn load_model(&self, model: Arc<dyn RiskModel>) -> Option<Arc<dyn RiskModel>> {
        self.models.load(model)
    }

    pub fn current_model(&self) -> Option<Arc<dyn RiskModel>> {
        self.models.current()
    }

    /// Assess one student. Never fails for a decoded profile.
    pub fn predict(&self, profile: &StudentProfile) -> PredictionResult {
        let features = self.encoder.encode(profile);
        let input = ScoringInput {
            profile,
            features: &features,
        };

        let model = self.models.current();
        let (score, scoring_model) = self.score(input, model);
        let attribution = self.attribute(input, scoring_model.as_ref());
        let level = self.classifier.classify(&score);
        let recommendations = self
            .recommendations
            .recommend(profile, level, &attribution);

        let data_source = Provenance {
            scoring: score.strategy,
            attribution: attribution.strategy(),
        };
        let model_version = match &scoring_model {
            Some(model) if data_source.attribution == Strategy::Model => {
                format!("{}+treeshap", model.version())
            }
            Some(model) => format!("{}+heuristic-attribution", model.version()),
            None => self.heuristic.config().version.clone(),
        };

        debug!(
            student_id = %profile.student_id,
            risk_level = level.label(),
            scoring = data_source.scoring.label(),
            attribution = data_source.attribution.label(),
            "prediction complete"
        );

        PredictionResult {
            student_id: profile.student_id.clone(),
            dropout_probability: score.probability,
            dropout_prediction: self
                .classifier
                .thresholds()
                .predicts_dropout(score.probability),
            risk_level: level,
            risk_score: score.risk_score,
            heuristic_points: score.heuristic_points(),
            shap_available: data_source.attribution == Strategy::Model,
            feature_importance: attribution,
            recommendations,
            model_version,
            data_source,
            attendance: profile.attendance,
            performance: profile.latest_marks,
            prediction_timestamp: Utc::now(),
        }
    }

    /// Order-preserving; every profile yields a result.
    pub fn predict_batch(&self, profiles: &[StudentProfile]) -> Vec<PredictionResult> {
        profiles.iter().map(|profile| self.predict(profile)).collect()
    }

    pub fn predict_value(&self, record: Value) -> Result<PredictionResult, AssessmentError> {
        let profile = StudentProfile::from_value(record)?;
        Ok(self.predict(&profile))
    }

    /// Untyped batch: items that are not student records are rejected in place.
    pub fn predict_records(&self, records: Vec<Value>) -> Vec<BatchEntry> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| match StudentProfile::from_value(record) {
                Ok(profile) => BatchEntry::Scored(Box::new(self.predict(&profile))),
                Err(error) => {
                    warn!(index, error = %error, "batch item rejected");
                    BatchEntry::Rejected {
                        index,
                        error: error.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Attribution alone, using the same strategy preference as `predict`.
    pub fn explain(&self, profile: &StudentProfile) -> FeatureAttribution {
        let features = self.encoder.encode(profile);
        let input = ScoringInput {
            profile,
            features: &features,
        };
        let model = self.models.current();
        self.attribute(input, model.as_ref())
    }

    pub fn insights(&self, results: &[PredictionResult]) -> CohortInsights {
        CohortInsights::from_assessments(results)
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = self.models.current();
        ModelInfo::describe(model.as_deref(), &self.heuristic.config().version)
    }

    /// Re-read the configured forest and swap it in. On failure the live model stays.
    pub fn reload_model(&self) -> Result<ModelInfo, AssessmentError> {
        let path = self
            .model_path
            .as_ref()
            .ok_or(AssessmentError::ModelPathMissing)?;
        let forest = DecisionForest::from_path(path)?;
        info!(path = %path.display(), "reloading risk model");
        self.models.load(Arc::new(forest));
        Ok(self.model_info())
    }

    fn score(
        &self,
        input: ScoringInput<'_>,
        model: Option<Arc<dyn RiskModel>>,
    ) -> (RiskScore, Option<Arc<dyn RiskModel>>) {
        if let Some(model) = model {
            let scorer = ModelScorer::new(Arc::clone(&model));
            match scorer.score(input) {
                Ok(score) => return (score, Some(model)),
                Err(error) => warn!(
                    student_id = %input.profile.student_id,
                    error = %error,
                    "model scoring failed; using heuristic scorer"
                ),
            }
        }
        (self.heuristic.assess(input.profile), None)
    }

    fn attribute(
        &self,
        input: ScoringInput<'_>,
        model: Option<&Arc<dyn RiskModel>>,
    ) -> FeatureAttribution {
        if let Some(model) = model.filter(|model| model.supports_contributions()) {
            match ExactAttributor::new(Arc::clone(model)).explain(input) {
                Ok(attribution) => return attribution,
                Err(error) => warn!(
                    student_id = %input.profile.student_id,
                    error = %error,
                    "exact attribution failed; using heuristic weights"
                ),
            }
        }
        self.heuristic_attribution.attribute(input)
    }
}

/// Error raised by whole-request operations of the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("no model path configured")]
    ModelPathMissing,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Rules(#[from] RulesError),
}

impl AssessmentError {
    /// True when the caller sent something unusable rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AssessmentError::Profile(_))
    }
}
