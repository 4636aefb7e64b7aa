//! Trained-model seam for the model-backed scoring and attribution strategies.
//!
//! The core never trains anything. A collaborator hands over a ready model
//! (usually a [`DecisionForest`] loaded from disk) through a [`ModelHandle`];
//! when the handle is empty the assessment runs on heuristics alone.

mod forest;
mod treeshap;

pub use forest::{DecisionForest, DecisionTree, TreeNode};

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::info;

use super::encoding::{Feature, FEATURE_COUNT};

/// Binary classifier producing the probability of the dropout class.
pub trait RiskModel: Send + Sync {
    /// Version tag recorded on every result the model contributes to.
    fn version(&self) -> &str;

    /// Human-readable model family, e.g. `RandomForestClassifier`.
    fn kind(&self) -> &str;

    /// Input columns the model was trained on, in the order it expects them.
    fn feature_names(&self) -> Vec<&'static str> {
        Feature::ALL.iter().map(|feature| feature.name()).collect()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Signed per-feature contributions in schema order.
    fn contributions(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::ExplainerUnavailable)
    }

    fn supports_contributions(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model does not provide per-feature contributions")]
    ExplainerUnavailable,
    #[error("expected {expected} features, received {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
    #[error("model references unknown feature '{0}'")]
    UnknownFeature(String),
    #[error("invalid model definition: {0}")]
    Invalid(String),
    #[error("model produced a non-finite output")]
    NonFiniteOutput,
    #[error("model probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse model definition: {0}")]
    Parse(#[from] serde_json::Error),
}

pub(crate) fn ensure_feature_count(features: &[f64]) -> Result<(), ModelError> {
    if features.len() == FEATURE_COUNT {
        Ok(())
    } else {
        Err(ModelError::FeatureCountMismatch {
            expected: FEATURE_COUNT,
            actual: features.len(),
        })
    }
}

/// Shared slot holding the currently active model.
///
/// Readers clone the inner `Arc` and drop the lock before inference, so a
/// [`ModelHandle::load`] only ever replaces the reference and in-flight
/// predictions finish on the model they started with.
#[derive(Clone, Default)]
pub struct ModelHandle {
    slot: Arc<RwLock<Option<Arc<dyn RiskModel>>>>,
}

impl ModelHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: Arc<dyn RiskModel>) -> Self {
        let handle = Self::default();
        handle.load(model);
        handle
    }

    /// Swap in a new model, returning the one it replaced.
    pub fn load(&self, model: Arc<dyn RiskModel>) -> Option<Arc<dyn RiskModel>> {
        info!(version = model.version(), kind = model.kind(), "risk model loaded");
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(model)
    }

    pub fn unload(&self) -> Option<Arc<dyn RiskModel>> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.take();
        if previous.is_some() {
            info!("risk model unloaded; heuristic strategies only");
        }
        previous
    }

    pub fn current(&self) -> Option<Arc<dyn RiskModel>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let version = self.current().map(|model| model.version().to_string());
        f.debug_struct("ModelHandle")
            .field("version", &version)
            .finish()
    }
}

/// Snapshot describing which strategies are currently available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub model_loaded: bool,
    pub shap_available: bool,
    pub feature_count: usize,
    pub features: Vec<&'static str>,
}

impl ModelInfo {
    pub(crate) fn describe(model: Option<&dyn RiskModel>, heuristic_version: &str) -> Self {
        match model {
            Some(model) => {
                let features = model.feature_names();
                Self {
                    model_type: model.kind().to_string(),
                    version: model.version().to_string(),
                    model_loaded: true,
                    shap_available: model.supports_contributions(),
                    feature_count: features.len(),
                    features,
                }
            }
            None => Self {
                model_type: "HeuristicRiskRules".to_string(),
                version: heuristic_version.to_string(),
                model_loaded: false,
                shap_available: false,
                feature_count: FEATURE_COUNT,
                features: Feature::ALL.iter().map(|feature| feature.name()).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64, &'static str);

    impl RiskModel for Constant {
        fn version(&self) -> &str {
            self.1
        }

        fn kind(&self) -> &str {
            "Constant"
        }

        fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
            ensure_feature_count(features)?;
            Ok(self.0)
        }
    }

    #[test]
    fn load_swaps_without_disturbing_held_references() {
        let handle = ModelHandle::with_model(Arc::new(Constant(0.2, "v1")));
        let in_flight = handle.current().expect("model present");

        let previous = handle.load(Arc::new(Constant(0.9, "v2")));

        assert_eq!(previous.map(|model| model.version().to_string()), Some("v1".to_string()));
        assert_eq!(in_flight.version(), "v1");
        assert_eq!(
            in_flight.predict_proba(&[0.0; FEATURE_COUNT]).expect("predicts"),
            0.2
        );
        assert_eq!(handle.current().expect("swapped").version(), "v2");
    }

    #[test]
    fn clones_share_the_same_slot() {
        let handle = ModelHandle::empty();
        let shared = handle.clone();
        assert!(!shared.is_loaded());

        handle.load(Arc::new(Constant(0.5, "v1")));
        assert!(shared.is_loaded());

        shared.unload();
        assert!(!handle.is_loaded());
    }

    #[test]
    fn default_contributions_report_missing_explainer() {
        let model = Constant(0.5, "v1");
        assert!(matches!(
            model.contributions(&[0.0; FEATURE_COUNT]),
            Err(ModelError::ExplainerUnavailable)
        ));
        assert!(matches!(
            model.predict_proba(&[0.0; 3]),
            Err(ModelError::FeatureCountMismatch {
                expected: FEATURE_COUNT,
                actual: 3
            })
        ));
    }
}
