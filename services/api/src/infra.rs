use dropout_risk::assessment::{ModelHandle, RiskAssessmentService};
use dropout_risk::config::AssessmentSettings;
use dropout_risk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the assessment service from configured rule tables and, when a
/// model path is set, the forest stored there. An unreadable forest leaves
/// the service on heuristics with the path kept for a later reload.
pub(crate) fn assessment_service(
    settings: &AssessmentSettings,
) -> Result<RiskAssessmentService, AppError> {
    let rules = settings.rules()?;
    let mut service = RiskAssessmentService::new(rules, ModelHandle::empty());

    if let Some(path) = &settings.model_path {
        service = service.with_model_path(path);
        if let Err(err) = service.reload_model() {
            warn!(
                path = %path.display(),
                error = %err,
                "risk model unavailable, scoring with heuristic rules"
            );
        }
    }

    Ok(service)
}
