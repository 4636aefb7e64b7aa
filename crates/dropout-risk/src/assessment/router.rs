use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use super::profile::StudentProfile;
use super::service::{AssessmentError, RiskAssessmentService};

/// Router builder exposing the prediction, explanation, and model endpoints.
pub fn assessment_router(service: Arc<RiskAssessmentService>) -> Router {
    Router::new()
        .route("/api/v1/predict", post(predict_handler))
        .route("/api/v1/predict/batch", post(batch_handler))
        .route("/api/v1/explain", post(explain_handler))
        .route("/api/v1/insights", post(insights_handler))
        .route("/api/v1/model/info", get(model_info_handler))
        .route("/api/v1/model/reload", post(reload_handler))
        .with_state(service)
}

/// Accepts `{"student_data": {...}}` or the record itself.
fn student_record(payload: Value) -> Value {
    match payload {
        Value::Object(mut fields) if fields.contains_key("student_data") => fields
            .remove("student_data")
            .unwrap_or(Value::Null),
        other => other,
    }
}

fn student_records(payload: Value) -> Result<Vec<Value>, Response> {
    let records = match payload {
        Value::Object(mut fields) => fields
            .remove("students_data")
            .or_else(|| fields.remove("students")),
        Value::Array(items) => Some(Value::Array(items)),
        _ => None,
    };

    match records {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            "expected an array of student records under \"students_data\"",
        )),
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

fn assessment_error_response(error: AssessmentError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, error.to_string())
}

pub(crate) async fn predict_handler(
    State(service): State<Arc<RiskAssessmentService>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response {
    match service.predict_value(student_record(payload)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => assessment_error_response(error),
    }
}

pub(crate) async fn batch_handler(
    State(service): State<Arc<RiskAssessmentService>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response {
    let records = match student_records(payload) {
        Ok(records) => records,
        Err(response) => return response,
    };

    let predictions = service.predict_records(records);
    let payload = json!({
        "total": predictions.len(),
        "predictions": predictions,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn explain_handler(
    State(service): State<Arc<RiskAssessmentService>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response {
    let profile = match StudentProfile::from_value(student_record(payload)) {
        Ok(profile) => profile,
        Err(error) => return assessment_error_response(error.into()),
    };

    let attribution = service.explain(&profile);
    let payload = json!({
        "student_id": profile.student_id,
        "strategy": attribution.strategy(),
        "feature_importance": attribution,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn insights_handler(
    State(service): State<Arc<RiskAssessmentService>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response {
    let records = match student_records(payload) {
        Ok(records) => records,
        Err(response) => return response,
    };

    let results: Vec<_> = service
        .predict_records(records)
        .iter()
        .filter_map(|entry| entry.result().cloned())
        .collect();
    let insights = service.insights(&results);
    (StatusCode::OK, axum::Json(insights)).into_response()
}

pub(crate) async fn model_info_handler(
    State(service): State<Arc<RiskAssessmentService>>,
) -> Response {
    (StatusCode::OK, axum::Json(service.model_info())).into_response()
}

pub(crate) async fn reload_handler(State(service): State<Arc<RiskAssessmentService>>) -> Response {
    match service.reload_model() {
        Ok(info) => (StatusCode::OK, axum::Json(info)).into_response(),
        Err(AssessmentError::ModelPathMissing) => error_response(
            StatusCode::CONFLICT,
            AssessmentError::ModelPathMissing.to_string(),
        ),
        Err(error) => assessment_error_response(error),
    }
}
