//! Request handlers.

use super::error::ApiError;
use super::models::{AnswerRequest, AnswerResponse, NextQuestionRequest};
use super::AppState;
use crate::seed::{self, AnswerError};
use askflow_core::EngineResponse;
use axum::extract::State;
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

/// Resolve the next question or action for the given section context.
///
/// The walk runs on its own task: a panic inside the engine (or a store
/// backend) surfaces as an internal error with the trace id instead of
/// aborting the connection.
pub async fn next_question_flow(
    State(state): State<AppState>,
    Json(payload): Json<NextQuestionRequest>,
) -> Result<Json<EngineResponse>, ApiError> {
    let trace_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "next_question_flow",
        trace_id = %trace_id,
        section_id = %payload.section_id,
        applicant_id = %payload.applicant_id,
    );

    state.metrics.engine_calls_total.inc();
    let timer = state.metrics.engine_call_duration_seconds.start_timer();

    let engine = state.engine.clone();
    let section_id = payload.section_id.clone();
    let params = payload.params();
    let result = tokio::spawn(
        async move { engine.walk(&section_id, params).await }.instrument(span),
    )
    .await;
    timer.observe_duration();

    match result {
        Ok(Ok(mut response)) => {
            response.trace_id = Some(trace_id);
            Ok(Json(response))
        }
        Ok(Err(err)) => {
            state.metrics.engine_call_errors_total.inc();
            tracing::warn!(trace_id = %trace_id, error = %err, "engine domain error");
            Err(ApiError::flow(err, trace_id))
        }
        Err(join_err) => {
            state.metrics.engine_call_errors_total.inc();
            tracing::error!(trace_id = %trace_id, error = %join_err, "engine task failed");
            Err(ApiError::internal(
                format!("engine task failed: {join_err}"),
                Some(trace_id),
            ))
        }
    }
}

/// Record an answer against the dev backend.
pub async fn save_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    match seed::record_answer(
        &state.store,
        &payload.applicant_id,
        &payload.question_id,
        &payload.value,
    ) {
        Ok(datapoint_id) => Ok(Json(AnswerResponse {
            message: "Answer saved successfully".to_string(),
            datapoint_id,
        })),
        Err(err @ AnswerError::QuestionNotFound(_)) => Err(ApiError::not_found(err.to_string())),
    }
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
