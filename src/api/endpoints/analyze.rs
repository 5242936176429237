//! Analysis endpoint: initial insight generation and follow-up questions
//! share one route, dispatched on the `action` field.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::{
    ask_follow_up, generate_insights, safe_validate, sanitize_csv_data, AnalyzeRequest,
    FollowUpRequest, ValidationOutcome,
};

/// POST /api/analyze
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request_id = uuid::Uuid::new_v4();

    if body.get("action").and_then(|v| v.as_str()) == Some("followup") {
        return follow_up(&ctx, body, request_id).await;
    }

    let request = match safe_validate::<AnalyzeRequest>(body) {
        ValidationOutcome::Valid(r) => r,
        ValidationOutcome::Invalid(errors) => return Err(ApiError::BadRequest(errors)),
    };

    tracing::info!(
        %request_id,
        headers = request.headers.len(),
        rows = request.rows.len(),
        "analyze request"
    );

    let rows = sanitize_csv_data(&request.rows);
    let outcome = generate_insights(
        ctx.llm.as_ref(),
        &request.headers,
        &rows,
        request.selected_columns.as_deref(),
    )
    .await?;

    let fallback = outcome.is_fallback();
    if fallback {
        tracing::warn!(%request_id, "serving fallback insights");
    }

    Ok(Json(json!({
        "insights": outcome.into_report(),
        "fallback": fallback,
    })))
}

async fn follow_up(
    ctx: &ApiContext,
    body: serde_json::Value,
    request_id: uuid::Uuid,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = match safe_validate::<FollowUpRequest>(body) {
        ValidationOutcome::Valid(r) => r,
        ValidationOutcome::Invalid(errors) => return Err(ApiError::BadRequest(errors)),
    };

    tracing::info!(
        %request_id,
        headers = request.headers.len(),
        rows = request.rows.len(),
        "follow-up request"
    );

    let rows = sanitize_csv_data(&request.rows);
    let answer = ask_follow_up(
        ctx.llm.as_ref(),
        &request.question,
        &request.headers,
        &rows,
        &request.previous_insights,
    )
    .await?;

    Ok(Json(json!({ "answer": answer })))
}
