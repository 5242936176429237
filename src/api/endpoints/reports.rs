//! Report CRUD endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{NewReport, DEFAULT_LIST_LIMIT};
use crate::pipeline::{
    safe_validate, sanitize_ai_output, sanitize_csv_data, sanitize_filename, validate_report_id,
    SaveReportRequest, ValidationOutcome,
};

/// POST /api/reports
pub async fn save(
    State(ctx): State<ApiContext>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let request = match safe_validate::<SaveReportRequest>(body) {
        ValidationOutcome::Valid(r) => r,
        ValidationOutcome::Invalid(errors) => return Err(ApiError::BadRequest(errors)),
    };

    // Sanitize once more at the storage boundary; stored text must be
    // clean regardless of which client produced it.
    let report = NewReport {
        filename: sanitize_filename(&request.filename),
        row_count: request.row_count,
        column_count: request.column_count,
        columns_analyzed: request.columns_analyzed,
        insights_summary: sanitize_ai_output(&request.insights_summary),
        trends: sanitize_ai_output(&request.trends),
        outliers: sanitize_ai_output(&request.outliers),
        recommendations: sanitize_ai_output(&request.recommendations),
        csv_preview_json: sanitize_csv_data(&request.csv_preview_json),
    };

    let saved = ctx.store.save(&report)?;
    tracing::info!(report_id = saved.id, filename = %saved.filename, "report saved");

    Ok((StatusCode::CREATED, Json(json!({ "report": saved }))))
}

/// GET /api/reports
pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let reports = ctx.store.list_recent(DEFAULT_LIST_LIMIT)?;
    Ok(Json(json!({ "reports": reports })))
}

/// GET /api/reports/:id
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = match validate_report_id(&raw_id) {
        ValidationOutcome::Valid(id) => id,
        ValidationOutcome::Invalid(error) => return Err(ApiError::BadRequest(error)),
    };

    match ctx.store.get(id)? {
        Some(report) => Ok(Json(json!({ "report": report }))),
        None => Err(ApiError::NotFound("Report not found".to_string())),
    }
}
