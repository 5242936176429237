//! Multipart CSV upload: parse, profile, and return a preview.

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::csv_data::{column_stats, numeric_columns, parse_csv_string, preview_rows, PREVIEW_ROWS};
use crate::pipeline::{
    safe_validate, sanitize_csv_data, sanitize_filename, UploadFile, ValidationOutcome,
};

/// POST /api/upload
pub async fn upload(
    State(_ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("file: malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("file: failed to read upload: {e}")))?;
        file = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((raw_filename, bytes)) = file else {
        return Err(ApiError::BadRequest("file: no file provided".to_string()));
    };

    let upload = match safe_validate::<UploadFile>(json!({
        "filename": raw_filename,
        "size": bytes.len() as u64,
    })) {
        ValidationOutcome::Valid(u) => u,
        ValidationOutcome::Invalid(errors) => return Err(ApiError::BadRequest(errors)),
    };

    let text = String::from_utf8(bytes)
        .map_err(|_| ApiError::BadRequest("file: CSV must be valid UTF-8".to_string()))?;
    let mut data = parse_csv_string(&text)
        .map_err(|e| ApiError::BadRequest(format!("file: {e}")))?;
    data.rows = sanitize_csv_data(&data.rows);

    let filename = sanitize_filename(&upload.filename);
    let numeric = numeric_columns(&data);
    let stats: serde_json::Map<String, serde_json::Value> = numeric
        .iter()
        .filter_map(|col| {
            column_stats(&data, col).map(|s| (col.clone(), json!(s)))
        })
        .collect();

    tracing::info!(
        filename = %filename,
        rows = data.total_rows,
        columns = data.headers.len(),
        "CSV upload parsed"
    );

    Ok(Json(json!({
        "success": true,
        "filename": filename,
        "rowCount": data.total_rows,
        "headers": data.headers,
        "preview": preview_rows(&data, PREVIEW_ROWS),
        "numericColumns": numeric,
        "columnStats": stats,
    })))
}
