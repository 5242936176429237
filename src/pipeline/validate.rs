// Declarative shape/range checks for API inputs and LLM outputs.
// Validation never panics and never throws past this boundary: serde
// coercion errors and constraint violations both land in the Invalid branch.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Discriminated result of validating untyped data against a schema.
#[derive(Debug, Clone)]
pub enum ValidationOutcome<T> {
    Valid(T),
    Invalid(String),
}

impl<T> ValidationOutcome<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }
}

/// Constraint checks applied after serde coercion. Implementations push one
/// `path: message` entry per violated field, in declaration order.
pub trait Validate {
    fn check(&self, errors: &mut Vec<String>);
}

/// Coerce an untyped JSON value into `T` and run its constraint checks.
/// Failure messages are semicolon-joined `path: message` entries.
pub fn safe_validate<T>(value: serde_json::Value) -> ValidationOutcome<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => return ValidationOutcome::Invalid(e.to_string()),
    };

    let mut errors = Vec::new();
    parsed.check(&mut errors);
    if errors.is_empty() {
        ValidationOutcome::Valid(parsed)
    } else {
        ValidationOutcome::Invalid(errors.join("; "))
    }
}

// ─── Field constraint helpers ────────────────────────────────────────

const MAX_HEADER_COUNT: usize = 500;
const MAX_HEADER_LENGTH: usize = 255;
const MAX_ROW_COUNT: usize = 100_000;
const MAX_CELL_LENGTH: usize = 10_000;
const MAX_INSIGHT_FIELD_LENGTH: usize = 5_000;
const MAX_STORED_TEXT_LENGTH: usize = 10_000;
const MAX_QUESTION_LENGTH: usize = 1_000;

/// Maximum accepted upload size (10MB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

static CSV_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[\w\-. ]+\.csv$").unwrap());
static DIGITS_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

fn check_bounded_text(errors: &mut Vec<String>, path: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        errors.push(format!("{path}: must not be empty"));
    } else if len > max {
        errors.push(format!("{path}: exceeds maximum length of {max}"));
    }
}

fn check_headers(errors: &mut Vec<String>, path: &str, headers: &[String]) {
    if headers.is_empty() {
        errors.push(format!("{path}: at least one header required"));
    } else if headers.len() > MAX_HEADER_COUNT {
        errors.push(format!("{path}: exceeds maximum of {MAX_HEADER_COUNT} headers"));
    }
    if headers.iter().any(|h| h.chars().count() > MAX_HEADER_LENGTH) {
        errors.push(format!("{path}: header exceeds {MAX_HEADER_LENGTH} chars"));
    }
}

fn check_rows(errors: &mut Vec<String>, path: &str, rows: &[HashMap<String, String>]) {
    if rows.is_empty() {
        errors.push(format!("{path}: at least one row required"));
    } else if rows.len() > MAX_ROW_COUNT {
        errors.push(format!("{path}: exceeds maximum of {MAX_ROW_COUNT} rows"));
    }
    if rows
        .iter()
        .any(|row| row.values().any(|v| v.chars().count() > MAX_CELL_LENGTH))
    {
        errors.push(format!("{path}: cell exceeds {MAX_CELL_LENGTH} chars"));
    }
}

fn check_csv_filename(errors: &mut Vec<String>, path: &str, filename: &str) {
    if filename.is_empty() || filename.chars().count() > MAX_HEADER_LENGTH {
        errors.push(format!("{path}: must be 1-255 chars"));
    } else if !CSV_FILENAME.is_match(filename) {
        errors.push(format!("{path}: invalid filename format"));
    }
}

// ─── LLM output schema ───────────────────────────────────────────────

/// The four narrative fields the model must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsPayload {
    pub summary: String,
    pub trends: String,
    pub outliers: String,
    pub recommendations: String,
}

impl Validate for InsightsPayload {
    fn check(&self, errors: &mut Vec<String>) {
        check_bounded_text(errors, "summary", &self.summary, 1, MAX_INSIGHT_FIELD_LENGTH);
        check_bounded_text(errors, "trends", &self.trends, 1, MAX_INSIGHT_FIELD_LENGTH);
        check_bounded_text(errors, "outliers", &self.outliers, 1, MAX_INSIGHT_FIELD_LENGTH);
        check_bounded_text(
            errors,
            "recommendations",
            &self.recommendations,
            1,
            MAX_INSIGHT_FIELD_LENGTH,
        );
    }
}

// ─── API input schemas ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub selected_columns: Option<Vec<String>>,
}

impl Validate for AnalyzeRequest {
    fn check(&self, errors: &mut Vec<String>) {
        check_headers(errors, "headers", &self.headers);
        check_rows(errors, "rows", &self.rows);
        if let Some(cols) = &self.selected_columns {
            if cols.iter().any(|c| c.chars().count() > MAX_HEADER_LENGTH) {
                errors.push(format!(
                    "selectedColumns: column exceeds {MAX_HEADER_LENGTH} chars"
                ));
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    pub action: String,
    pub question: String,
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    pub previous_insights: InsightsPayload,
}

impl Validate for FollowUpRequest {
    fn check(&self, errors: &mut Vec<String>) {
        if self.action != "followup" {
            errors.push("action: must be \"followup\"".to_string());
        }
        check_bounded_text(errors, "question", &self.question, 1, MAX_QUESTION_LENGTH);
        check_headers(errors, "headers", &self.headers);
        check_rows(errors, "rows", &self.rows);
        let mut nested = Vec::new();
        self.previous_insights.check(&mut nested);
        errors.extend(nested.into_iter().map(|e| format!("previousInsights.{e}")));
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReportRequest {
    pub filename: String,
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub column_count: i64,
    #[serde(default)]
    pub columns_analyzed: Vec<String>,
    pub insights_summary: String,
    #[serde(default)]
    pub trends: String,
    #[serde(default)]
    pub outliers: String,
    #[serde(default)]
    pub recommendations: String,
    #[serde(default)]
    pub csv_preview_json: Vec<HashMap<String, String>>,
}

impl Validate for SaveReportRequest {
    fn check(&self, errors: &mut Vec<String>) {
        check_csv_filename(errors, "filename", &self.filename);
        if self.row_count < 0 {
            errors.push("rowCount: must be non-negative".to_string());
        }
        if self.column_count < 0 {
            errors.push("columnCount: must be non-negative".to_string());
        }
        if self
            .columns_analyzed
            .iter()
            .any(|c| c.chars().count() > MAX_HEADER_LENGTH)
        {
            errors.push(format!(
                "columnsAnalyzed: column exceeds {MAX_HEADER_LENGTH} chars"
            ));
        }
        check_bounded_text(
            errors,
            "insightsSummary",
            &self.insights_summary,
            1,
            MAX_STORED_TEXT_LENGTH,
        );
        for (path, value) in [
            ("trends", &self.trends),
            ("outliers", &self.outliers),
            ("recommendations", &self.recommendations),
        ] {
            if value.chars().count() > MAX_STORED_TEXT_LENGTH {
                errors.push(format!(
                    "{path}: exceeds maximum length of {MAX_STORED_TEXT_LENGTH}"
                ));
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadFile {
    pub filename: String,
    pub size: u64,
}

impl Validate for UploadFile {
    fn check(&self, errors: &mut Vec<String>) {
        check_csv_filename(errors, "filename", &self.filename);
        if self.size == 0 {
            errors.push("size: must be positive".to_string());
        } else if self.size > MAX_UPLOAD_BYTES {
            errors.push("size: file exceeds 10MB limit".to_string());
        }
    }
}

/// Validate a report id path parameter. Digits only; anything else
/// (including injection-style strings) is rejected before it reaches SQL.
pub fn validate_report_id(raw: &str) -> ValidationOutcome<i64> {
    if !DIGITS_ONLY.is_match(raw) {
        return ValidationOutcome::Invalid("id: report ID must be a number".to_string());
    }
    match raw.parse::<i64>() {
        Ok(id) => ValidationOutcome::Valid(id),
        Err(_) => ValidationOutcome::Invalid("id: report ID out of range".to_string()),
    }
}
