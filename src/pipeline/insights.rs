// The core pipeline: prompt → model (with retry) → parse → validate →
// bounded repair loop → sanitized result or fallback. Model non-compliance
// never surfaces as an error; it always resolves to a Fallback result.

use std::collections::HashMap;

use super::gemini::LlmClient;
use super::prompt::{
    build_follow_up_prompt, build_insights_prompt, build_repair_prompt, FOLLOW_UP_SAMPLE_ROWS,
    MAX_SAMPLE_ROWS,
};
use super::retry::retry_with_backoff;
use super::sanitize::{sanitize_ai_output, sanitize_user_question};
use super::validate::{safe_validate, InsightsPayload, ValidationOutcome};
use super::InsightError;

/// Repair requests after the initial response, across parse-failure and
/// validation-failure causes. Terminal: the loop never recurses past this.
const MAX_REPAIR_ATTEMPTS: u32 = 2;

const FALLBACK_TRENDS: &str = "Could not parse structured trends.";
const FALLBACK_OUTLIERS: &str = "Could not parse structured outliers.";
const FALLBACK_RECOMMENDATIONS: &str = "Could not parse structured recommendations.";
const FALLBACK_EMPTY_SUMMARY: &str = "The model response could not be interpreted.";

/// The four narrative insight fields, already sanitized.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InsightsReport {
    pub summary: String,
    pub trends: String,
    pub outliers: String,
    pub recommendations: String,
}

/// Outcome of the insight pipeline. A `Fallback` carries well-formed but
/// low-confidence text; callers that persist or display reports treat both
/// the same, but the tag keeps the distinction inspectable.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightsOutcome {
    Validated(InsightsReport),
    Fallback(InsightsReport),
}

impl InsightsOutcome {
    pub fn report(&self) -> &InsightsReport {
        match self {
            InsightsOutcome::Validated(r) | InsightsOutcome::Fallback(r) => r,
        }
    }

    pub fn into_report(self) -> InsightsReport {
        match self {
            InsightsOutcome::Validated(r) | InsightsOutcome::Fallback(r) => r,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, InsightsOutcome::Fallback(_))
    }
}

/// Strip markdown code-fence markers the model sometimes wraps JSON in.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn non_empty_or(text: String, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text
    }
}

impl InsightsPayload {
    fn sanitized(self) -> InsightsReport {
        InsightsReport {
            summary: non_empty_or(sanitize_ai_output(&self.summary), FALLBACK_EMPTY_SUMMARY),
            trends: non_empty_or(sanitize_ai_output(&self.trends), FALLBACK_TRENDS),
            outliers: non_empty_or(sanitize_ai_output(&self.outliers), FALLBACK_OUTLIERS),
            recommendations: non_empty_or(
                sanitize_ai_output(&self.recommendations),
                FALLBACK_RECOMMENDATIONS,
            ),
        }
    }
}

/// Generate narrative insights for a tabular dataset.
///
/// `selected_columns` narrows the analysis; `None` or an empty list means
/// all headers are analyzed; the pipeline never analyzes zero columns.
/// Returns `Err` only when the model stays unreachable through the retry
/// budget; malformed or non-conforming output resolves to a `Fallback`.
pub async fn generate_insights(
    llm: &dyn LlmClient,
    headers: &[String],
    rows: &[HashMap<String, String>],
    selected_columns: Option<&[String]>,
) -> Result<InsightsOutcome, InsightError> {
    let columns: Vec<String> = match selected_columns {
        Some(cols) if !cols.is_empty() => cols.to_vec(),
        _ => headers.to_vec(),
    };

    let prompt = build_insights_prompt(&columns, rows, rows.len());
    let mut raw = retry_with_backoff("generate_insights", || llm.generate(&prompt)).await?;

    // Explicit loop rather than recursion: one initial parse plus at most
    // MAX_REPAIR_ATTEMPTS round-trips back to the model.
    let mut parsed_summary: Option<String> = None;
    for attempt in 0..=MAX_REPAIR_ATTEMPTS {
        let cleaned = strip_code_fences(&raw);

        let validation_hint = match serde_json::from_str::<serde_json::Value>(&cleaned) {
            Ok(value) => {
                if let Some(summary) = value.get("summary").and_then(|v| v.as_str()) {
                    parsed_summary = Some(summary.to_string());
                }
                match safe_validate::<InsightsPayload>(value) {
                    ValidationOutcome::Valid(payload) => {
                        tracing::info!(
                            columns = columns.len(),
                            rows = rows.len(),
                            sampled = rows.len().min(MAX_SAMPLE_ROWS),
                            repair_attempts = attempt,
                            "insights generated"
                        );
                        return Ok(InsightsOutcome::Validated(payload.sanitized()));
                    }
                    ValidationOutcome::Invalid(error) => {
                        tracing::warn!(
                            attempt,
                            bytes = raw.len(),
                            error = %error,
                            "model output failed schema validation"
                        );
                        Some(error)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    bytes = raw.len(),
                    error = %e,
                    "model output is not valid JSON"
                );
                None
            }
        };

        if attempt == MAX_REPAIR_ATTEMPTS {
            break;
        }

        let repair_prompt = build_repair_prompt(&raw, validation_hint.as_deref());
        raw = retry_with_backoff("repair_insights", || llm.generate(&repair_prompt)).await?;
    }

    tracing::warn!(
        columns = columns.len(),
        rows = rows.len(),
        "repair attempts exhausted, returning fallback insights"
    );

    // Best-effort result: the raw text (or a previously parsed summary
    // field) becomes the summary; the rest are fixed placeholders.
    let summary_source = parsed_summary.unwrap_or_else(|| raw.clone());
    Ok(InsightsOutcome::Fallback(InsightsReport {
        summary: non_empty_or(sanitize_ai_output(&summary_source), FALLBACK_EMPTY_SUMMARY),
        trends: FALLBACK_TRENDS.to_string(),
        outliers: FALLBACK_OUTLIERS.to_string(),
        recommendations: FALLBACK_RECOMMENDATIONS.to_string(),
    }))
}

/// Answer a free-text follow-up question about a previously analyzed
/// dataset. No JSON parsing or repair; the answer is sanitized text.
pub async fn ask_follow_up(
    llm: &dyn LlmClient,
    question: &str,
    headers: &[String],
    rows: &[HashMap<String, String>],
    previous_insights: &InsightsPayload,
) -> Result<String, InsightError> {
    let question = sanitize_user_question(question);
    let prompt = build_follow_up_prompt(&question, headers, rows, previous_insights);
    let raw = retry_with_backoff("ask_follow_up", || llm.generate(&prompt)).await?;

    tracing::info!(
        columns = headers.len(),
        sampled = rows.len().min(FOLLOW_UP_SAMPLE_ROWS),
        "follow-up answered"
    );
    Ok(sanitize_ai_output(&raw))
}
