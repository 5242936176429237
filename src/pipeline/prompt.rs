// Prompt construction for the insight and follow-up pipelines.
// Prompts are deterministic for a given input: sampled rows are serialized
// in analyzed-column order, never in hash-map iteration order.

use std::collections::HashMap;

use super::validate::InsightsPayload;

/// Rows sampled into the analysis prompt.
pub const MAX_SAMPLE_ROWS: usize = 50;

/// Rows sampled into a follow-up prompt.
pub const FOLLOW_UP_SAMPLE_ROWS: usize = 30;

/// Longest excerpt of a malformed response quoted back in a repair prompt.
pub const REPAIR_EXCERPT_CHARS: usize = 3_000;

/// Serialize sampled rows as a JSON array, keeping cells in column order
/// and dropping cells for columns outside the analyzed subset.
fn render_sample(rows: &[HashMap<String, String>], columns: &[String], limit: usize) -> String {
    let sample: Vec<serde_json::Value> = rows
        .iter()
        .take(limit)
        .map(|row| {
            let mut filtered = serde_json::Map::new();
            for col in columns {
                if let Some(value) = row.get(col) {
                    filtered.insert(col.clone(), serde_json::Value::String(value.clone()));
                }
            }
            serde_json::Value::Object(filtered)
        })
        .collect();
    serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string())
}

/// Build the initial analysis prompt asking for exactly four JSON fields.
pub fn build_insights_prompt(
    columns: &[String],
    rows: &[HashMap<String, String>],
    total_rows: usize,
) -> String {
    let sample = render_sample(rows, columns, MAX_SAMPLE_ROWS);
    let sample_count = rows.len().min(MAX_SAMPLE_ROWS);

    format!(
        r#"You are a data analyst. Analyze this CSV dataset and provide insights.

Dataset has {total_rows} total rows and these columns being analyzed: {columns}

Sample data (first {sample_count} rows):
{sample}

Provide your analysis in the following JSON format ONLY (no markdown, no code blocks):
{{
  "summary": "A comprehensive 2-3 paragraph summary of the dataset and key findings",
  "trends": "Notable trends and patterns found in the data (2-3 paragraphs)",
  "outliers": "Any outliers, anomalies, or unusual data points (1-2 paragraphs)",
  "recommendations": "Actionable recommendations based on the analysis (3-5 bullet points as a single string)"
}}

Be specific and reference actual column names and values from the data."#,
        columns = columns.join(", "),
    )
}

/// Build a repair prompt quoting the malformed response (truncated) and the
/// validation error, if any, and asking for strictly conforming JSON.
pub fn build_repair_prompt(malformed: &str, validation_hint: Option<&str>) -> String {
    let excerpt: String = malformed.chars().take(REPAIR_EXCERPT_CHARS).collect();
    let hint = match validation_hint {
        Some(msg) => format!("\nThe previous response failed validation: {msg}\n"),
        None => String::new(),
    };

    format!(
        r#"Your previous response was not valid JSON or did not match the required schema.
{hint}
Previous response:
{excerpt}

Return ONLY a JSON object with exactly these four non-empty string fields,
no markdown and no code blocks:
{{
  "summary": "...",
  "trends": "...",
  "outliers": "...",
  "recommendations": "..."
}}"#
    )
}

/// Build a follow-up prompt embedding the prior analysis and a data sample.
pub fn build_follow_up_prompt(
    question: &str,
    headers: &[String],
    rows: &[HashMap<String, String>],
    previous: &InsightsPayload,
) -> String {
    let sample = render_sample(rows, headers, FOLLOW_UP_SAMPLE_ROWS);

    format!(
        r#"You are a data analyst. You previously analyzed a CSV dataset with these columns: {columns}

Your previous analysis:
Summary: {summary}
Trends: {trends}
Outliers: {outliers}
Recommendations: {recommendations}

Sample data:
{sample}

The user has a follow-up question: "{question}"

Please answer concisely and specifically, referencing the data where possible."#,
        columns = headers.join(", "),
        summary = previous.summary,
        trends = previous.trends,
        outliers = previous.outliers,
        recommendations = previous.recommendations,
    )
}
