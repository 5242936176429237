// Header-keyed CSV parsing and light column profiling for upload previews.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV has no header row")]
    MissingHeader,
}

/// Parsed CSV content: ordered headers plus header-keyed string rows.
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    pub total_rows: usize,
}

/// Default number of preview rows returned to the client.
pub const PREVIEW_ROWS: usize = 10;

/// Rows sampled when deciding whether a column is numeric.
const NUMERIC_SAMPLE_ROWS: usize = 20;

/// Fraction of sampled values that must parse as numbers for a column to
/// count as numeric.
const NUMERIC_THRESHOLD: f64 = 0.7;

/// Parse a CSV document from a string. The first record is the header row;
/// rows with a different field count are accepted (missing cells are empty),
/// and fully empty lines are skipped.
pub fn parse_csv_string(input: &str) -> Result<CsvData, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(CsvError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let row: HashMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                (
                    header.clone(),
                    record.get(i).unwrap_or_default().to_string(),
                )
            })
            .collect();
        rows.push(row);
    }

    let total_rows = rows.len();
    Ok(CsvData {
        headers,
        rows,
        total_rows,
    })
}

/// First `count` rows, for client-side previews.
pub fn preview_rows(data: &CsvData, count: usize) -> Vec<HashMap<String, String>> {
    data.rows.iter().take(count).cloned().collect()
}

/// Columns whose sampled values are mostly numeric.
pub fn numeric_columns(data: &CsvData) -> Vec<String> {
    if data.rows.is_empty() {
        return Vec::new();
    }

    data.headers
        .iter()
        .filter(|header| {
            let sample: Vec<&str> = data
                .rows
                .iter()
                .take(NUMERIC_SAMPLE_ROWS)
                .map(|row| row.get(*header).map(String::as_str).unwrap_or(""))
                .collect();
            let numeric = sample
                .iter()
                .filter(|v| !v.is_empty() && v.trim().parse::<f64>().is_ok())
                .count();
            (numeric as f64) > (sample.len() as f64) * NUMERIC_THRESHOLD
        })
        .cloned()
        .collect()
}

/// Basic statistics over one column's numeric values.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// Stats for the numeric values in `column`, or `None` when no value parses.
pub fn column_stats(data: &CsvData, column: &str) -> Option<ColumnStats> {
    let mut values: Vec<f64> = data
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .collect();

    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let sum: f64 = values.iter().sum();
    let mean = sum / values.len() as f64;

    Some(ColumnStats {
        min: values[0],
        max: values[values.len() - 1],
        mean: (mean * 100.0).round() / 100.0,
        median: values[values.len() / 2],
        count: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "region,sales,note\nnorth,120,ok\nsouth,80,\neast,95,check\n";

    #[test]
    fn parses_headers_and_rows() {
        let data = parse_csv_string(SAMPLE).unwrap();
        assert_eq!(data.headers, vec!["region", "sales", "note"]);
        assert_eq!(data.total_rows, 3);
        assert_eq!(data.rows[0]["region"], "north");
        assert_eq!(data.rows[1]["note"], "");
    }

    #[test]
    fn skips_empty_lines() {
        let data = parse_csv_string("a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(data.total_rows, 2);
    }

    #[test]
    fn short_records_fill_empty_cells() {
        let data = parse_csv_string("a,b,c\n1,2\n").unwrap();
        assert_eq!(data.rows[0]["c"], "");
    }

    #[test]
    fn preview_caps_row_count() {
        let mut body = String::from("n\n");
        for i in 0..30 {
            body.push_str(&format!("{i}\n"));
        }
        let data = parse_csv_string(&body).unwrap();
        assert_eq!(preview_rows(&data, PREVIEW_ROWS).len(), 10);
    }

    #[test]
    fn numeric_columns_detected() {
        let data = parse_csv_string(SAMPLE).unwrap();
        assert_eq!(numeric_columns(&data), vec!["sales"]);
    }

    #[test]
    fn numeric_columns_empty_dataset() {
        let data = parse_csv_string("a,b\n").unwrap();
        assert!(numeric_columns(&data).is_empty());
    }

    #[test]
    fn column_stats_computed() {
        let data = parse_csv_string("v\n1\n2\n3\n4\n").unwrap();
        let stats = column_stats(&data, "v").unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.count, 4);
    }

    #[test]
    fn column_stats_none_for_text_column() {
        let data = parse_csv_string(SAMPLE).unwrap();
        assert!(column_stats(&data, "region").is_none());
    }

    #[test]
    fn column_stats_skips_empty_cells() {
        // Missing values are excluded entirely, not coerced to zero.
        let data = parse_csv_string("k,v\na,10\nb,\nc,20\n").unwrap();
        let stats = column_stats(&data, "v").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.mean, 15.0);
    }
}
