//! Class-label loading for the classifier.
//!
//! Model zoos ship label files in several shapes; the format is picked by
//! file extension.

use crate::error::{Error, Result};
use std::path::Path;

/// Supported label file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    /// One label per line.
    Text,
    /// CSV with the label in the first column.
    Csv,
    /// JSON array or object.
    Json,
}

impl LabelFormat {
    /// Pick a format from a file extension. Unknown extensions parse as
    /// plain text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("csv") => Self::Csv,
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Helper struct for JSON object with a "labels" key.
#[derive(serde::Deserialize)]
struct LabelsObject {
    labels: Vec<String>,
}

/// Helper struct for JSON array of objects.
#[derive(serde::Deserialize)]
struct LabelEntry {
    name: Option<String>,
    label: Option<String>,
    class: Option<String>,
}

/// Load class labels from a file, picking the format by extension.
///
/// # Errors
///
/// Returns [`Error::LabelLoad`] if the file cannot be read and
/// [`Error::LabelParse`] if its content doesn't parse.
pub fn load_labels_from_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::LabelLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    parse_labels(&content, LabelFormat::from_path(path))
}

/// Parse labels from content according to format.
///
/// # Errors
///
/// Returns [`Error::LabelParse`] if the content doesn't match the format.
pub fn parse_labels(content: &str, format: LabelFormat) -> Result<Vec<String>> {
    match format {
        LabelFormat::Text => Ok(parse_text_labels(content)),
        LabelFormat::Csv => parse_csv_labels(content),
        LabelFormat::Json => parse_json_labels(content),
    }
}

/// One label per line, whitespace trimmed, blanks skipped.
fn parse_text_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// First CSV column, skipping a header row if one is detected.
fn parse_csv_labels(content: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut labels = Vec::new();
    let mut first_row = true;

    for result in reader.records() {
        let record = result.map_err(|e| Error::LabelParse(e.to_string()))?;

        if let Some(first_col) = record.get(0) {
            let label = first_col.trim().to_string();

            if first_row && looks_like_header(&label) {
                first_row = false;
                continue;
            }
            first_row = false;

            if !label.is_empty() {
                labels.push(label);
            }
        }
    }

    Ok(labels)
}

/// Check if a value looks like a CSV header.
fn looks_like_header(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "label" | "name" | "class" | "id" | "class_name"
    )
}

/// JSON labels: array of strings, `{"labels": [...]}`, or array of objects
/// keyed `name`/`label`/`class`.
fn parse_json_labels(content: &str) -> Result<Vec<String>> {
    if let Ok(labels) = serde_json::from_str::<Vec<String>>(content) {
        return Ok(labels);
    }

    if let Ok(obj) = serde_json::from_str::<LabelsObject>(content) {
        return Ok(obj.labels);
    }

    if let Ok(entries) = serde_json::from_str::<Vec<LabelEntry>>(content) {
        let labels: Vec<String> = entries
            .into_iter()
            .filter_map(|e| e.name.or(e.label).or(e.class))
            .collect();
        if !labels.is_empty() {
            return Ok(labels);
        }
    }

    Err(Error::LabelParse(
        "unrecognized JSON format: expected array of strings, {labels: [...]}, or [{name: ...}]"
            .to_string(),
    ))
}
