//! Uploaded address lists

use crate::error::ValidationError;

/// Addresses from a headerless CSV: the first non-empty column of every
/// non-empty row, trimmed
pub fn parse_address_csv(content: &[u8]) -> Result<Vec<String>, ValidationError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut addresses = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;
        if let Some(address) = record.iter().map(str::trim).find(|v| !v.is_empty()) {
            addresses.push(address.to_string());
        }
    }
    Ok(addresses)
}

pub fn is_csv_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".csv")
}

/// Reduce an uploaded file name to a safe single path component
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`.
/// Returns `None` if nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
