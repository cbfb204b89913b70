use crate::error::AppError;
use crate::services::analysis::types::{Dataset, Value};
use bytes::Bytes;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Sanitize a header into a stable column identifier. Duplicate names get a
/// numeric suffix so every column stays addressable.
pub fn clean_column_name(name: &str, existing_names: &mut HashSet<String>) -> String {
    let base_name = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    let mut cleaned = if base_name.chars().next().map_or(true, |c| !c.is_alphabetic()) {
        format!("col_{}", base_name)
    } else {
        base_name
    };

    let mut counter = 1;
    let original_name = cleaned.clone();
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", original_name, counter);
        counter += 1;
    }

    cleaned
}

/// Parse CSV text into the row model. Cells are kept as raw text; type
/// inference happens later in the profiler. Empty cells become null.
pub fn parse_csv(text: &str) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut existing_names = HashSet::new();
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::ParseError(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .map(|h| clean_column_name(h, &mut existing_names))
        .collect();

    let mut rows: Vec<HashMap<String, Value>> = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::ParseError(format!("Failed to read CSV row: {}", e)))?;
        let row: HashMap<String, Value> = columns
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::Text(cell.to_string())
                };
                (name.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), columns = columns.len(), "CSV parsed");
    Ok(Dataset { columns, rows })
}

pub async fn load_file_from_url(url: &str) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::FileProcessingError(format!(
            "Failed to fetch file. Status: {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to read response bytes: {}", e)))
}

/// Load a dataset from a local path or an http(s) URL.
pub async fn load_dataset(source: &str) -> Result<Dataset, AppError> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        let bytes = load_file_from_url(source).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::ParseError(format!("CSV is not valid UTF-8: {}", e)))?
    } else {
        std::fs::read_to_string(Path::new(source))?
    };
    parse_csv(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let ds = parse_csv("Region,Score\nA,10\nB,20\n").unwrap();
        assert_eq!(ds.columns, vec!["region", "score"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.value(0, "region"), &Value::Text("A".to_string()));
        assert_eq!(ds.value(1, "score"), &Value::Text("20".to_string()));
    }

    #[test]
    fn empty_cells_become_null() {
        let ds = parse_csv("a,b\n1,\n,2\n").unwrap();
        assert!(ds.value(0, "b").is_missing());
        assert!(ds.value(1, "a").is_missing());
        assert_eq!(ds.value(1, "b"), &Value::Text("2".to_string()));
    }

    #[test]
    fn short_rows_read_as_null() {
        let ds = parse_csv("a,b,c\n1,2\n").unwrap();
        assert_eq!(ds.value(0, "a"), &Value::Text("1".to_string()));
        assert!(ds.value(0, "c").is_missing());
    }

    #[test]
    fn duplicate_and_odd_headers_are_sanitized() {
        let ds = parse_csv("Total Sales,Total Sales,2024\nx,y,z\n").unwrap();
        assert_eq!(ds.columns, vec!["total_sales", "total_sales_1", "col_2024"]);
    }

    #[test]
    fn loads_dataset_from_local_path() {
        let path = std::env::temp_dir().join("csv_loader_local_path_test.csv");
        std::fs::write(&path, "Region,Score\nA,10\nB,20\n").unwrap();

        let ds = tokio_test::block_on(load_dataset(path.to_str().unwrap())).unwrap();
        assert_eq!(ds.columns, vec!["region", "score"]);
        assert_eq!(ds.row_count(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_local_file_is_an_io_error() {
        let result = tokio_test::block_on(load_dataset("does/not/exist.csv"));
        assert!(matches!(result, Err(AppError::IoError(_))));
    }
}
