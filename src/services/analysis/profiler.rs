use super::types::*;
use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::BTreeMap;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

pub fn is_date_string(s: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

fn is_date_like(value: &Value) -> bool {
    match value {
        Value::Text(s) => is_date_string(s),
        _ => false,
    }
}

/// Classify one column and compute its summary statistics.
///
/// Uniformity check over the non-null subset, first match wins:
/// number, then boolean, then date, then string. An empty non-null
/// subset yields `unknown` with no further statistics.
pub fn infer_column<'a, I>(values: I) -> ColumnProfile
where
    I: IntoIterator<Item = &'a Value>,
{
    let values: Vec<&Value> = values.into_iter().collect();
    let total = values.len();
    let non_null: Vec<&Value> = values.into_iter().filter(|v| !v.is_missing()).collect();

    let sample_values: SmallVec<[String; SAMPLE_SIZE]> = non_null
        .iter()
        .take(SAMPLE_SIZE)
        .map(|v| v.to_string())
        .collect();

    let column_type = if non_null.is_empty() {
        ColumnType::Unknown
    } else if non_null.iter().all(|v| v.as_number().is_some()) {
        ColumnType::Number
    } else if non_null.iter().all(|v| v.is_boolean_like()) {
        ColumnType::Boolean
    } else if non_null.iter().all(|v| is_date_like(v)) {
        ColumnType::Date
    } else {
        ColumnType::String
    };

    let numeric = match column_type {
        ColumnType::Number => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_number()).collect();
            let min = nums.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            Some(NumericStats { min, max, mean })
        }
        _ => None,
    };

    let categories = match column_type {
        ColumnType::String => {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for v in &non_null {
                *counts.entry(v.to_string()).or_insert(0) += 1;
            }
            let unique_value_count = counts.len();
            Some(CategoryStats {
                unique_value_count,
                value_counts: (unique_value_count <= MAX_CATEGORY_VALUES).then_some(counts),
            })
        }
        _ => None,
    };

    ColumnProfile {
        column_type,
        non_null_count: non_null.len(),
        null_count: total - non_null.len(),
        sample_values,
        numeric,
        categories,
    }
}

/// Profile every column of a dataset. Pure over its input; returns `None`
/// for a dataset with no rows, since no column set can be derived.
pub fn build_profile(dataset: &Dataset) -> Option<DatasetProfile> {
    if dataset.rows.is_empty() {
        return None;
    }

    let start = std::time::Instant::now();
    let columns: BTreeMap<String, ColumnProfile> = dataset
        .columns
        .par_iter()
        .map(|name| (name.clone(), infer_column(dataset.column_values(name))))
        .collect();

    tracing::debug!(
        rows = dataset.row_count(),
        columns = dataset.columns.len(),
        elapsed = ?start.elapsed(),
        "dataset profiled"
    );

    Some(DatasetProfile {
        row_count: dataset.row_count(),
        column_count: dataset.columns.len(),
        column_names: dataset.columns.clone(),
        columns,
    })
}
