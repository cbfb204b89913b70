use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Sample values kept per column profile.
pub const SAMPLE_SIZE: usize = 5;
/// Category value counts are only materialized up to this many distinct values.
pub const MAX_CATEGORY_VALUES: usize = 50;
/// A column only qualifies as a grouping key below this cardinality.
pub const MAX_GROUP_CARDINALITY: usize = 100;

const NULL_VALUE: Value = Value::Null;

/// A single cell. CSV input arrives as text; JSON input may be pre-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Null, or an empty string, counts as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion: a cell is numeric only if it is a finite number or
    /// parses fully as a decimal literal. No partial parses, no booleans.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_boolean_like(&self) -> bool {
        match self {
            Value::Bool(_) => true,
            Value::Text(s) => s == "true" || s == "false",
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// In-memory tabular data. Column order comes from the source header; rows
/// missing a column are tolerated and read as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, Value>>,
}

impl Dataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row_idx: usize, column: &str) -> &Value {
        self.rows
            .get(row_idx)
            .and_then(|row| row.get(column))
            .unwrap_or(&NULL_VALUE)
    }

    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&NULL_VALUE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Boolean,
    Date,
    String,
    Unknown,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::String => "string",
            ColumnType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub unique_value_count: usize,
    /// Present only when the distinct count stays within MAX_CATEGORY_VALUES.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_counts: Option<BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column_type: ColumnType,
    pub non_null_count: usize,
    pub null_count: usize,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategoryStats>,
}

/// Read-only statistical summary of one dataset. Built once per load and
/// treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub column_names: Vec<String>,
    pub columns: BTreeMap<String, ColumnProfile>,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    /// Column names of the given type, in source column order.
    pub fn columns_of_type(&self, ty: ColumnType) -> impl Iterator<Item = &String> {
        self.column_names
            .iter()
            .filter(move |name| self.columns.get(*name).map(|p| p.column_type) == Some(ty))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    GroupedAggregation,
    DirectAggregation,
    PassThrough,
}

/// Statistical operations a question may request. Independent flags; a
/// question can ask for several at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operations {
    pub average: bool,
    pub sum: bool,
    pub count: bool,
    pub min: bool,
    pub max: bool,
}

impl Operations {
    pub fn any(&self) -> bool {
        self.average || self.sum || self.count || self.min || self.max
    }
}

/// Classification of one question against one profile. Ephemeral, recomputed
/// per question, deterministic for identical inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub kind: IntentKind,
    pub operations: Operations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub targets: Vec<String>,
}

impl QueryIntent {
    pub fn pass_through() -> Self {
        Self {
            kind: IntentKind::PassThrough,
            operations: Operations::default(),
            group_by: None,
            targets: Vec::new(),
        }
    }
}

/// Per-target results; only the requested operations are populated. A target
/// with no coercible values is omitted from the result entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAggregates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAggregate {
    pub column: String,
    #[serde(flatten)]
    pub stats: ColumnAggregates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub key: String,
    pub count: usize,
    pub targets: Vec<TargetAggregate>,
}

/// Exact aggregation output. `rows_analyzed` is always the full row count of
/// the input dataset, so the phrasing step can assert no sampling happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationResult {
    Direct {
        rows_analyzed: usize,
        targets: Vec<TargetAggregate>,
    },
    Grouped {
        rows_analyzed: usize,
        group_by: String,
        /// Groups appear in first-encounter order of the grouping value.
        groups: Vec<GroupAggregate>,
    },
}

impl AggregationResult {
    pub fn rows_analyzed(&self) -> usize {
        match self {
            AggregationResult::Direct { rows_analyzed, .. }
            | AggregationResult::Grouped { rows_analyzed, .. } => *rows_analyzed,
        }
    }
}
