use super::types::*;
use once_cell::sync::Lazy;
use regex::Regex;

static GROUPING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:by each|for each|per\s|group(?:ed)? by|across\b|by category|categoriz|segment)")
        .unwrap()
});
static AVERAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:average|avg|mean)\b").unwrap());
static SUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:sum|total)\b").unwrap());
static COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:count|how many|number of)\b").unwrap());
static MIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:min|minimum|lowest|smallest)\b").unwrap());
static MAX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:max|maximum|highest|largest)\b").unwrap());

/// Terms that mark a column as score-like, both in questions and column names.
const SCORE_TERMS: [&str; 5] = ["score", "rating", "grade", "mark", "point"];

/// Domain-term synonym groups for grouping columns. A question mentioning any
/// term in a group matches columns whose name contains any term of the same
/// group. Checked in order; first match wins.
const GROUP_SYNONYMS: &[&[&str]] = &[
    &["team", "squad"],
    &["region", "geo", "territory", "location", "market"],
    &["category", "class", "type"],
    &["vertical", "industry", "sector"],
    &["division", "department", "unit"],
    &["segment", "tier"],
    &["channel", "medium"],
];

/// Classify a question against a dataset profile.
///
/// Keyword membership tests over the lower-cased question, no model calls.
/// Deterministic: identical question text and profile always produce the
/// same intent, which the answer cache relies on.
pub fn classify_intent(question: &str, profile: &DatasetProfile) -> QueryIntent {
    let q = question.to_lowercase();

    let grouping_requested = GROUPING_RE.is_match(&q) || mentions_by_phrase(&q, profile);
    let operations = Operations {
        average: AVERAGE_RE.is_match(&q),
        sum: SUM_RE.is_match(&q),
        count: COUNT_RE.is_match(&q),
        min: MIN_RE.is_match(&q),
        max: MAX_RE.is_match(&q),
    };

    if !grouping_requested && !operations.any() {
        return QueryIntent::pass_through();
    }

    let group_by = if grouping_requested {
        resolve_group_column(&q, profile)
    } else {
        None
    };

    if group_by.is_none() && !operations.any() {
        // Grouping was requested but no usable grouping column exists and no
        // operation was asked for, so there is nothing exact to compute.
        tracing::warn!("grouping requested but unresolvable; falling back to pass-through");
        return QueryIntent::pass_through();
    }

    // Without an operation there is nothing to compute per target; the groups
    // still carry their row counts.
    let targets = if operations.any() {
        resolve_target_columns(&q, profile, group_by.as_deref())
    } else {
        Vec::new()
    };

    let kind = if group_by.is_some() {
        IntentKind::GroupedAggregation
    } else {
        IntentKind::DirectAggregation
    };

    QueryIntent {
        kind,
        operations,
        group_by,
        targets,
    }
}

/// "by <column>" or "by <domain term>" also signals a per-category breakdown,
/// e.g. "average score by team".
fn mentions_by_phrase(question: &str, profile: &DatasetProfile) -> bool {
    profile
        .columns_of_type(ColumnType::String)
        .any(|name| question.contains(&format!("by {}", name.to_lowercase())))
        || GROUP_SYNONYMS
            .iter()
            .flat_map(|group| group.iter())
            .any(|term| question.contains(&format!("by {}", term)))
}

fn eligible_group_column(profile: &DatasetProfile, name: &str) -> bool {
    profile
        .column(name)
        .and_then(|p| p.categories.as_ref())
        .map(|c| c.unique_value_count > 1 && c.unique_value_count <= MAX_GROUP_CARDINALITY)
        .unwrap_or(false)
}

/// Grouping column resolution, in order: a directly mentioned string column
/// within the cardinality bound, then the synonym table, then the first
/// eligible string column. `None` abandons grouping (defined degradation).
fn resolve_group_column(question: &str, profile: &DatasetProfile) -> Option<String> {
    let mentioned = profile
        .columns_of_type(ColumnType::String)
        .find(|name| question.contains(&name.to_lowercase()) && eligible_group_column(profile, name));
    if let Some(name) = mentioned {
        return Some(name.clone());
    }

    for group in GROUP_SYNONYMS {
        if !group.iter().any(|term| question.contains(term)) {
            continue;
        }
        let matched = profile.columns_of_type(ColumnType::String).find(|name| {
            let lower = name.to_lowercase();
            group.iter().any(|term| lower.contains(term)) && eligible_group_column(profile, name)
        });
        if let Some(name) = matched {
            return Some(name.clone());
        }
    }

    let fallback = profile
        .columns_of_type(ColumnType::String)
        .find(|name| eligible_group_column(profile, name));
    match fallback {
        Some(name) => {
            tracing::warn!(column = %name, "no grouping column matched; using first eligible string column");
            Some(name.clone())
        }
        None => {
            tracing::warn!("no string column within cardinality bound; grouping abandoned");
            None
        }
    }
}

/// Target column resolution, in order: directly mentioned numeric columns
/// (excluding the grouping column), score-like numeric columns, then all
/// numeric columns.
fn resolve_target_columns(
    question: &str,
    profile: &DatasetProfile,
    group_by: Option<&str>,
) -> Vec<String> {
    let numeric = |exclude_group: bool| {
        profile
            .columns_of_type(ColumnType::Number)
            .filter(move |name| !exclude_group || Some(name.as_str()) != group_by)
    };

    let mentioned: Vec<String> = numeric(true)
        .filter(|name| question.contains(&name.to_lowercase()))
        .cloned()
        .collect();
    if !mentioned.is_empty() {
        return mentioned;
    }

    if SCORE_TERMS.iter().any(|t| question.contains(t)) {
        let score_like: Vec<String> = numeric(true)
            .filter(|name| {
                let lower = name.to_lowercase();
                SCORE_TERMS.iter().any(|t| lower.contains(t))
            })
            .cloned()
            .collect();
        if !score_like.is_empty() {
            return score_like;
        }
    }

    let all: Vec<String> = numeric(true).cloned().collect();
    if all.is_empty() {
        tracing::warn!("no numeric column available as aggregation target");
    } else {
        tracing::warn!("no target column matched; using all numeric columns");
    }
    all
}
