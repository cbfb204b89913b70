use crate::clients::GeminiClient;
use crate::error::AppError;
use crate::services::analysis::types::{AggregationResult, Dataset, DatasetProfile};
use crate::services::session::ChatTurn;
use serde_json::json;

const PASS_THROUGH_SAMPLE_ROWS: usize = 5;

/// What the phrasing step gets to see: either exact, locally computed
/// aggregates, or a profile plus a small sample for open-ended questions.
pub enum AnalysisContext<'a> {
    Exact(&'a AggregationResult),
    Sample {
        profile: &'a DatasetProfile,
        dataset: &'a Dataset,
    },
}

/// Turns analysis output into user-facing prose via Gemini. The analysis core
/// never talks to the model; this is the only place that does.
pub struct Answerer {
    client: GeminiClient,
}

impl Answerer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub async fn answer(
        &self,
        question: &str,
        history: &[ChatTurn],
        dataset_name: &str,
        context: &AnalysisContext<'_>,
    ) -> Result<String, AppError> {
        let prompt = build_prompt(question, dataset_name, context);
        self.client
            .generate(system_instruction(), history, &prompt)
            .await
    }
}

fn system_instruction() -> &'static str {
    "You are a helpful data analysis assistant. You answer questions about \
     tabular datasets. Only use the data context provided with each question; \
     do not invent numbers. When exact computed statistics are included, \
     present those values as-is and mention that they were computed over the \
     full dataset. Present results in a clear, organized, non-code-formatted way."
}

pub fn build_prompt(question: &str, dataset_name: &str, context: &AnalysisContext<'_>) -> String {
    match context {
        AnalysisContext::Exact(result) => {
            let stats = serde_json::to_string_pretty(result)
                .unwrap_or_else(|_| "{}".to_string());
            format!(
                "Question: {question}\n\n\
                 The following statistics were computed locally over all {rows} rows \
                 of the dataset \"{dataset_name}\" (not a sample):\n{stats}\n\n\
                 Phrase an answer to the question using exactly these numbers.",
                rows = result.rows_analyzed(),
            )
        }
        AnalysisContext::Sample { profile, dataset } => {
            let summary = serde_json::to_string_pretty(profile)
                .unwrap_or_else(|_| "{}".to_string());
            let sample = sample_rows(dataset, PASS_THROUGH_SAMPLE_ROWS);
            format!(
                "Question: {question}\n\n\
                 Statistical profile of the dataset \"{dataset_name}\" \
                 ({rows} rows, {cols} columns):\n{summary}\n\n\
                 First rows as a sample:\n{sample}\n\n\
                 Answer the question from the profile and sample above.",
                rows = profile.row_count,
                cols = profile.column_count,
            )
        }
    }
}

fn sample_rows(dataset: &Dataset, limit: usize) -> String {
    let rows: Vec<serde_json::Value> = dataset
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            let obj: serde_json::Map<String, serde_json::Value> = dataset
                .columns
                .iter()
                .map(|col| {
                    let value = row
                        .get(col)
                        .map(|v| json!(v.to_string()))
                        .unwrap_or(serde_json::Value::Null);
                    (col.clone(), value)
                })
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}
