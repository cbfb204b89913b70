use axum::{
    extract::{Path, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    services::{
        analysis::{
            classify_intent, execute,
            types::{IntentKind, NumericStats},
        },
        answerer::AnalysisContext,
        session::{ChatTurn, Role},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/chat/ask", post(ask_question))
        .route("/chat/:session_id/history", get(session_history))
        .route("/chat/:session_id/clear", post(clear_session))
        .route("/datasets", get(list_datasets))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    question: String,
    session_id: Option<String>,
    /// Dataset name; defaults to the first loaded dataset.
    dataset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    session_id: String,
    answer: String,
    cached: bool,
    intent: IntentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_analyzed: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ColumnAnalysis {
    name: String,
    data_type: String,
    sample_values: Vec<String>,
    non_null_count: usize,
    null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unique_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    name: String,
    row_count: usize,
    column_count: usize,
    columns: Vec<ColumnAnalysis>,
}

#[axum::debug_handler]
async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let start = std::time::Instant::now();

    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::InvalidInput("Question must not be empty".to_string()));
    }

    let entry = match &request.dataset {
        Some(name) => state
            .datasets
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown dataset: {}", name)))?,
        None => state
            .datasets
            .first()
            .ok_or_else(|| AppError::Internal("No datasets loaded".to_string()))?,
    };

    let session_id = request
        .session_id
        .unwrap_or_else(|| state.sessions.new_session_id());

    let intent = classify_intent(&question, &entry.profile);
    tracing::info!(
        dataset = %entry.name,
        kind = ?intent.kind,
        group_by = ?intent.group_by,
        targets = intent.targets.len(),
        "question classified"
    );

    if let Some(answer) = state.cache.get(&entry.name, &question) {
        tracing::info!("answer served from cache");
        state.sessions.append(&session_id, Role::User, question.clone());
        state.sessions.append(&session_id, Role::Model, answer.clone());
        return Ok(Json(AskResponse {
            session_id,
            answer,
            cached: true,
            intent: intent.kind,
            rows_analyzed: None,
        }));
    }

    let history = state.sessions.history(&session_id);

    let (answer, rows_analyzed) = match intent.kind {
        IntentKind::PassThrough => {
            let context = AnalysisContext::Sample {
                profile: &entry.profile,
                dataset: &entry.dataset,
            };
            let answer = state
                .answerer
                .answer(&question, &history, &entry.name, &context)
                .await?;
            (answer, None)
        }
        IntentKind::DirectAggregation | IntentKind::GroupedAggregation => {
            let result = execute(&entry.dataset, &intent);
            let rows = result.rows_analyzed();
            let context = AnalysisContext::Exact(&result);
            let answer = state
                .answerer
                .answer(&question, &history, &entry.name, &context)
                .await?;
            (answer, Some(rows))
        }
    };

    state.cache.insert(&entry.name, &question, answer.clone());
    state.sessions.append(&session_id, Role::User, question);
    state.sessions.append(&session_id, Role::Model, answer.clone());

    tracing::info!(elapsed = ?start.elapsed(), "question answered");

    Ok(Json(AskResponse {
        session_id,
        answer,
        cached: false,
        intent: intent.kind,
        rows_analyzed,
    }))
}

async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Vec<ChatTurn>> {
    Json(state.sessions.history(&session_id))
}

async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    let cleared = state.sessions.clear(&session_id);
    Json(json!({ "cleared": cleared }))
}

async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<Vec<DatasetSummary>> {
    let summaries = state
        .datasets
        .iter()
        .map(|entry| DatasetSummary {
            name: entry.name.clone(),
            row_count: entry.profile.row_count,
            column_count: entry.profile.column_count,
            columns: entry
                .profile
                .column_names
                .iter()
                .filter_map(|name| {
                    entry.profile.column(name).map(|p| ColumnAnalysis {
                        name: name.clone(),
                        data_type: p.column_type.to_string(),
                        sample_values: p.sample_values.to_vec(),
                        non_null_count: p.non_null_count,
                        null_count: p.null_count,
                        numeric: p.numeric.clone(),
                        unique_count: p.categories.as_ref().map(|c| c.unique_value_count),
                    })
                })
                .collect(),
        })
        .collect();
    Json(summaries)
}
