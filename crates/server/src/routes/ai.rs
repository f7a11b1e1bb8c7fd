use std::fmt::Write as _;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{LogEntry, Task},
    domain::schedule::conflicting_task_ids,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, ai::Material, records},
    AppState,
};

const CONTEXT_LOGS: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summarize", post(summarize))
        .route("/risks", post(risks))
        .route("/materials", post(materials))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RisksRequest {
    /// Free text to analyze. Appended to the project context when both are given.
    #[serde(default)]
    pub context: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaterialsRequest {
    pub csv: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<SummarizeRequest>,
) -> Result<Json<TextResponse>> {
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("Text is required".to_string()));
    }
    let text = state.ai.summarize_log(&body.text).await?;
    Ok(Json(TextResponse { text }))
}

async fn risks(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<RisksRequest>,
) -> Result<Json<TextResponse>> {
    let mut context = String::new();

    if let Some(project_id) = &body.project_id {
        let (project, _) = access::require_staff(&state.db.pool, project_id, &user).await?;
        let pool = &state.db.pool;
        let (tasks, logs) = tokio::try_join!(
            records::tasks_for_project(pool, project_id),
            records::recent_logs(pool, project_id, CONTEXT_LOGS),
        )?;
        context = project_context(&project.name, &tasks, &logs);
    }
    if !body.context.trim().is_empty() {
        context.push_str(body.context.trim());
    }
    if context.is_empty() {
        return Err(AppError::Validation(
            "Context or projectId is required".to_string(),
        ));
    }

    let text = state.ai.analyze_risks(&context).await?;
    Ok(Json(TextResponse { text }))
}

async fn materials(
    State(state): State<AppState>,
    Json(body): Json<MaterialsRequest>,
) -> Result<Json<Vec<Material>>> {
    if body.csv.trim().is_empty() {
        return Err(AppError::Validation("CSV content is required".to_string()));
    }
    Ok(Json(state.ai.extract_materials(&body.csv).await?))
}

/// Plain-text schedule and log digest fed to the risk prompt.
fn project_context(name: &str, tasks: &[Task], logs: &[LogEntry]) -> String {
    let conflicts = conflicting_task_ids(tasks);
    let mut out = format!("Obra: {name}\n");

    out.push_str("Cronograma:\n");
    for task in tasks {
        let _ = writeln!(
            out,
            "- {} ({} a {}): {}% [{}]{}",
            task.name,
            task.start_date,
            task.end_date,
            task.progress,
            task.status,
            if conflicts.contains(&task.id) {
                " CONFLITO"
            } else {
                ""
            }
        );
    }

    if !logs.is_empty() {
        out.push_str("Diário recente:\n");
        for log in logs {
            let _ = writeln!(out, "- [{}] {}", log.category, log.content);
        }
    }
    out
}
