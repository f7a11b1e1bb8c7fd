use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::LogEntry,
        rows::{map_rows, LogEntryRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::access,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/logs", get(list_logs).post(create_log))
        .route("/:id/logs/:log_id", delete(delete_log))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub category: String,
    pub content: String,
}

async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntry>>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let rows = sqlx::query_as::<_, LogEntryRow>(
        r#"
        SELECT l.id, l.project_id, l.author_id, u.name AS author_name, l.category, l.content, l.created_at
        FROM project_logs l
        JOIN users u ON l.author_id = u.id
        WHERE l.project_id = ? AND (? IS NULL OR l.category = ?)
        ORDER BY l.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(&id)
    .bind(&query.category)
    .bind(&query.category)
    .bind(query.limit.unwrap_or(100).clamp(1, 500))
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(map_rows(rows)?))
}

async fn create_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CreateLogRequest>,
) -> Result<Json<LogEntry>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Log content is required".to_string()));
    }
    if body.category.trim().is_empty() {
        return Err(AppError::Validation("Log category is required".to_string()));
    }

    let entry = LogEntry {
        id: Uuid::new_v4().to_string(),
        project_id: id,
        author_id: user.id,
        author_name: user.name,
        category: body.category.trim().to_string(),
        content: body.content,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO project_logs (id, project_id, author_id, category, content, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(&entry.project_id)
    .bind(&entry.author_id)
    .bind(&entry.category)
    .bind(&entry.content)
    .bind(entry.created_at.to_rfc3339())
    .execute(&state.db.pool)
    .await?;

    Ok(Json(entry))
}

async fn delete_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, log_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;

    let author_id = sqlx::query_scalar::<_, String>(
        "SELECT author_id FROM project_logs WHERE id = ? AND project_id = ?",
    )
    .bind(&log_id)
    .bind(&id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Log entry not found".to_string()))?;

    // Only author or project owner can delete
    if author_id != user.id && project.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Cannot delete this log entry".to_string(),
        ));
    }

    sqlx::query("DELETE FROM project_logs WHERE id = ?")
        .bind(&log_id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(()))
}
