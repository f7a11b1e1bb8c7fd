//! Project-scoped reads shared by several routes.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::{
    db::{
        models::{DailyReport, LogEntry, ProjectDocument, ProjectPhoto, Task, UnitProgress},
        rows::{
            format_date, map_rows, DailyReportRow, LogEntryRow, ProjectDocumentRow,
            ProjectPhotoRow, TaskRow, UnitProgressRow,
        },
    },
    error::Result,
};

pub async fn tasks_for_project(pool: &SqlitePool, project_id: &str) -> Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, TaskRow>(
        "SELECT * FROM tasks WHERE project_id = ? ORDER BY start_date ASC, name ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn unit_progress_for_project(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<UnitProgress>> {
    let rows = sqlx::query_as::<_, UnitProgressRow>(
        "SELECT * FROM unit_progress WHERE project_id = ? ORDER BY unit_id ASC, phase_id ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn recent_logs(pool: &SqlitePool, project_id: &str, limit: i64) -> Result<Vec<LogEntry>> {
    let rows = sqlx::query_as::<_, LogEntryRow>(
        r#"
        SELECT l.id, l.project_id, l.author_id, u.name AS author_name, l.category, l.content, l.created_at
        FROM project_logs l
        JOIN users u ON l.author_id = u.id
        WHERE l.project_id = ?
        ORDER BY l.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn reports_between(
    pool: &SqlitePool,
    project_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyReport>> {
    let rows = sqlx::query_as::<_, DailyReportRow>(
        r#"
        SELECT * FROM daily_reports
        WHERE project_id = ? AND report_date >= ? AND report_date <= ?
        ORDER BY report_date ASC
        "#,
    )
    .bind(project_id)
    .bind(format_date(from))
    .bind(format_date(to))
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn photos_between(
    pool: &SqlitePool,
    project_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ProjectPhoto>> {
    let rows = sqlx::query_as::<_, ProjectPhotoRow>(
        r#"
        SELECT * FROM project_photos
        WHERE project_id = ? AND taken_on >= ? AND taken_on <= ?
        ORDER BY taken_on ASC, created_at ASC
        "#,
    )
    .bind(project_id)
    .bind(format_date(from))
    .bind(format_date(to))
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn recent_photos(pool: &SqlitePool, project_id: &str, limit: i64) -> Result<Vec<ProjectPhoto>> {
    let rows = sqlx::query_as::<_, ProjectPhotoRow>(
        "SELECT * FROM project_photos WHERE project_id = ? ORDER BY taken_on DESC, created_at DESC LIMIT ?",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

pub async fn documents_for_project(pool: &SqlitePool, project_id: &str) -> Result<Vec<ProjectDocument>> {
    let rows = sqlx::query_as::<_, ProjectDocumentRow>(
        "SELECT * FROM project_documents WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

/// Logs a failed dashboard read and substitutes an empty section.
pub fn or_empty<T>(section: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(section, error = %e, "dashboard section failed to load");
        Vec::new()
    })
}
