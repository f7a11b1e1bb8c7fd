use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{
        models::{Subtask, Task, UnitProgress},
        rows::UnitProgressRow,
    },
    error::Result,
};

/// Writes the row for (project, unit, phase), replacing any existing one.
pub async fn upsert(
    pool: &SqlitePool,
    project_id: &str,
    unit_id: &str,
    phase_id: &str,
    percentage: f64,
    subtasks: Vec<Subtask>,
) -> Result<UnitProgress> {
    let progress = UnitProgress {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        unit_id: unit_id.to_string(),
        phase_id: phase_id.to_string(),
        percentage: percentage.clamp(0.0, 100.0),
        subtasks,
        updated_at: Utc::now(),
    };
    let row = UnitProgressRow::from(&progress);

    let stored = sqlx::query_as::<_, UnitProgressRow>(
        r#"
        INSERT INTO unit_progress (id, project_id, unit_id, phase_id, percentage, subtasks, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (project_id, unit_id, phase_id) DO UPDATE SET
            percentage = excluded.percentage,
            subtasks = excluded.subtasks,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.unit_id)
    .bind(&row.phase_id)
    .bind(row.percentage)
    .bind(&row.subtasks)
    .bind(&row.updated_at)
    .fetch_one(pool)
    .await?;

    UnitProgress::try_from(stored)
}

/// Mirrors a linked task into its unit progress row. Failures are logged and
/// never undo the task write that triggered them.
///
/// Only the task's current unit and phase are written. Relinking or unlinking
/// leaves the previous row at its last percentage, since staff may also edit
/// that row directly.
pub async fn sync_from_task(pool: &SqlitePool, task: &Task) {
    let (Some(unit_id), Some(phase_id)) = (task.unit_id.as_deref(), task.phase_id.as_deref()) else {
        return;
    };

    let result = upsert(
        pool,
        &task.project_id,
        unit_id,
        phase_id,
        f64::from(task.progress),
        task.subtasks.clone(),
    )
    .await;

    match result {
        Ok(_) => tracing::debug!(task_id = %task.id, %unit_id, %phase_id, "unit progress synced"),
        Err(e) => tracing::warn!(
            task_id = %task.id,
            %unit_id,
            %phase_id,
            error = %e,
            "failed to sync unit progress from task"
        ),
    }
}
