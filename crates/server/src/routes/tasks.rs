use std::collections::{BTreeMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{
        models::{Project, Subtask, Task, TaskStatus, Weather},
        rows::{format_date, TaskRow},
    },
    domain::schedule::{
        calendar_month, conflicting_task_ids, is_weekend, validate_dependencies, validate_range,
        GanttBar, GanttWindow, TimelineScale,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, records, unit_progress},
    AppState,
};

const GANTT_PADDING_DAYS: i64 = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/tasks", get(list_tasks).post(create_task))
        .route("/:id/tasks/:task_id", put(update_task).delete(delete_task))
        .route("/:id/gantt", get(gantt))
        .route("/:id/calendar", get(calendar))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub progress: u8,
    pub unit_id: Option<String>,
    pub phase_id: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: Option<u8>,
    /// Only honored when `progress` is absent. Accepts `DELAYED` or the
    /// status the stored progress implies.
    pub status: Option<TaskStatus>,
    pub unit_id: Option<String>,
    pub phase_id: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub subtasks: Option<Vec<Subtask>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub conflict: bool,
}

fn validate_links(project: &Project, task: &Task, project_task_ids: &HashSet<String>) -> Result<()> {
    if task.name.trim().is_empty() {
        return Err(AppError::Validation("Task name is required".to_string()));
    }
    if task.progress > 100 {
        return Err(AppError::Validation(
            "Progress must be between 0 and 100".to_string(),
        ));
    }
    validate_range(task.start_date, task.end_date)?;

    if let Some(unit_id) = &task.unit_id {
        if project.structure.find_unit(unit_id).is_none() {
            return Err(AppError::Validation(format!(
                "Unit {unit_id} does not exist in this project"
            )));
        }
    }
    if let Some(phase_id) = &task.phase_id {
        if !project.phases.iter().any(|p| &p.id == phase_id) {
            return Err(AppError::Validation(format!(
                "Phase {phase_id} does not exist in this project"
            )));
        }
    }
    validate_dependencies(&task.id, &task.dependencies, project_task_ids)
}

async fn write_task(pool: &sqlx::SqlitePool, task: &Task) -> Result<()> {
    let row = TaskRow::from(task);
    sqlx::query(
        r#"
        INSERT INTO tasks (id, project_id, name, start_date, end_date, progress, status, unit_id,
                           phase_id, dependencies, subtasks, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            progress = excluded.progress,
            status = excluded.status,
            unit_id = excluded.unit_id,
            phase_id = excluded.phase_id,
            dependencies = excluded.dependencies,
            subtasks = excluded.subtasks,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.name)
    .bind(&row.start_date)
    .bind(&row.end_date)
    .bind(row.progress)
    .bind(&row.status)
    .bind(&row.unit_id)
    .bind(&row.phase_id)
    .bind(&row.dependencies)
    .bind(&row.subtasks)
    .bind(&row.created_at)
    .bind(&row.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskView>>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    let tasks = records::tasks_for_project(&state.db.pool, &id).await?;
    let conflicts = conflicting_task_ids(&tasks);

    let views = tasks
        .into_iter()
        .filter(|t| access.can_see_tag(t.unit_id.as_deref()))
        .map(|task| TaskView {
            conflict: conflicts.contains(&task.id),
            task,
        })
        .collect();

    Ok(Json(views))
}

async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<TaskView>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;
    let existing = records::tasks_for_project(&state.db.pool, &id).await?;
    let existing_ids: HashSet<String> = existing.iter().map(|t| t.id.clone()).collect();

    let now = Utc::now();
    let mut task = Task {
        id: Uuid::new_v4().to_string(),
        project_id: id.clone(),
        name: body.name.trim().to_string(),
        start_date: body.start_date,
        end_date: body.end_date,
        progress: 0,
        status: TaskStatus::NotStarted,
        unit_id: body.unit_id,
        phase_id: body.phase_id,
        dependencies: body.dependencies,
        subtasks: body.subtasks,
        created_at: now,
        updated_at: now,
    };
    if body.progress > 100 {
        return Err(AppError::Validation(
            "Progress must be between 0 and 100".to_string(),
        ));
    }
    task.set_progress(body.progress);
    validate_links(&project, &task, &existing_ids)?;

    write_task(&state.db.pool, &task).await?;
    unit_progress::sync_from_task(&state.db.pool, &task).await;

    let mut all = existing;
    all.push(task.clone());
    let conflict = conflicting_task_ids(&all).contains(&task.id);

    Ok(Json(TaskView { task, conflict }))
}

async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, task_id)): Path<(String, String)>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskView>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;
    let tasks = records::tasks_for_project(&state.db.pool, &id).await?;
    let mut task = tasks
        .iter()
        .find(|t| t.id == task_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    if let Some(name) = body.name {
        task.name = name.trim().to_string();
    }
    if let Some(start) = body.start_date {
        task.start_date = start;
    }
    if let Some(end) = body.end_date {
        task.end_date = end;
    }
    if let Some(unit_id) = body.unit_id {
        task.unit_id = Some(unit_id).filter(|u| !u.is_empty());
    }
    if let Some(phase_id) = body.phase_id {
        task.phase_id = Some(phase_id).filter(|p| !p.is_empty());
    }
    if let Some(dependencies) = body.dependencies {
        task.dependencies = dependencies;
    }
    if let Some(subtasks) = body.subtasks {
        task.subtasks = subtasks;
    }
    match (body.progress, body.status) {
        (Some(progress), _) => {
            if progress > 100 {
                return Err(AppError::Validation(
                    "Progress must be between 0 and 100".to_string(),
                ));
            }
            task.set_progress(progress);
        }
        (None, Some(status)) => {
            if !task.set_status(status) {
                return Err(AppError::Validation(format!(
                    "Status {} does not match progress {}",
                    status.as_str(),
                    task.progress
                )));
            }
        }
        (None, None) => {}
    }

    let ids: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    validate_links(&project, &task, &ids)?;

    task.updated_at = Utc::now();
    write_task(&state.db.pool, &task).await?;

    // The task write stands even if the mirror fails
    unit_progress::sync_from_task(&state.db.pool, &task).await;

    let all: Vec<Task> = tasks
        .into_iter()
        .map(|t| if t.id == task.id { task.clone() } else { t })
        .collect();
    let conflict = conflicting_task_ids(&all).contains(&task.id);

    Ok(Json(TaskView { task, conflict }))
}

async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let deleted = sqlx::query("DELETE FROM tasks WHERE id = ? AND project_id = ?")
        .bind(&task_id)
        .bind(&id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    // Drop the deleted task from successors' dependency lists
    let tasks = records::tasks_for_project(&state.db.pool, &id).await?;
    for mut task in tasks.into_iter().filter(|t| t.dependencies.contains(&task_id)) {
        task.dependencies.retain(|d| d != &task_id);
        task.updated_at = Utc::now();
        write_task(&state.db.pool, &task).await?;
    }

    Ok(Json(()))
}

#[derive(Debug, Deserialize)]
pub struct GanttQuery {
    #[serde(default)]
    pub scale: TimelineScale,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttResponse {
    pub window: Option<GanttWindow>,
    pub columns: Vec<NaiveDate>,
    pub tasks: Vec<Task>,
    pub bars: Vec<GanttBar>,
}

async fn gantt(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<GanttQuery>,
) -> Result<Json<GanttResponse>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    let tasks: Vec<Task> = records::tasks_for_project(&state.db.pool, &id)
        .await?
        .into_iter()
        .filter(|t| access.can_see_tag(t.unit_id.as_deref()))
        .collect();

    let conflicts = conflicting_task_ids(&tasks);
    let window = GanttWindow::for_tasks(&tasks, GANTT_PADDING_DAYS);
    let (columns, bars) = match &window {
        Some(window) => (
            window.columns(query.scale),
            tasks
                .iter()
                .map(|t| window.bar(t, conflicts.contains(&t.id)))
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    Ok(Json(GanttResponse {
        window,
        columns,
        tasks,
        bars,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub report_id: String,
    pub weather: Weather,
    pub workforce: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub weeks: Vec<[Option<NaiveDate>; 7]>,
    pub reports: BTreeMap<String, CalendarDay>,
    /// Past weekdays with no report filed.
    pub missing_reports: Vec<NaiveDate>,
}

async fn calendar(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let weeks = calendar_month(query.year, query.month)
        .ok_or_else(|| AppError::Validation("Invalid month".to_string()))?;
    let first = weeks
        .iter()
        .flatten()
        .flatten()
        .next()
        .copied()
        .ok_or_else(|| AppError::Validation("Invalid month".to_string()))?;
    let last = weeks
        .iter()
        .flatten()
        .flatten()
        .last()
        .copied()
        .unwrap_or(first);

    let reports: BTreeMap<String, CalendarDay> = records::reports_between(&state.db.pool, &id, first, last)
        .await?
        .into_iter()
        .map(|r| {
            (
                format_date(r.report_date),
                CalendarDay {
                    report_id: r.id,
                    weather: r.weather,
                    workforce: r.workforce,
                },
            )
        })
        .collect();

    let today = Utc::now().date_naive();
    let missing_reports = weeks
        .iter()
        .flatten()
        .flatten()
        .copied()
        .filter(|d| *d < today && !is_weekend(*d) && !reports.contains_key(&format_date(*d)))
        .collect();

    Ok(Json(CalendarResponse {
        weeks,
        reports,
        missing_reports,
    }))
}
