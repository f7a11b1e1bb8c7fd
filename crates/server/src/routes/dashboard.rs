use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{LogEntry, Project, ProjectDocument, ProjectPhoto, TaskStatus},
    domain::{
        insights::{self, MonthWindow, MonthlyInsight},
        progress::{self, BuildingProgress, UnitPhaseProgress},
        schedule::conflicting_task_ids,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, records},
    AppState,
};

const RECENT_LOGS: i64 = 10;
const RECENT_PHOTOS: i64 = 12;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/dashboard", get(dashboard))
        .route("/:id/customer-dashboard", get(customer_dashboard))
        .route("/:id/insights", get(monthly_insight))
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
    pub conflicts: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub project: Project,
    pub building: BuildingProgress,
    pub tasks: TaskStats,
    pub recent_logs: Vec<LogEntry>,
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DashboardResponse>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;
    let pool = &state.db.pool;

    let (logs, rows, tasks) = tokio::join!(
        records::recent_logs(pool, &id, RECENT_LOGS),
        records::unit_progress_for_project(pool, &id),
        records::tasks_for_project(pool, &id),
    );
    let recent_logs = records::or_empty("logs", logs);
    let rows = records::or_empty("unit_progress", rows);
    let tasks = records::or_empty("tasks", tasks);

    let mut stats = TaskStats {
        total: tasks.len(),
        conflicts: conflicting_task_ids(&tasks).len(),
        ..Default::default()
    };
    for task in &tasks {
        match task.status {
            TaskStatus::NotStarted => stats.not_started += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Delayed => stats.delayed += 1,
        }
    }

    let building = progress::aggregate(&project.structure, &project.phases, &rows);

    Ok(Json(DashboardResponse {
        project,
        building,
        tasks: stats,
        recent_logs,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboardResponse {
    pub project: Project,
    pub building: BuildingProgress,
    pub units: Vec<UnitPhaseProgress>,
    pub photos: Vec<ProjectPhoto>,
    pub documents: Vec<ProjectDocument>,
}

/// Read-only view for clients and architects, limited to what they may see.
async fn customer_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CustomerDashboardResponse>> {
    let (project, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    let pool = &state.db.pool;

    let (rows, photos, documents) = tokio::join!(
        records::unit_progress_for_project(pool, &id),
        records::recent_photos(pool, &id, RECENT_PHOTOS),
        records::documents_for_project(pool, &id),
    );
    let rows = records::or_empty("unit_progress", rows);

    let unit_ids: Vec<String> = if access.is_staff() {
        project.structure.units().map(|u| u.id.clone()).collect()
    } else {
        access.unit_ids.clone()
    };

    let building = progress::aggregate(&project.structure, &project.phases, &rows);
    let units = progress::unit_breakdown(&unit_ids, &project.phases, &rows);
    let photos = records::or_empty("photos", photos)
        .into_iter()
        .filter(|p| access.can_see_tag(p.location.as_deref()))
        .collect();
    let documents = records::or_empty("documents", documents)
        .into_iter()
        .filter(|d| access.can_see_tag(Some(&d.category)))
        .collect();

    Ok(Json(CustomerDashboardResponse {
        project,
        building,
        units,
        photos,
        documents,
    }))
}

#[derive(Debug, Deserialize)]
pub struct InsightQuery {
    pub year: i32,
    pub month: u32,
}

async fn monthly_insight(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<InsightQuery>,
) -> Result<Json<MonthlyInsight>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    let window = MonthWindow::new(query.year, query.month)
        .ok_or_else(|| AppError::Validation("Invalid month".to_string()))?;
    let pool = &state.db.pool;

    // Any failed fetch fails the whole digest
    let (reports, tasks, photos) = tokio::try_join!(
        records::reports_between(pool, &id, window.start, window.end),
        records::tasks_for_project(pool, &id),
        records::photos_between(pool, &id, window.start, window.end),
    )?;

    Ok(Json(insights::build(&window, &reports, &tasks, &photos)))
}
