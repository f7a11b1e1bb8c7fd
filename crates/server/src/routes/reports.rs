use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::{DailyReport, TaskSnapshot, Weather},
        rows::{format_date, DailyReportRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, records},
    AppState,
};

/// Default listing window when no range is given.
const DEFAULT_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/reports", get(list_reports).post(save_report))
        .route(
            "/:id/reports/:report_id",
            get(get_report).delete(delete_report),
        )
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReportRequest {
    pub report_date: NaiveDate,
    pub weather: String,
    pub workforce: u32,
    /// Taken from the current schedule when omitted.
    pub tasks_snapshot: Option<Vec<TaskSnapshot>>,
    #[serde(default)]
    pub observations: String,
}

async fn list_reports(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<Vec<DailyReport>>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let to = query.to.unwrap_or_else(|| Utc::now().date_naive());
    let from = query
        .from
        .unwrap_or_else(|| to - Duration::days(DEFAULT_WINDOW_DAYS));
    if from > to {
        return Err(AppError::Validation(
            "Range start must not be after its end".to_string(),
        ));
    }

    let reports = records::reports_between(&state.db.pool, &id, from, to).await?;
    Ok(Json(reports))
}

/// One report per project-day: saving an existing date replaces it.
async fn save_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<SaveReportRequest>,
) -> Result<Json<DailyReport>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let weather: Weather = body.weather.parse().map_err(AppError::Validation)?;

    let tasks_snapshot = match body.tasks_snapshot {
        Some(snapshot) => snapshot,
        None => records::tasks_for_project(&state.db.pool, &id)
            .await?
            .into_iter()
            .filter(|t| t.start_date <= body.report_date && t.end_date >= body.report_date)
            .map(|t| TaskSnapshot {
                task_id: t.id,
                name: t.name,
                progress: t.progress,
            })
            .collect(),
    };

    let report = DailyReport {
        id: Uuid::new_v4().to_string(),
        project_id: id,
        report_date: body.report_date,
        weather,
        workforce: body.workforce,
        tasks_snapshot,
        observations: body.observations,
        author_id: user.id,
        created_at: Utc::now(),
    };
    let row = DailyReportRow::from(&report);

    let stored = sqlx::query_as::<_, DailyReportRow>(
        r#"
        INSERT INTO daily_reports (id, project_id, report_date, weather, workforce, tasks_snapshot, observations, author_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(project_id, report_date) DO UPDATE SET
            weather = excluded.weather,
            workforce = excluded.workforce,
            tasks_snapshot = excluded.tasks_snapshot,
            observations = excluded.observations,
            author_id = excluded.author_id
        RETURNING *
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.report_date)
    .bind(&row.weather)
    .bind(row.workforce)
    .bind(&row.tasks_snapshot)
    .bind(&row.observations)
    .bind(&row.author_id)
    .bind(&row.created_at)
    .fetch_one(&state.db.pool)
    .await?;

    tracing::debug!(project_id = %stored.project_id, date = %stored.report_date, "saved daily report");
    Ok(Json(DailyReport::try_from(stored)?))
}

async fn fetch_report(state: &AppState, project_id: &str, report_id: &str) -> Result<DailyReport> {
    let row = sqlx::query_as::<_, DailyReportRow>(
        "SELECT * FROM daily_reports WHERE id = ? AND project_id = ?",
    )
    .bind(report_id)
    .bind(project_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    DailyReport::try_from(row)
}

async fn get_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, report_id)): Path<(String, String)>,
) -> Result<Json<DailyReport>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    Ok(Json(fetch_report(&state, &id, &report_id).await?))
}

async fn delete_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, report_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    let report = fetch_report(&state, &id, &report_id).await?;

    sqlx::query("DELETE FROM daily_reports WHERE id = ?")
        .bind(&report.id)
        .execute(&state.db.pool)
        .await?;

    tracing::info!(project_id = %id, date = %format_date(report.report_date), "deleted daily report");
    Ok(Json(()))
}
