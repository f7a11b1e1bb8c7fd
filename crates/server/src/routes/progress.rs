use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{Subtask, UnitProgress},
    domain::progress::{self, BuildingProgress},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, records, unit_progress},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/progress", get(get_progress).put(upsert_progress))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub rows: Vec<UnitProgress>,
    pub building: BuildingProgress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProgressRequest {
    pub unit_id: String,
    pub phase_id: String,
    pub percentage: f64,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>> {
    let (project, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    let rows = records::unit_progress_for_project(&state.db.pool, &id).await?;

    // Building figures cover every unit; row detail is limited to visible units
    let building = progress::aggregate(&project.structure, &project.phases, &rows);
    let rows = rows
        .into_iter()
        .filter(|r| access.can_see_tag(Some(&r.unit_id)))
        .collect();

    Ok(Json(ProgressResponse { rows, building }))
}

async fn upsert_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpsertProgressRequest>,
) -> Result<Json<UnitProgress>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;

    if !(0.0..=100.0).contains(&body.percentage) {
        return Err(AppError::Validation(
            "Percentage must be between 0 and 100".to_string(),
        ));
    }
    if project.structure.find_unit(&body.unit_id).is_none() {
        return Err(AppError::Validation(format!(
            "Unit {} does not exist in this project",
            body.unit_id
        )));
    }
    if !project.phases.iter().any(|p| p.id == body.phase_id) {
        return Err(AppError::Validation(format!(
            "Phase {} does not exist in this project",
            body.phase_id
        )));
    }

    let stored = unit_progress::upsert(
        &state.db.pool,
        &id,
        &body.unit_id,
        &body.phase_id,
        body.percentage,
        body.subtasks,
    )
    .await?;

    Ok(Json(stored))
}
