use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::{
            Phase, PermissionRole, Project, ProjectStatus, ProjectStructure, UnitPermission,
        },
        rows::{ProjectRow, UnitPermissionRow},
    },
    domain::{permissions::ProjectAccess, schedule::validate_range},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::access::{self, ClaimOutcome, VisibleProject},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/claim", post(claim_invite))
        .route("/:id/access", get(get_access))
        .route(
            "/:id/permissions",
            get(list_permissions).post(grant_permission),
        )
        .route("/:id/permissions/:permission_id", delete(revoke_permission))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub theme: Option<String>,
    #[serde(default)]
    pub structure: ProjectStructure,
    #[serde(default)]
    pub phases: Vec<Phase>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub progress: Option<f64>,
    pub status: Option<ProjectStatus>,
    pub theme: Option<String>,
    pub structure: Option<ProjectStructure>,
    pub phases: Option<Vec<Phase>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn validate_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) => validate_range(start, end),
        _ => Ok(()),
    }
}

fn validate_structure(structure: &ProjectStructure, phases: &[Phase]) -> Result<()> {
    let mut unit_ids = std::collections::HashSet::new();
    for unit in structure.units() {
        if !unit_ids.insert(unit.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Unit id {} is used more than once",
                unit.id
            )));
        }
    }
    let mut phase_ids = std::collections::HashSet::new();
    for phase in phases {
        if phase.name.trim().is_empty() {
            return Err(AppError::Validation("Phase name is required".to_string()));
        }
        if !phase_ids.insert(phase.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Phase id {} is used more than once",
                phase.id
            )));
        }
    }
    Ok(())
}

async fn save_project(pool: &sqlx::SqlitePool, project: &Project) -> Result<()> {
    let row = ProjectRow::from(project);
    sqlx::query(
        r#"
        INSERT INTO projects (id, name, address, progress, status, theme, structure, phases,
                              start_date, end_date, owner_id, organization_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            address = excluded.address,
            progress = excluded.progress,
            status = excluded.status,
            theme = excluded.theme,
            structure = excluded.structure,
            phases = excluded.phases,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&row.id)
    .bind(&row.name)
    .bind(&row.address)
    .bind(row.progress)
    .bind(&row.status)
    .bind(&row.theme)
    .bind(&row.structure)
    .bind(&row.phases)
    .bind(&row.start_date)
    .bind(&row.end_date)
    .bind(&row.owner_id)
    .bind(&row.organization_id)
    .bind(&row.created_at)
    .bind(&row.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<VisibleProject>>> {
    Ok(Json(access::visible_projects(&state.db.pool, &user).await?))
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<Project>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }
    validate_dates(body.start_date, body.end_date)?;
    validate_structure(&body.structure, &body.phases)?;

    if let Some(org_id) = &body.organization_id {
        if !access::is_org_member(&state.db.pool, org_id, &user.id).await? {
            return Err(AppError::Forbidden(
                "Only organization members can create projects for it".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        address: body.address,
        progress: 0.0,
        status: ProjectStatus::Active,
        theme: body.theme.unwrap_or_else(|| "#f97316".to_string()),
        structure: body.structure,
        phases: body.phases,
        start_date: body.start_date,
        end_date: body.end_date,
        owner_id: user.id.clone(),
        organization_id: body.organization_id,
        created_at: now,
        updated_at: now,
    };
    save_project(&state.db.pool, &project).await?;

    tracing::info!(project_id = %project.id, owner = %user.id, "created project");
    Ok(Json(project))
}

async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let (project, _) = access::resolve_access(&state.db.pool, &id, &user).await?;
    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<Project>> {
    let (mut project, _) = access::require_staff(&state.db.pool, &id, &user).await?;

    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Project name is required".to_string()));
        }
        project.name = name.trim().to_string();
    }
    if let Some(address) = body.address {
        project.address = address;
    }
    if let Some(progress) = body.progress {
        if !(0.0..=100.0).contains(&progress) {
            return Err(AppError::Validation(
                "Progress must be between 0 and 100".to_string(),
            ));
        }
        project.progress = progress;
    }
    if let Some(status) = body.status {
        project.status = status;
    }
    if let Some(theme) = body.theme {
        project.theme = theme;
    }
    if let Some(structure) = body.structure {
        project.structure = structure;
    }
    if let Some(phases) = body.phases {
        project.phases = phases;
    }
    if body.start_date.is_some() {
        project.start_date = body.start_date;
    }
    if body.end_date.is_some() {
        project.end_date = body.end_date;
    }

    validate_dates(project.start_date, project.end_date)?;
    validate_structure(&project.structure, &project.phases)?;

    project.updated_at = Utc::now();
    save_project(&state.db.pool, &project).await?;

    Ok(Json(project))
}

async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<()>> {
    // Only owner can delete project
    let project = access::load_project(&state.db.pool, &id).await?;
    if project.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the owner can delete this project".to_string(),
        ));
    }

    let storage_keys = sqlx::query_scalar::<_, String>(
        r#"
        SELECT storage_key FROM project_documents WHERE project_id = ?
        UNION ALL
        SELECT storage_key FROM project_photos WHERE project_id = ?
        "#,
    )
    .bind(&id)
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;

    // Delete from database (cascades to every project-scoped table)
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(&id)
        .execute(&state.db.pool)
        .await?;

    join_all(storage_keys.iter().map(|key| state.storage.discard(key))).await;

    tracing::info!(project_id = %id, files = storage_keys.len(), "deleted project");
    Ok(Json(()))
}

async fn claim_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ClaimOutcome>> {
    access::load_project(&state.db.pool, &id).await?;
    let outcome = access::claim_invite(&state.db.pool, &id, &user.id, &user.email).await?;
    Ok(Json(outcome))
}

async fn get_access(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectAccess>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    Ok(Json(access))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    pub unit_id: String,
    pub email: String,
    pub role: PermissionRole,
    #[serde(default)]
    pub visible_areas: Vec<String>,
}

async fn list_permissions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<UnitPermission>>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    Ok(Json(access::project_permissions(&state.db.pool, &id).await?))
}

async fn grant_permission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<GrantPermissionRequest>,
) -> Result<Json<UnitPermission>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;

    let email = crate::routes::auth::normalize_email(&body.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if project.structure.find_unit(&body.unit_id).is_none() {
        return Err(AppError::Validation(format!(
            "Unit {} does not exist in this project",
            body.unit_id
        )));
    }

    let permission = UnitPermission {
        id: Uuid::new_v4().to_string(),
        project_id: id.clone(),
        unit_id: body.unit_id,
        user_id: None,
        email,
        role: body.role,
        visible_areas: body.visible_areas,
        active: true,
        created_at: Utc::now(),
    };
    let row = UnitPermissionRow::from(&permission);

    // Re-granting reactivates a revoked row and keeps any claimed user id
    let stored = sqlx::query_as::<_, UnitPermissionRow>(
        r#"
        INSERT INTO unit_permissions (id, project_id, unit_id, user_id, email, role, visible_areas, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (project_id, unit_id, email) DO UPDATE SET
            role = excluded.role,
            visible_areas = excluded.visible_areas,
            active = 1
        RETURNING *
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.unit_id)
    .bind(&row.user_id)
    .bind(&row.email)
    .bind(&row.role)
    .bind(&row.visible_areas)
    .bind(row.active)
    .bind(&row.created_at)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(UnitPermission::try_from(stored)?))
}

async fn revoke_permission(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, permission_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let updated = sqlx::query(
        "UPDATE unit_permissions SET active = 0 WHERE id = ? AND project_id = ?",
    )
    .bind(&permission_id)
    .bind(&id)
    .execute(&state.db.pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Permission not found".to_string()));
    }
    Ok(Json(()))
}
