//! Project lookup and access resolution against the database.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        models::{Project, UnitPermission},
        rows::{map_rows, ProjectRow, UnitPermissionRow},
    },
    domain::permissions::{own_permissions, AccessLevel, ProjectAccess},
    error::{AppError, Result},
    middleware::auth::AuthUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ClaimOutcome {
    /// Unclaimed invites were linked to the user.
    Claimed { count: u64 },
    /// The user already holds linked rows and nothing was left to claim.
    AlreadyClaimed,
    NoInvite,
}

pub async fn load_project(pool: &SqlitePool, project_id: &str) -> Result<Project> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Project::try_from(row)
}

pub async fn is_org_member(pool: &SqlitePool, organization_id: &str, user_id: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM organization_members WHERE organization_id = ? AND user_id = ?",
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Links invite rows addressed to `email` to `user_id`. Safe to call repeatedly.
pub async fn claim_invite(
    pool: &SqlitePool,
    project_id: &str,
    user_id: &str,
    email: &str,
) -> Result<ClaimOutcome> {
    let claimed = sqlx::query(
        r#"
        UPDATE unit_permissions SET user_id = ?
        WHERE project_id = ? AND user_id IS NULL AND active = 1 AND lower(email) = lower(?)
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .bind(email)
    .execute(pool)
    .await?
    .rows_affected();

    if claimed > 0 {
        tracing::info!(%project_id, %user_id, count = claimed, "claimed unit invites");
        return Ok(ClaimOutcome::Claimed { count: claimed });
    }

    let linked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM unit_permissions WHERE project_id = ? AND user_id = ? AND active = 1",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(if linked > 0 {
        ClaimOutcome::AlreadyClaimed
    } else {
        ClaimOutcome::NoInvite
    })
}

pub async fn project_permissions(pool: &SqlitePool, project_id: &str) -> Result<Vec<UnitPermission>> {
    let rows = sqlx::query_as::<_, UnitPermissionRow>(
        "SELECT * FROM unit_permissions WHERE project_id = ? ORDER BY unit_id ASC, email ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

async fn access_for(pool: &SqlitePool, project: &Project, user: &AuthUser) -> Result<ProjectAccess> {
    let is_owner = project.owner_id == user.id;
    let is_org_member = match &project.organization_id {
        Some(org) => is_org_member(pool, org, &user.id).await?,
        None => false,
    };

    let rows = sqlx::query_as::<_, UnitPermissionRow>(
        r#"
        SELECT * FROM unit_permissions
        WHERE project_id = ? AND active = 1 AND (user_id = ? OR lower(email) = lower(?))
        "#,
    )
    .bind(&project.id)
    .bind(&user.id)
    .bind(&user.email)
    .fetch_all(pool)
    .await?;
    let permissions: Vec<UnitPermission> = map_rows(rows)?;
    let own = own_permissions(&permissions, &user.id, &user.email);

    Ok(ProjectAccess::resolve(&project.id, is_owner, is_org_member, &own))
}

/// Claims pending invites, then resolves the user's access. Users without any
/// access get `NotFound`, the same as a missing project.
pub async fn resolve_access(
    pool: &SqlitePool,
    project_id: &str,
    user: &AuthUser,
) -> Result<(Project, ProjectAccess)> {
    let project = load_project(pool, project_id).await?;
    claim_invite(pool, project_id, &user.id, &user.email).await?;

    let access = access_for(pool, &project, user).await?;
    if access.level == AccessLevel::None {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok((project, access))
}

pub async fn require_staff(
    pool: &SqlitePool,
    project_id: &str,
    user: &AuthUser,
) -> Result<(Project, ProjectAccess)> {
    let (project, access) = resolve_access(pool, project_id, user).await?;
    access.require_staff()?;
    Ok((project, access))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleProject {
    #[serde(flatten)]
    pub project: Project,
    pub access: ProjectAccess,
}

/// Projects the user owns, reaches through an organization, or was invited to.
/// An empty list is a normal result.
pub async fn visible_projects(pool: &SqlitePool, user: &AuthUser) -> Result<Vec<VisibleProject>> {
    let rows = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT DISTINCT p.* FROM projects p
        LEFT JOIN organization_members om ON om.organization_id = p.organization_id
        LEFT JOIN unit_permissions up ON up.project_id = p.id AND up.active = 1
        WHERE p.owner_id = ?
           OR om.user_id = ?
           OR up.user_id = ?
           OR lower(up.email) = lower(?)
        ORDER BY p.updated_at DESC
        "#,
    )
    .bind(&user.id)
    .bind(&user.id)
    .bind(&user.id)
    .bind(&user.email)
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for project in map_rows::<_, Project>(rows)? {
        let access = access_for(pool, &project, user).await?;
        if access.level != AccessLevel::None {
            projects.push(VisibleProject { project, access });
        }
    }
    Ok(projects)
}
