use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{
        models::{InviteStatus, Organization, OrganizationInvite, OrganizationMember},
        rows::{map_rows, OrganizationInviteRow, OrganizationMemberRow, OrganizationRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::{auth::normalize_email, media::UploadForm},
    AppState,
};

const OWNER_ROLE: &str = "owner";
const MEMBER_ROLE: &str = "member";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route("/:id", put(rename_organization))
        .route("/:id/logo", post(upload_logo))
        .route("/:id/members", get(list_members).post(add_member))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/invites", get(list_invites).post(create_invite))
        .route("/:id/invites/:invite_id/accept", post(accept_invite))
}

#[derive(Debug, Deserialize)]
pub struct OrganizationRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

/// Organizations the user belongs to, oldest first.
pub async fn user_organizations(pool: &SqlitePool, user_id: &str) -> Result<Vec<Organization>> {
    let rows = sqlx::query_as::<_, OrganizationRow>(
        r#"
        SELECT o.* FROM organizations o
        JOIN organization_members om ON om.organization_id = o.id
        WHERE om.user_id = ?
        ORDER BY o.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

/// Pending organization invites addressed to `email`.
pub async fn pending_invites(pool: &SqlitePool, email: &str) -> Result<Vec<OrganizationInvite>> {
    let rows = sqlx::query_as::<_, OrganizationInviteRow>(
        "SELECT * FROM organization_invites WHERE lower(email) = lower(?) AND status = 'pending' ORDER BY created_at DESC",
    )
    .bind(email)
    .fetch_all(pool)
    .await?;
    map_rows(rows)
}

async fn load_organization(pool: &SqlitePool, org_id: &str) -> Result<Organization> {
    let row = sqlx::query_as::<_, OrganizationRow>("SELECT * FROM organizations WHERE id = ?")
        .bind(org_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    Organization::try_from(row)
}

async fn member_role(pool: &SqlitePool, org_id: &str, user_id: &str) -> Result<Option<String>> {
    Ok(sqlx::query_scalar::<_, String>(
        "SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// Non-members get `NotFound` so organization ids are not probeable.
async fn require_member(pool: &SqlitePool, org_id: &str, user: &AuthUser) -> Result<Organization> {
    let organization = load_organization(pool, org_id).await?;
    if member_role(pool, org_id, &user.id).await?.is_none() {
        return Err(AppError::NotFound("Organization not found".to_string()));
    }
    Ok(organization)
}

async fn require_owner(pool: &SqlitePool, org_id: &str, user: &AuthUser) -> Result<Organization> {
    let organization = require_member(pool, org_id, user).await?;
    if organization.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the organization owner can do this".to_string(),
        ));
    }
    Ok(organization)
}

async fn insert_member(pool: &SqlitePool, org_id: &str, user_id: &str, role: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO organization_members (organization_id, user_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(organization_id, user_id) DO UPDATE SET role = excluded.role
        "#,
    )
    .bind(org_id)
    .bind(user_id)
    .bind(role)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

async fn list_organizations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Organization>>> {
    Ok(Json(user_organizations(&state.db.pool, &user.id).await?))
}

async fn create_organization(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OrganizationRequest>,
) -> Result<Json<Organization>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Organization name is required".to_string(),
        ));
    }

    let organization = Organization {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        logo_url: None,
        owner_id: user.id.clone(),
        created_at: Utc::now(),
    };

    let mut tx = state.db.pool.begin().await?;
    sqlx::query("INSERT INTO organizations (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(&organization.id)
        .bind(&organization.name)
        .bind(&organization.owner_id)
        .bind(organization.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO organization_members (organization_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&organization.id)
    .bind(&user.id)
    .bind(OWNER_ROLE)
    .bind(organization.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(org_id = %organization.id, "created organization");
    Ok(Json(organization))
}

async fn rename_organization(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<OrganizationRequest>,
) -> Result<Json<Organization>> {
    let mut organization = require_owner(&state.db.pool, &id, &user).await?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Organization name is required".to_string(),
        ));
    }
    organization.name = name.to_string();

    sqlx::query("UPDATE organizations SET name = ? WHERE id = ?")
        .bind(&organization.name)
        .bind(&organization.id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(organization))
}

async fn upload_logo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Organization>> {
    let mut organization = require_owner(&state.db.pool, &id, &user).await?;

    let form = UploadForm::read(multipart).await?;
    let (file_name, bytes) = form.file()?;
    let stored = state.storage.upload(bytes, "logos", file_name).await?;

    let updated = sqlx::query("UPDATE organizations SET logo_url = ? WHERE id = ?")
        .bind(&stored.url)
        .bind(&organization.id)
        .execute(&state.db.pool)
        .await;
    if let Err(e) = updated {
        state.storage.discard(&stored.key).await;
        return Err(e.into());
    }

    organization.logo_url = Some(stored.url);
    Ok(Json(organization))
}

async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrganizationMember>>> {
    require_member(&state.db.pool, &id, &user).await?;

    let rows = sqlx::query_as::<_, OrganizationMemberRow>(
        r#"
        SELECT om.user_id, u.name, u.email, om.role, om.joined_at
        FROM organization_members om
        JOIN users u ON om.user_id = u.id
        WHERE om.organization_id = ?
        ORDER BY om.joined_at ASC
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(map_rows(rows)?))
}

/// Adds an already registered user directly.
async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<Json<()>> {
    require_owner(&state.db.pool, &id, &user).await?;

    let email = normalize_email(&body.email);
    let member_id = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user registered with {email}")))?;

    let role = body.role.as_deref().unwrap_or(MEMBER_ROLE);
    if role == OWNER_ROLE {
        return Err(AppError::Validation(
            "An organization has a single owner".to_string(),
        ));
    }

    insert_member(&state.db.pool, &id, &member_id, role).await?;
    Ok(Json(()))
}

async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    let organization = require_member(&state.db.pool, &id, &user).await?;

    // Members may leave; only the owner removes others
    if member_id != user.id && organization.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the organization owner can remove members".to_string(),
        ));
    }
    if member_id == organization.owner_id {
        return Err(AppError::Validation(
            "The owner cannot be removed".to_string(),
        ));
    }

    let result = sqlx::query(
        "DELETE FROM organization_members WHERE organization_id = ? AND user_id = ?",
    )
    .bind(&id)
    .bind(&member_id)
    .execute(&state.db.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Member not found".to_string()));
    }
    Ok(Json(()))
}

async fn list_invites(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrganizationInvite>>> {
    require_member(&state.db.pool, &id, &user).await?;

    let rows = sqlx::query_as::<_, OrganizationInviteRow>(
        "SELECT * FROM organization_invites WHERE organization_id = ? ORDER BY created_at DESC",
    )
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(map_rows(rows)?))
}

/// Re-inviting an address resets its invite to pending.
async fn create_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<InviteRequest>,
) -> Result<Json<OrganizationInvite>> {
    require_owner(&state.db.pool, &id, &user).await?;

    let email = normalize_email(&body.email);
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let row = sqlx::query_as::<_, OrganizationInviteRow>(
        r#"
        INSERT INTO organization_invites (id, organization_id, email, invited_by, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(organization_id, email) DO UPDATE SET
            status = excluded.status,
            invited_by = excluded.invited_by,
            created_at = excluded.created_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&id)
    .bind(&email)
    .bind(&user.id)
    .bind(InviteStatus::Pending.as_str())
    .bind(Utc::now().to_rfc3339())
    .fetch_one(&state.db.pool)
    .await?;

    tracing::info!(org_id = %id, %email, "invited to organization");
    Ok(Json(OrganizationInvite::try_from(row)?))
}

async fn accept_invite(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, invite_id)): Path<(String, String)>,
) -> Result<Json<Organization>> {
    let organization = load_organization(&state.db.pool, &id).await?;

    let row = sqlx::query_as::<_, OrganizationInviteRow>(
        "SELECT * FROM organization_invites WHERE id = ? AND organization_id = ?",
    )
    .bind(&invite_id)
    .bind(&id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;
    let invite = OrganizationInvite::try_from(row)?;

    if !invite.email.eq_ignore_ascii_case(&user.email) {
        return Err(AppError::NotFound("Invite not found".to_string()));
    }
    if invite.status != InviteStatus::Pending {
        return Err(AppError::Validation(format!(
            "Invite is already {}",
            invite.status
        )));
    }

    let mut tx = state.db.pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO organization_members (organization_id, user_id, role, joined_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(organization_id, user_id) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(MEMBER_ROLE)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE organization_invites SET status = ? WHERE id = ?")
        .bind(InviteStatus::Accepted.as_str())
        .bind(&invite.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(organization))
}
