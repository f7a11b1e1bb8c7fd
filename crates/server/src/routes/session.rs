use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    db::models::{Organization, OrganizationInvite, Profile},
    error::Result,
    middleware::auth::AuthUser,
    routes::{organizations, profile},
    services::access::{self, VisibleProject},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(bootstrap))
}

/// Everything the app shell needs after sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub profile: Profile,
    pub organizations: Vec<Organization>,
    pub pending_invites: Vec<OrganizationInvite>,
    pub projects: Vec<VisibleProject>,
}

async fn bootstrap(State(state): State<AppState>, user: AuthUser) -> Result<Json<SessionResponse>> {
    let pool = &state.db.pool;

    let (profile, organizations, pending_invites, projects) = tokio::try_join!(
        profile::load_profile(pool, &user.id),
        organizations::user_organizations(pool, &user.id),
        organizations::pending_invites(pool, &user.email),
        access::visible_projects(pool, &user),
    )?;

    tracing::debug!(
        user_id = %user.id,
        projects = projects.len(),
        organizations = organizations.len(),
        "session bootstrap"
    );

    Ok(Json(SessionResponse {
        profile,
        organizations,
        pending_invites,
        projects,
    }))
}
