use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    db::{models::Profile, rows::ProfileRow},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::media::UploadForm,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/avatar", post(upload_avatar))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub async fn load_profile(pool: &SqlitePool, user_id: &str) -> Result<Profile> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, email, name, avatar_url, phone FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Profile::from(row))
}

async fn get_profile(State(state): State<AppState>, user: AuthUser) -> Result<Json<Profile>> {
    Ok(Json(load_profile(&state.db.pool, &user.id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    let mut profile = load_profile(&state.db.pool, &user.id).await?;

    if let Some(name) = body.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        profile.name = name.to_string();
    }
    if let Some(phone) = body.phone {
        let phone = phone.trim();
        profile.phone = (!phone.is_empty()).then(|| phone.to_string());
    }

    sqlx::query("UPDATE users SET name = ?, phone = ? WHERE id = ?")
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(profile))
}

async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<Profile>> {
    let mut profile = load_profile(&state.db.pool, &user.id).await?;

    let form = UploadForm::read(multipart).await?;
    let (file_name, bytes) = form.file()?;
    let stored = state.storage.upload(bytes, "avatars", file_name).await?;

    let updated = sqlx::query("UPDATE users SET avatar_url = ? WHERE id = ?")
        .bind(&stored.url)
        .bind(&profile.id)
        .execute(&state.db.pool)
        .await;
    if let Err(e) = updated {
        state.storage.discard(&stored.key).await;
        return Err(e.into());
    }

    profile.avatar_url = Some(stored.url);
    Ok(Json(profile))
}
