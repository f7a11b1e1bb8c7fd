use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    db::{
        models::{ProjectDocument, ProjectPhoto},
        rows::{ProjectDocumentRow, ProjectPhotoRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{access, records},
    AppState,
};

const PHOTO_LIMIT: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/documents", get(list_documents).post(upload_document))
        .route("/:id/documents/:document_id", delete(delete_document))
        .route("/:id/photos", get(list_photos).post(upload_photo))
        .route("/:id/photos/:photo_id", delete(delete_photo))
}

/// A multipart form: the single file part plus its text fields.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name() {
                form.file_name = Some(file_name.to_string());
                form.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?
                    .to_vec();
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field {name}: {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Name and contents of the uploaded file, rejecting empty uploads.
    pub(crate) fn file(&self) -> Result<(&str, &[u8])> {
        match &self.file_name {
            Some(name) if !self.bytes.is_empty() => Ok((name.as_str(), self.bytes.as_slice())),
            _ => Err(AppError::Validation("A file is required".to_string())),
        }
    }

    pub(crate) fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProjectDocument>>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;

    let documents = records::documents_for_project(&state.db.pool, &id)
        .await?
        .into_iter()
        .filter(|d| access.can_see_tag(Some(&d.category)))
        .collect();

    Ok(Json(documents))
}

async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProjectDocument>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let form = UploadForm::read(multipart).await?;
    let (file_name, bytes) = form.file()?;
    let name = form.text("name").unwrap_or(file_name).to_string();
    let category = form.text("category").unwrap_or("general").to_string();

    let stored = state.storage.upload(bytes, "documents", file_name).await?;

    let document = ProjectDocument {
        id: Uuid::new_v4().to_string(),
        project_id: id,
        name,
        category,
        url: stored.url,
        storage_key: stored.key,
        uploaded_by: user.id,
        created_at: Utc::now(),
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO project_documents (id, project_id, name, category, url, storage_key, uploaded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document.id)
    .bind(&document.project_id)
    .bind(&document.name)
    .bind(&document.category)
    .bind(&document.url)
    .bind(&document.storage_key)
    .bind(&document.uploaded_by)
    .bind(document.created_at.to_rfc3339())
    .execute(&state.db.pool)
    .await;

    if let Err(e) = inserted {
        state.storage.discard(&document.storage_key).await;
        return Err(e.into());
    }

    tracing::info!(project_id = %document.project_id, name = %document.name, "uploaded document");
    Ok(Json(document))
}

async fn delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, document_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let row = sqlx::query_as::<_, ProjectDocumentRow>(
        "SELECT * FROM project_documents WHERE id = ? AND project_id = ?",
    )
    .bind(&document_id)
    .bind(&id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    sqlx::query("DELETE FROM project_documents WHERE id = ?")
        .bind(&row.id)
        .execute(&state.db.pool)
        .await?;
    state.storage.discard(&row.storage_key).await;

    Ok(Json(()))
}

async fn list_photos(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ProjectPhoto>>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;

    let photos = records::recent_photos(&state.db.pool, &id, PHOTO_LIMIT)
        .await?
        .into_iter()
        .filter(|p| access.can_see_tag(p.location.as_deref()))
        .collect();

    Ok(Json(photos))
}

async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProjectPhoto>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;

    let form = UploadForm::read(multipart).await?;
    let (file_name, bytes) = form.file()?;

    let taken_on = match form.text("takenOn") {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date '{value}'")))?,
        None => Utc::now().date_naive(),
    };
    let location = form.text("location").map(str::to_string);
    if let Some(unit_id) = &location {
        let known = project.structure.find_unit(unit_id).is_some()
            || project
                .structure
                .units()
                .any(|u| u.category.as_deref() == Some(unit_id.as_str()));
        if !known && unit_id != "general" {
            return Err(AppError::Validation(format!(
                "Location {unit_id} does not exist in this project"
            )));
        }
    }

    let stored = state.storage.upload(bytes, "photos", file_name).await?;

    let photo = ProjectPhoto {
        id: Uuid::new_v4().to_string(),
        project_id: id,
        url: stored.url,
        storage_key: stored.key,
        caption: form.text("caption").unwrap_or_default().to_string(),
        location,
        category: form.text("category").unwrap_or("general").to_string(),
        taken_on,
        uploaded_by: user.id,
        created_at: Utc::now(),
    };
    let row = ProjectPhotoRow::from(&photo);

    let inserted = sqlx::query(
        r#"
        INSERT INTO project_photos (id, project_id, url, storage_key, caption, location, category, taken_on, uploaded_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.project_id)
    .bind(&row.url)
    .bind(&row.storage_key)
    .bind(&row.caption)
    .bind(&row.location)
    .bind(&row.category)
    .bind(&row.taken_on)
    .bind(&row.uploaded_by)
    .bind(&row.created_at)
    .execute(&state.db.pool)
    .await;

    if let Err(e) = inserted {
        state.storage.discard(&photo.storage_key).await;
        return Err(e.into());
    }

    Ok(Json(photo))
}

async fn delete_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, photo_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    let row = sqlx::query_as::<_, ProjectPhotoRow>(
        "SELECT * FROM project_photos WHERE id = ? AND project_id = ?",
    )
    .bind(&photo_id)
    .bind(&id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;

    sqlx::query("DELETE FROM project_photos WHERE id = ?")
        .bind(&row.id)
        .execute(&state.db.pool)
        .await?;
    state.storage.discard(&row.storage_key).await;

    Ok(Json(()))
}
