use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::{
        models::{Note, NoteReply},
        rows::{map_rows, NoteReplyRow, NoteRow},
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::access,
    AppState,
};

const DEFAULT_COLOR: &str = "yellow";
const GENERAL_CONTEXT: &str = "general";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/notes", get(list_notes).post(create_note))
        .route("/:id/notes/:note_id", put(update_note).delete(delete_note))
        .route("/:id/notes/:note_id/replies", post(create_reply))
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: String,
    pub context: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub content: Option<String>,
    pub context: Option<String>,
    pub color: Option<String>,
    pub pinned: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub content: String,
}

async fn fetch_note(state: &AppState, project_id: &str, note_id: &str) -> Result<Note> {
    let row = sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT n.id, n.project_id, n.author_id, u.name AS author_name, n.context, n.content,
               n.color, n.pinned, n.created_at
        FROM project_notes n
        JOIN users u ON n.author_id = u.id
        WHERE n.id = ? AND n.project_id = ?
        "#,
    )
    .bind(note_id)
    .bind(project_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    Note::try_from(row)
}

/// Pinned notes first, newest first, each with its replies oldest first.
async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Note>>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;

    let rows = sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT n.id, n.project_id, n.author_id, u.name AS author_name, n.context, n.content,
               n.color, n.pinned, n.created_at
        FROM project_notes n
        JOIN users u ON n.author_id = u.id
        WHERE n.project_id = ?
        ORDER BY n.pinned DESC, n.created_at DESC
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;
    let notes: Vec<Note> = map_rows(rows)?;

    let reply_rows = sqlx::query_as::<_, NoteReplyRow>(
        r#"
        SELECT r.id, r.note_id, r.author_id, u.name AS author_name, r.content, r.created_at
        FROM project_note_replies r
        JOIN users u ON r.author_id = u.id
        JOIN project_notes n ON r.note_id = n.id
        WHERE n.project_id = ?
        ORDER BY r.created_at ASC
        "#,
    )
    .bind(&id)
    .fetch_all(&state.db.pool)
    .await?;

    let mut replies: HashMap<String, Vec<NoteReply>> = HashMap::new();
    for reply in map_rows::<_, NoteReply>(reply_rows)? {
        replies.entry(reply.note_id.clone()).or_default().push(reply);
    }

    let notes = notes
        .into_iter()
        .filter(|n| access.can_see_tag(Some(&n.context)))
        .map(|mut n| {
            n.replies = replies.remove(&n.id).unwrap_or_default();
            n
        })
        .collect();

    Ok(Json(notes))
}

async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<CreateNoteRequest>,
) -> Result<Json<Note>> {
    access::require_staff(&state.db.pool, &id, &user).await?;

    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Note content is required".to_string()));
    }

    let note = Note {
        id: Uuid::new_v4().to_string(),
        project_id: id,
        author_id: user.id,
        author_name: user.name,
        context: body
            .context
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| GENERAL_CONTEXT.to_string()),
        content: body.content,
        color: body.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        pinned: body.pinned,
        created_at: Utc::now(),
        replies: Vec::new(),
    };

    sqlx::query(
        r#"
        INSERT INTO project_notes (id, project_id, author_id, context, content, color, pinned, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&note.id)
    .bind(&note.project_id)
    .bind(&note.author_id)
    .bind(&note.context)
    .bind(&note.content)
    .bind(&note.color)
    .bind(note.pinned)
    .bind(note.created_at.to_rfc3339())
    .execute(&state.db.pool)
    .await?;

    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, note_id)): Path<(String, String)>,
    Json(body): Json<UpdateNoteRequest>,
) -> Result<Json<Note>> {
    access::require_staff(&state.db.pool, &id, &user).await?;
    let mut note = fetch_note(&state, &id, &note_id).await?;

    if let Some(content) = body.content {
        if content.trim().is_empty() {
            return Err(AppError::Validation("Note content is required".to_string()));
        }
        note.content = content;
    }
    if let Some(context) = body.context {
        note.context = context;
    }
    if let Some(color) = body.color {
        note.color = color;
    }
    if let Some(pinned) = body.pinned {
        note.pinned = pinned;
    }

    sqlx::query("UPDATE project_notes SET content = ?, context = ?, color = ?, pinned = ? WHERE id = ?")
        .bind(&note.content)
        .bind(&note.context)
        .bind(&note.color)
        .bind(note.pinned)
        .bind(&note.id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, note_id)): Path<(String, String)>,
) -> Result<Json<()>> {
    let (project, _) = access::require_staff(&state.db.pool, &id, &user).await?;
    let note = fetch_note(&state, &id, &note_id).await?;

    if note.author_id != user.id && project.owner_id != user.id {
        return Err(AppError::Forbidden("Cannot delete this note".to_string()));
    }

    sqlx::query("DELETE FROM project_notes WHERE id = ?")
        .bind(&note.id)
        .execute(&state.db.pool)
        .await?;

    Ok(Json(()))
}

/// Anyone who can see the note may reply to it.
async fn create_reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, note_id)): Path<(String, String)>,
    Json(body): Json<CreateReplyRequest>,
) -> Result<Json<NoteReply>> {
    let (_, access) = access::resolve_access(&state.db.pool, &id, &user).await?;
    let note = fetch_note(&state, &id, &note_id).await?;
    if !access.can_see_tag(Some(&note.context)) {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Reply content is required".to_string()));
    }

    let reply = NoteReply {
        id: Uuid::new_v4().to_string(),
        note_id: note.id,
        author_id: user.id,
        author_name: user.name,
        content: body.content,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO project_note_replies (id, note_id, author_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&reply.id)
    .bind(&reply.note_id)
    .bind(&reply.author_id)
    .bind(&reply.content)
    .bind(reply.created_at.to_rfc3339())
    .execute(&state.db.pool)
    .await?;

    Ok(Json(reply))
}
