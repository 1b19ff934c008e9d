//! Announcement board (anuncios). Thin CRUD: everyone reads, admins write.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{Announcement, CreateAnnouncementRequest, NotificationKind, User};
use crate::notifications::NotificationService;
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;

pub async fn list(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    let announcements: Vec<Announcement> =
        sqlx::query_as("SELECT * FROM anuncios ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(announcements))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    require_admin(&user)?;

    if request.titulo.trim().is_empty() {
        return Err(ApiError::validation("titulo", "Title is required"));
    }
    if request.contenido.trim().is_empty() {
        return Err(ApiError::validation("contenido", "Content is required"));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO anuncios (id, autor_id, titulo, contenido) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&user.id)
        .bind(request.titulo.trim())
        .bind(request.contenido.trim())
        .execute(&state.db)
        .await?;

    let announcement: Announcement = sqlx::query_as("SELECT * FROM anuncios WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// Delete an announcement and notify residents it is gone
pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let announcement: Option<Announcement> =
        sqlx::query_as("SELECT * FROM anuncios WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?;

    let announcement = announcement.ok_or_else(|| ApiError::not_found("Announcement not found"))?;

    sqlx::query("DELETE FROM anuncios WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    NotificationService::new(state.db.clone())
        .notify_residents(
            NotificationKind::AnuncioEliminado,
            "Anuncio eliminado",
            &format!("El anuncio \"{}\" fue eliminado", announcement.titulo),
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
