//! Maintenance requests (solicitudes_mantenimiento). Residents open
//! requests; admins move them through the open/in-progress/closed flow.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CreateMaintenanceRequest, MaintenanceRequest, NotificationKind, UpdateMaintenanceRequest,
    User,
};
use crate::notifications::NotificationService;
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;

/// Residents see their own requests, admins all of them
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<MaintenanceRequest>>, ApiError> {
    let requests: Vec<MaintenanceRequest> = if user.is_admin() {
        sqlx::query_as("SELECT * FROM solicitudes_mantenimiento ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?
    } else {
        sqlx::query_as(
            "SELECT * FROM solicitudes_mantenimiento WHERE usuario_id = ? ORDER BY created_at DESC",
        )
        .bind(&user.id)
        .fetch_all(&state.db)
        .await?
    };

    Ok(Json(requests))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateMaintenanceRequest>,
) -> Result<(StatusCode, Json<MaintenanceRequest>), ApiError> {
    if request.titulo.trim().is_empty() {
        return Err(ApiError::validation("titulo", "Title is required"));
    }
    if request.descripcion.trim().is_empty() {
        return Err(ApiError::validation("descripcion", "Description is required"));
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO solicitudes_mantenimiento (id, usuario_id, titulo, descripcion) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.id)
    .bind(request.titulo.trim())
    .bind(request.descripcion.trim())
    .execute(&state.db)
    .await?;

    let created: MaintenanceRequest =
        sqlx::query_as("SELECT * FROM solicitudes_mantenimiento WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Update request state (admin); the requester is notified
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<UpdateMaintenanceRequest>,
) -> Result<Json<MaintenanceRequest>, ApiError> {
    require_admin(&user)?;

    let existing: Option<MaintenanceRequest> =
        sqlx::query_as("SELECT * FROM solicitudes_mantenimiento WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?;
    let existing = existing.ok_or_else(|| ApiError::not_found("Maintenance request not found"))?;

    sqlx::query("UPDATE solicitudes_mantenimiento SET estado = ?, updated_at = ? WHERE id = ?")
        .bind(request.estado.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?;

    NotificationService::new(state.db.clone())
        .notify(
            &existing.usuario_id,
            NotificationKind::Mantenimiento,
            "Solicitud actualizada",
            &format!(
                "Su solicitud \"{}\" pasó a estado {}",
                existing.titulo, request.estado
            ),
            Some(("solicitud", &id)),
        )
        .await;

    let updated: MaintenanceRequest =
        sqlx::query_as("SELECT * FROM solicitudes_mantenimiento WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(updated))
}
