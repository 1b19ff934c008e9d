//! Notification bell endpoints.
//!
//! The client polls `unread-count` on an interval; rows are created by the
//! fan-out service, read and deleted by their recipient only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{Notification, NotificationResponse, UnreadCountResponse, User};
use crate::AppState;

use super::error::ApiError;

/// List the current user's notifications, newest first
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications: Vec<Notification> = sqlx::query_as(
        "SELECT * FROM notificaciones WHERE usuario_id = ? ORDER BY created_at DESC LIMIT 200",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(notifications.into_iter().map(|n| n.into()).collect()))
}

/// Unread counter for the bell badge
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notificaciones WHERE usuario_id = ? AND leida = 0")
            .bind(&user.id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(UnreadCountResponse { unread: count.0 }))
}

/// Mark one notification as read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query(
        "UPDATE notificaciones SET leida = 1, read_at = ? WHERE id = ? AND usuario_id = ?",
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Mark every notification as read
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<StatusCode, ApiError> {
    sqlx::query(
        "UPDATE notificaciones SET leida = 1, read_at = ? WHERE usuario_id = ? AND leida = 0",
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete one notification
pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM notificaciones WHERE id = ? AND usuario_id = ?")
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk delete all read notifications
pub async fn delete_read(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<StatusCode, ApiError> {
    sqlx::query("DELETE FROM notificaciones WHERE usuario_id = ? AND leida = 1")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
