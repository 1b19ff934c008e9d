//! Common spaces (espacios_comunes). Listing for everyone, admin CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CommonSpace, CreateCommonSpaceRequest, User};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;

pub async fn list(
    State(state): State<Arc<AppState>>,
    _user: User,
) -> Result<Json<Vec<CommonSpace>>, ApiError> {
    let spaces: Vec<CommonSpace> =
        sqlx::query_as("SELECT * FROM espacios_comunes ORDER BY nombre")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(spaces))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateCommonSpaceRequest>,
) -> Result<(StatusCode, Json<CommonSpace>), ApiError> {
    require_admin(&user)?;

    if request.nombre.trim().is_empty() {
        return Err(ApiError::validation("nombre", "Name is required"));
    }
    if let Some(capacidad) = request.capacidad {
        if capacidad < 0 {
            return Err(ApiError::validation("capacidad", "Capacity cannot be negative"));
        }
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO espacios_comunes (id, nombre, descripcion, capacidad) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(request.nombre.trim())
    .bind(&request.descripcion)
    .bind(request.capacidad)
    .execute(&state.db)
    .await?;

    let space: CommonSpace = sqlx::query_as("SELECT * FROM espacios_comunes WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(space)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;

    let result = sqlx::query("DELETE FROM espacios_comunes WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Common space not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
