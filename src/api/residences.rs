//! Residence administration: units and user-residence memberships.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{AssignResidenceRequest, CreateResidenceRequest, Residence, User};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;
use super::validation::validate_unit_number;

/// List residences (admin)
pub async fn list(
    State(state): State<Arc<AppState>>,
    admin: User,
) -> Result<Json<Vec<Residence>>, ApiError> {
    require_admin(&admin)?;

    let residences: Vec<Residence> = sqlx::query_as("SELECT * FROM viviendas ORDER BY numero")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(residences))
}

/// Create a residence (admin)
pub async fn create(
    State(state): State<Arc<AppState>>,
    admin: User,
    Json(request): Json<CreateResidenceRequest>,
) -> Result<(StatusCode, Json<Residence>), ApiError> {
    require_admin(&admin)?;
    validate_unit_number(&request.numero).map_err(|e| ApiError::validation("numero", e))?;

    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO viviendas (id, numero, descripcion) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(request.numero.trim())
        .bind(&request.descripcion)
        .execute(&state.db)
        .await?;

    let residence: Residence = sqlx::query_as("SELECT * FROM viviendas WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(residence)))
}

/// Associate a user with a residence (admin). This relation is what the
/// payment submission ownership check consults.
pub async fn assign_user(
    State(state): State<Arc<AppState>>,
    admin: User,
    Path(id): Path<String>,
    Json(request): Json<AssignResidenceRequest>,
) -> Result<StatusCode, ApiError> {
    require_admin(&admin)?;

    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM viviendas WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Residence not found"));
    }

    sqlx::query("INSERT INTO usuario_vivienda (usuario_id, vivienda_id) VALUES (?, ?)")
        .bind(&request.usuario_id)
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::CREATED)
}

/// Residences associated with the current user
pub async fn mine(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Residence>>, ApiError> {
    let residences: Vec<Residence> = sqlx::query_as(
        r#"
        SELECT v.* FROM viviendas v
        JOIN usuario_vivienda uv ON uv.vivienda_id = v.id
        WHERE uv.usuario_id = ?
        ORDER BY v.numero
        "#,
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(residences))
}
