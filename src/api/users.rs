//! User registration and administration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateUserRequest, SecurityQuestion, User, UserResponse};
use crate::AppState;

use super::auth::{hash_password, require_admin};
use super::error::ApiError;
use super::validation::{validate_email, validate_password};

/// Register a user (admin). New accounts always start Activo with no
/// payments attached.
pub async fn create(
    State(state): State<Arc<AppState>>,
    admin: User,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_admin(&admin)?;

    if request.nombre.trim().is_empty() {
        return Err(ApiError::validation("nombre", "Name is required"));
    }
    validate_email(&request.email).map_err(|e| ApiError::validation("email", e))?;
    validate_password(&request.password).map_err(|e| ApiError::validation("password", e))?;

    let rol = request.rol.as_deref().unwrap_or("residente");
    if rol.parse::<crate::db::Role>().is_err() {
        return Err(ApiError::validation("rol", format!("Unknown role: {}", rol)));
    }

    // Hash security-question answers before storage, preserving order
    let security_questions = match request.security_questions {
        Some(questions) if !questions.is_empty() => {
            let mut hashed = Vec::with_capacity(questions.len());
            for q in questions {
                if q.question.trim().is_empty() || q.answer.trim().is_empty() {
                    return Err(ApiError::validation(
                        "security_questions",
                        "Questions and answers cannot be empty",
                    ));
                }
                let answer_hash = hash_password(q.answer.trim()).map_err(|e| {
                    ApiError::internal(format!("Failed to hash answer: {}", e))
                })?;
                hashed.push(SecurityQuestion {
                    question: q.question,
                    answer_hash,
                });
            }
            Some(serde_json::to_string(&hashed).map_err(|e| {
                ApiError::internal(format!("Failed to encode questions: {}", e))
            })?)
        }
        _ => None,
    };

    let id = Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO usuarios (id, nombre, email, password_hash, rol, estado, security_questions, telefono)
        VALUES (?, ?, ?, ?, ?, 'Activo', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(request.nombre.trim())
    .bind(&request.email)
    .bind(&password_hash)
    .bind(rol)
    .bind(&security_questions)
    .bind(&request.telefono)
    .execute(&state.db)
    .await?;

    tracing::info!(usuario = %request.nombre, rol = %rol, "User registered");

    let user: User = sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List all users (admin)
pub async fn list(
    State(state): State<Arc<AppState>>,
    admin: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&admin)?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM usuarios ORDER BY nombre")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(|u| u.into()).collect()))
}

/// Get a single user (admin, or the user themselves)
pub async fn get(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    if !caller.is_admin() && caller.id != id {
        return Err(ApiError::forbidden("Not your profile"));
    }

    let user: User = sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
