//! Authentication, sessions, password recovery and the delinquency
//! session gate.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{
    LoginRequest, LoginResponse, NotificationKind, RecoverPasswordRequest,
    RecoveryQuestionsQuery, RecoveryQuestionsResponse, SecurityQuestion, Session, User,
    UserResponse,
};
use crate::notifications::NotificationService;
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_password;

/// Hash a password (or a security-question answer) using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

async fn create_session(pool: &sqlx::SqlitePool, user_id: &str, ttl_days: i64) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    // Stored in SQLite's datetime format so the textual comparison against
    // datetime('now') in the session lookup is exact
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(ttl_days))
        .ok_or_else(|| ApiError::internal("Session expiry out of range"))?
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sesiones (id, usuario_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Look up the user behind a bearer token. The user row is re-read on every
/// call, so the caller always observes the server-held delinquency status.
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sesiones WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
        .bind(&session.usuario_id)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))
}

/// Server-side admin check for admin-only transitions. Role is taken from
/// the database row, never from client-held state.
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator role required"))
    }
}

// -------------------------------------------------------------------------
// Endpoints
// -------------------------------------------------------------------------

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM usuarios WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user.id, state.config.auth.session_ttl_days).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Logout: delete the session behind the presented token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    sqlx::query("DELETE FROM sesiones WHERE token_hash = ?")
        .bind(hash_token(&token))
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Validate token endpoint
pub async fn validate(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> StatusCode {
    let token = match extract_token(request.headers()) {
        Some(t) => t,
        None => return StatusCode::UNAUTHORIZED,
    };

    match get_current_user(&state.db, &token).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::UNAUTHORIZED,
    }
}

/// Current-user lookup with fresh delinquency status
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

// -------------------------------------------------------------------------
// Password recovery via security questions
// -------------------------------------------------------------------------

fn parse_questions(user: &User) -> Result<Vec<SecurityQuestion>, ApiError> {
    let raw = user
        .security_questions
        .as_deref()
        .ok_or_else(|| ApiError::not_found("No recovery questions configured"))?;
    let questions: Vec<SecurityQuestion> = serde_json::from_str(raw)
        .map_err(|_| ApiError::internal("Stored recovery questions are unreadable"))?;
    if questions.is_empty() {
        return Err(ApiError::not_found("No recovery questions configured"));
    }
    Ok(questions)
}

/// Return the question texts for an account, in stored order
pub async fn recovery_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecoveryQuestionsQuery>,
) -> Result<Json<RecoveryQuestionsResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM usuarios WHERE email = ?")
        .bind(&query.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::not_found("No recovery questions configured"))?;
    let questions = parse_questions(&user)?;

    Ok(Json(RecoveryQuestionsResponse {
        questions: questions.into_iter().map(|q| q.question).collect(),
    }))
}

/// Reset a password after answering every security question correctly.
/// Admins are notified of the recovery.
pub async fn recover_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecoverPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password(&request.new_password)
        .map_err(|e| ApiError::validation("new_password", e))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM usuarios WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Recovery failed"))?;
    let questions = parse_questions(&user)?;

    if request.answers.len() != questions.len() {
        return Err(ApiError::unauthorized("Recovery failed"));
    }
    for (question, answer) in questions.iter().zip(request.answers.iter()) {
        if !verify_password(answer.trim(), &question.answer_hash) {
            return Err(ApiError::unauthorized("Recovery failed"));
        }
    }

    let password_hash = hash_password(&request.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    sqlx::query("UPDATE usuarios SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    // Invalidate every live session for the account
    sqlx::query("DELETE FROM sesiones WHERE usuario_id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(usuario = %user.nombre, "Password recovered via security questions");

    NotificationService::new(state.db.clone())
        .notify_admins(
            NotificationKind::RecuperacionPassword,
            "Contraseña recuperada",
            &format!("{} restableció su contraseña", user.nombre),
            Some(("usuario", &user.id)),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// -------------------------------------------------------------------------
// Middleware
// -------------------------------------------------------------------------

/// Auth middleware: requires a live session
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    get_current_user(&state.db, &token).await?;
    Ok(next.run(request).await)
}

/// Paths a delinquent resident may still reach: payment submission and
/// listing, receipt retrieval, auth and the notification bell. Nesting
/// strips the `/api` prefix before this middleware runs, so both forms
/// are accepted.
fn allowed_while_delinquent(path: &str) -> bool {
    let path = path.strip_prefix("/api").unwrap_or(path);
    path.starts_with("/pagos") || path.starts_with("/auth") || path.starts_with("/notificaciones")
}

/// Session gate: a Moroso resident is restricted to the payment screen.
/// The status is read from the database on every request, so an admin
/// decision or a scan takes effect immediately. Admins bypass the gate.
pub async fn delinquency_gate(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let user = get_current_user(&state.db, &token).await?;

    if !user.is_admin()
        && user.status() == crate::db::ResidentStatus::Moroso
        && !allowed_while_delinquent(request.uri().path())
    {
        return Err(ApiError::delinquent());
    }

    Ok(next.run(request).await)
}

/// Extractor for the current authenticated user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
        get_current_user(&state.db, &token).await
    }
}

// -------------------------------------------------------------------------
// Bootstrap
// -------------------------------------------------------------------------

/// Create the bootstrap admin user if no admin exists yet
pub async fn ensure_admin_user(
    pool: &sqlx::SqlitePool,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM usuarios WHERE lower(rol) IN ('admin', 'administrador')",
    )
    .fetch_one(pool)
    .await?;

    if count.0 > 0 {
        return Ok(());
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    sqlx::query(
        "INSERT INTO usuarios (id, nombre, email, password_hash, rol) VALUES (?, 'Administrador', ?, ?, 'admin')",
    )
    .bind(&id)
    .bind(email)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    tracing::info!(email = %email, "Created bootstrap admin user");
    Ok(())
}
