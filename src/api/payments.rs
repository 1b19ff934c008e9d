//! Payment submission, validation and receipt retrieval.
//!
//! Residents submit payments with a mandatory receipt against a residence
//! they are verified to belong to. Administrators create charges, decide
//! pending payments, and every decision lands in `historial_pagos`.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::{
    DbPool, NotificationKind, Payment, PaymentHistoryEntry, PaymentResponse, User,
    ValidatePaymentRequest, ValidationDecision,
};
use crate::engine::delinquency::recompute_user_status;
use crate::notifications::NotificationService;
use crate::storage::{self, ReceiptError};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;
use super::validation::{parse_amount, validate_due_date, validate_unit_number};

/// Receipt file as received from the client
pub struct ReceiptUpload {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Parsed submission fields, decoupled from the multipart transport
#[derive(Default)]
pub struct PaymentSubmission {
    pub vivienda: String,
    pub descripcion: String,
    pub monto: Option<String>,
    pub referencia: Option<String>,
    pub observaciones: Option<String>,
    pub receipt: Option<ReceiptUpload>,
}

/// Resolve a unit number to a residence the resident belongs to.
/// Any failed resolution is an ownership error; the caller learns nothing
/// about whether the unit exists.
async fn resolve_owned_residence(
    pool: &DbPool,
    usuario_id: &str,
    numero: &str,
) -> Result<String, ApiError> {
    let residence: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT v.id FROM viviendas v
        JOIN usuario_vivienda uv ON uv.vivienda_id = v.id
        WHERE uv.usuario_id = ? AND v.numero = ?
        "#,
    )
    .bind(usuario_id)
    .bind(numero.trim())
    .fetch_optional(pool)
    .await?;

    residence
        .map(|(id,)| id)
        .ok_or_else(|| ApiError::ownership("Residence is not associated with this account"))
}

/// Core submission flow: validate, resolve ownership, persist the receipt,
/// then insert the payment in `pendiente`. The receipt is written first; a
/// later payment failure leaves only an inert artifact behind.
pub async fn submit_payment(
    pool: &DbPool,
    uploads: &UploadConfig,
    user: &User,
    submission: PaymentSubmission,
) -> Result<Payment, ApiError> {
    if submission.descripcion.trim().is_empty() {
        return Err(ApiError::validation("descripcion", "Description is required"));
    }
    validate_unit_number(&submission.vivienda)
        .map_err(|e| ApiError::validation("vivienda", e))?;
    let monto = parse_amount(submission.monto.as_deref())
        .map_err(|e| ApiError::validation("monto", e))?;

    let receipt = submission
        .receipt
        .ok_or_else(|| ApiError::validation("comprobante", "Receipt file is required"))?;

    let vivienda_id = resolve_owned_residence(pool, &user.id, &submission.vivienda).await?;

    let archivo_id = storage::store_receipt(
        pool,
        &user.id,
        &receipt.filename,
        &receipt.mime_type,
        &receipt.content,
        uploads,
    )
    .await
    .map_err(|e| match e {
        ReceiptError::Validation(msg) => ApiError::validation("comprobante", msg),
        ReceiptError::Storage(err) => {
            tracing::error!(error = %err, "Receipt upload failed");
            ApiError::storage("Could not store the receipt, please retry")
        }
    })?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now();
    let concepto = format!(
        "{} - {}",
        submission.descripcion.trim(),
        now.format("%Y-%m-%d %H:%M")
    );

    sqlx::query(
        r#"
        INSERT INTO pagos
            (id, usuario_id, vivienda_id, concepto, monto, tipo, estado, archivo_id,
             observaciones, referencia, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'mantenimiento', 'pendiente', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&vivienda_id)
    .bind(&concepto)
    .bind(monto)
    .bind(&archivo_id)
    .bind(&submission.observaciones)
    .bind(&submission.referencia)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(pago = %id, usuario = %user.nombre, monto = monto, "Payment submitted");

    NotificationService::new(pool.clone())
        .notify_admins(
            NotificationKind::PagoRecibido,
            "Nuevo pago por revisar",
            &format!("{} registró un pago pendiente de validación", user.nombre),
            Some(("pago", &id)),
        )
        .await;

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM pagos WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await?;

    Ok(payment)
}

/// Core validation flow: admin decides a pending payment exactly once.
pub async fn validate_payment(
    pool: &DbPool,
    admin: &User,
    payment_id: &str,
    decision: ValidationDecision,
    motivo: Option<String>,
) -> Result<Payment, ApiError> {
    require_admin(admin)?;

    let payment: Payment = sqlx::query_as("SELECT * FROM pagos WHERE id = ?")
        .bind(payment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;

    // Decided payments are terminal; re-validation is a deterministic error
    if payment.status().is_terminal() {
        return Err(ApiError::conflict(format!(
            "Payment is already {}",
            payment.estado
        )));
    }

    let new_status = decision.as_status();
    let motivo_rechazo = match decision {
        ValidationDecision::Rechazado => motivo.clone(),
        ValidationDecision::Aprobado => None,
    };
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("UPDATE pagos SET estado = ?, motivo_rechazo = ?, updated_at = ? WHERE id = ?")
        .bind(new_status.to_string())
        .bind(&motivo_rechazo)
        .bind(&now)
        .bind(payment_id)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO historial_pagos (id, pago_id, admin_id, estado_anterior, estado_nuevo, motivo, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(payment_id)
    .bind(&admin.id)
    .bind(&payment.estado)
    .bind(new_status.to_string())
    .bind(&motivo)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!(
        pago = %payment_id,
        admin = %admin.nombre,
        decision = %new_status,
        "Payment validated"
    );

    let (kind, title, message) = match decision {
        ValidationDecision::Aprobado => (
            NotificationKind::PagoAprobado,
            "Pago aprobado",
            format!("Su pago \"{}\" fue aprobado", payment.concepto),
        ),
        ValidationDecision::Rechazado => {
            let reason = motivo
                .as_deref()
                .map(|m| format!(": {}", m))
                .unwrap_or_default();
            (
                NotificationKind::PagoRechazado,
                "Pago rechazado",
                format!("Su pago \"{}\" fue rechazado{}", payment.concepto, reason),
            )
        }
    };
    NotificationService::new(pool.clone())
        .notify(
            &payment.usuario_id,
            kind,
            title,
            &message,
            Some(("pago", payment_id)),
        )
        .await;

    // Clear or set the resident's Moroso flag right away instead of waiting
    // for the next periodic scan. The decision above is already committed,
    // so a recompute failure is logged rather than surfaced.
    let today = chrono::Local::now().date_naive();
    if let Err(e) = recompute_user_status(pool, &payment.usuario_id, today).await {
        tracing::warn!(
            usuario = %payment.usuario_id,
            error = %e,
            "Post-validation delinquency recompute failed"
        );
    }

    let updated = sqlx::query_as::<_, Payment>("SELECT * FROM pagos WHERE id = ?")
        .bind(payment_id)
        .fetch_one(pool)
        .await?;

    Ok(updated)
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Submit a payment (multipart: vivienda, descripcion, monto?, referencia?,
/// observaciones?, comprobante file)
pub async fn submit(
    State(state): State<Arc<AppState>>,
    user: User,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let mut submission = PaymentSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "comprobante" => {
                let filename = field.file_name().unwrap_or("comprobante").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read receipt: {}", e)))?
                    .to_vec();
                submission.receipt = Some(ReceiptUpload {
                    filename,
                    mime_type,
                    content,
                });
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid field {}: {}", other, e)))?;
                match other {
                    "vivienda" => submission.vivienda = value,
                    "descripcion" => submission.descripcion = value,
                    "monto" => submission.monto = Some(value),
                    "referencia" => submission.referencia = Some(value),
                    "observaciones" => submission.observaciones = Some(value),
                    _ => {}
                }
            }
        }
    }

    let payment = submit_payment(&state.db, &state.config.uploads, &user, submission).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    /// Admin-only filter; residents always see their own payments
    pub usuario_id: Option<String>,
    pub estado: Option<String>,
}

/// List payments. Residents see their own; admins see everyone's and may
/// filter by user and status.
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments: Vec<Payment> = if user.is_admin() {
        match (&query.usuario_id, &query.estado) {
            (Some(uid), Some(estado)) => {
                sqlx::query_as(
                    "SELECT * FROM pagos WHERE usuario_id = ? AND estado = ? ORDER BY created_at DESC",
                )
                .bind(uid)
                .bind(estado)
                .fetch_all(&state.db)
                .await?
            }
            (Some(uid), None) => {
                sqlx::query_as("SELECT * FROM pagos WHERE usuario_id = ? ORDER BY created_at DESC")
                    .bind(uid)
                    .fetch_all(&state.db)
                    .await?
            }
            (None, Some(estado)) => {
                sqlx::query_as("SELECT * FROM pagos WHERE estado = ? ORDER BY created_at DESC")
                    .bind(estado)
                    .fetch_all(&state.db)
                    .await?
            }
            (None, None) => {
                sqlx::query_as("SELECT * FROM pagos ORDER BY created_at DESC")
                    .fetch_all(&state.db)
                    .await?
            }
        }
    } else {
        sqlx::query_as("SELECT * FROM pagos WHERE usuario_id = ? ORDER BY created_at DESC")
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?
    };

    Ok(Json(payments.into_iter().map(|p| p.into()).collect()))
}

/// Get a single payment; owner or admin only
pub async fn get(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment: Payment = sqlx::query_as("SELECT * FROM pagos WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;

    if !user.is_admin() && payment.usuario_id != user.id {
        return Err(ApiError::forbidden("Not your payment"));
    }

    Ok(Json(payment.into()))
}

/// Decide a pending payment (admin)
pub async fn validate(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(request): Json<ValidatePaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment =
        validate_payment(&state.db, &user, &id, request.decision, request.motivo).await?;
    Ok(Json(payment.into()))
}

/// Stream the receipt artifact for a payment; owner or admin only
pub async fn receipt(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let payment: Payment = sqlx::query_as("SELECT * FROM pagos WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))?;

    if !user.is_admin() && payment.usuario_id != user.id {
        return Err(ApiError::forbidden("Not your payment"));
    }

    let archivo_id = payment
        .archivo_id
        .ok_or_else(|| ApiError::not_found("Payment has no receipt"))?;

    let receipt = storage::fetch_receipt(&state.db, &archivo_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Receipt artifact is missing"))?;

    Ok((
        [
            (header::CONTENT_TYPE, receipt.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", receipt.nombre),
            ),
        ],
        receipt.contenido,
    )
        .into_response())
}

/// Validation history for a payment (admin)
pub async fn history(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentHistoryEntry>>, ApiError> {
    require_admin(&user)?;

    let entries: Vec<PaymentHistoryEntry> =
        sqlx::query_as("SELECT * FROM historial_pagos WHERE pago_id = ? ORDER BY created_at DESC")
            .bind(&id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(entries))
}

/// Administrative charge creation: a due-dated obligation with no receipt
#[derive(Debug, Deserialize)]
pub struct CreateChargeRequest {
    pub usuario_id: String,
    pub vivienda_id: String,
    pub concepto: String,
    pub monto: f64,
    pub tipo: Option<String>,
    pub fecha_vencimiento: Option<String>,
}

pub async fn create_charge(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateChargeRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    require_admin(&user)?;

    if request.concepto.trim().is_empty() {
        return Err(ApiError::validation("concepto", "Concept is required"));
    }
    if !request.monto.is_finite() || request.monto < 0.0 {
        return Err(ApiError::validation(
            "monto",
            "Amount must be a non-negative number",
        ));
    }
    if let Some(ref fecha) = request.fecha_vencimiento {
        validate_due_date(fecha).map_err(|e| ApiError::validation("fecha_vencimiento", e))?;
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO pagos
            (id, usuario_id, vivienda_id, concepto, monto, tipo, fecha_vencimiento, estado, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pendiente', ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&request.usuario_id)
    .bind(&request.vivienda_id)
    .bind(request.concepto.trim())
    .bind(request.monto)
    .bind(request.tipo.as_deref().unwrap_or("mantenimiento"))
    .bind(&request.fecha_vencimiento)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM pagos WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(payment.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_user(pool: &DbPool, id: &str, rol: &str) -> User {
        sqlx::query(
            "INSERT INTO usuarios (id, nombre, email, password_hash, rol) VALUES (?, ?, ?, 'x', ?)",
        )
        .bind(id)
        .bind(format!("user-{}", id))
        .bind(format!("{}@test.local", id))
        .bind(rol)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_residence(pool: &DbPool, id: &str, numero: &str, owner: &str) {
        sqlx::query("INSERT INTO viviendas (id, numero) VALUES (?, ?)")
            .bind(id)
            .bind(numero)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO usuario_vivienda (usuario_id, vivienda_id) VALUES (?, ?)")
            .bind(owner)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    fn receipt() -> ReceiptUpload {
        ReceiptUpload {
            filename: "recibo.png".to_string(),
            mime_type: "image/png".to_string(),
            content: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    fn submission(vivienda: &str) -> PaymentSubmission {
        PaymentSubmission {
            vivienda: vivienda.to_string(),
            descripcion: "Cuota junio".to_string(),
            monto: Some("1500".to_string()),
            receipt: Some(receipt()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submission_succeeds_for_owned_residence() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        let uploads = UploadConfig::default();
        let payment = submit_payment(&pool, &uploads, &user, submission("A-12"))
            .await
            .unwrap();

        assert_eq!(payment.estado, "pendiente");
        assert_eq!(payment.monto, 1500.0);
        assert!(payment.archivo_id.is_some());
        assert!(payment.concepto.starts_with("Cuota junio - "));
    }

    #[tokio::test]
    async fn submission_fails_for_foreign_residence() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        let _other = seed_user(&pool, "u2", "residente").await;
        seed_residence(&pool, "v2", "B-7", "u2").await;

        let uploads = UploadConfig::default();
        let err = submit_payment(&pool, &uploads, &user, submission("B-7"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::api::error::ErrorCode::OwnershipError);

        // No payment and no orphan receipt: ownership is checked first
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pagos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn submission_requires_a_receipt() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        let mut sub = submission("A-12");
        sub.receipt = None;

        let uploads = UploadConfig::default();
        let err = submit_payment(&pool, &uploads, &user, sub).await.unwrap_err();
        assert_eq!(err.code(), crate::api::error::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn submission_rejects_negative_amount_and_empty_description() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;
        let uploads = UploadConfig::default();

        let mut bad_amount = submission("A-12");
        bad_amount.monto = Some("-5".to_string());
        assert!(submit_payment(&pool, &uploads, &user, bad_amount).await.is_err());

        let mut no_desc = submission("A-12");
        no_desc.descripcion = "  ".to_string();
        assert!(submit_payment(&pool, &uploads, &user, no_desc).await.is_err());
    }

    #[tokio::test]
    async fn storage_failure_aborts_submission_without_payment_row() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        // Make every receipt insert fail at the database level
        sqlx::query("DROP TABLE archivos").execute(&pool).await.unwrap();

        let uploads = UploadConfig::default();
        let err = submit_payment(&pool, &uploads, &user, submission("A-12"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::api::error::ErrorCode::StorageError);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pagos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn omitted_amount_is_stored_as_zero() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        let mut sub = submission("A-12");
        sub.monto = None;

        let uploads = UploadConfig::default();
        let payment = submit_payment(&pool, &uploads, &user, sub).await.unwrap();
        assert_eq!(payment.monto, 0.0);
    }

    #[tokio::test]
    async fn submission_notifies_admins() {
        let pool = test_pool().await;
        let _admin = seed_user(&pool, "a1", "admin").await;
        let user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        let uploads = UploadConfig::default();
        submit_payment(&pool, &uploads, &user, submission("A-12"))
            .await
            .unwrap();

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notificaciones WHERE usuario_id = 'a1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn validation_is_terminal_and_recomputes_status() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "a1", "admin").await;
        let _user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;

        // Overdue charge makes the user Moroso
        sqlx::query(
            "INSERT INTO pagos (id, usuario_id, vivienda_id, concepto, estado, fecha_vencimiento) VALUES ('p1', 'u1', 'v1', 'cuota', 'pendiente', '2000-01-01')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("UPDATE usuarios SET estado = 'Moroso' WHERE id = 'u1'")
            .execute(&pool)
            .await
            .unwrap();

        let payment =
            validate_payment(&pool, &admin, "p1", ValidationDecision::Aprobado, None)
                .await
                .unwrap();
        assert_eq!(payment.estado, "aprobado");

        // Approval clears the Moroso flag synchronously
        let estado: String = sqlx::query_scalar("SELECT estado FROM usuarios WHERE id = 'u1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(estado, "Activo");

        // Second decision on the same payment is a deterministic conflict
        let err = validate_payment(&pool, &admin, "p1", ValidationDecision::Rechazado, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::api::error::ErrorCode::Conflict);

        // Exactly one audit entry; the resident hears about the decision and
        // about the status flip the recompute produced
        let audit: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM historial_pagos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(audit.0, 1);
        let approved: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notificaciones WHERE usuario_id = 'u1' AND tipo = 'pago_aprobado'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(approved.0, 1);
        let status: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notificaciones WHERE usuario_id = 'u1' AND tipo = 'estado_cuenta'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status.0, 1);
    }

    #[tokio::test]
    async fn rejection_persists_the_reason() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "a1", "admin").await;
        let _user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;
        sqlx::query(
            "INSERT INTO pagos (id, usuario_id, vivienda_id, concepto, estado) VALUES ('p1', 'u1', 'v1', 'cuota', 'pendiente')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let payment = validate_payment(
            &pool,
            &admin,
            "p1",
            ValidationDecision::Rechazado,
            Some("Comprobante ilegible".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(payment.estado, "rechazado");
        assert_eq!(payment.motivo_rechazo.as_deref(), Some("Comprobante ilegible"));
    }

    #[tokio::test]
    async fn non_admin_cannot_validate() {
        let pool = test_pool().await;
        let resident = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;
        sqlx::query(
            "INSERT INTO pagos (id, usuario_id, vivienda_id, concepto, estado) VALUES ('p1', 'u1', 'v1', 'cuota', 'pendiente')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = validate_payment(&pool, &resident, "p1", ValidationDecision::Aprobado, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::api::error::ErrorCode::Forbidden);

        let estado: String = sqlx::query_scalar("SELECT estado FROM pagos WHERE id = 'p1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(estado, "pendiente");
    }

    #[tokio::test]
    async fn overdue_payment_can_still_be_validated() {
        let pool = test_pool().await;
        let admin = seed_user(&pool, "a1", "admin").await;
        let _user = seed_user(&pool, "u1", "residente").await;
        seed_residence(&pool, "v1", "A-12", "u1").await;
        sqlx::query(
            "INSERT INTO pagos (id, usuario_id, vivienda_id, concepto, estado, fecha_vencimiento) VALUES ('p1', 'u1', 'v1', 'cuota', 'vencido', '2000-01-01')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let payment = validate_payment(&pool, &admin, "p1", ValidationDecision::Aprobado, None)
            .await
            .unwrap();
        assert_eq!(payment.estado, "aprobado");
    }
}
