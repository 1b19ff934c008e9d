//! Receipt artifact storage.
//!
//! Receipts live in the `archivos` table as inline BLOBs. The artifact is
//! written before the payment row; if the payment insert then fails the
//! artifact stays behind as an inert orphan, which is an accepted leak.

use crate::config::UploadConfig;
use crate::db::{DbPool, Receipt};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to persist receipt: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Validate and persist a receipt, returning the artifact id.
pub async fn store_receipt(
    pool: &DbPool,
    owner_id: &str,
    filename: &str,
    mime_type: &str,
    content: &[u8],
    config: &UploadConfig,
) -> Result<String, ReceiptError> {
    if content.is_empty() {
        return Err(ReceiptError::Validation(
            "Receipt file is required".to_string(),
        ));
    }
    if content.len() > config.max_receipt_bytes {
        return Err(ReceiptError::Validation(format!(
            "Receipt exceeds the {} byte limit",
            config.max_receipt_bytes
        )));
    }

    // Fall back to a filename-based guess when the client sends a generic type
    let effective_mime = if mime_type.is_empty() || mime_type == "application/octet-stream" {
        mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or(mime_type)
    } else {
        mime_type
    };

    if !mime_allowed(&config.allowed_mime_types, effective_mime) {
        return Err(ReceiptError::Validation(format!(
            "Unsupported receipt type: {}",
            effective_mime
        )));
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO archivos (id, usuario_id, nombre, mime_type, size_bytes, contenido, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(owner_id)
    .bind(filename)
    .bind(effective_mime)
    .bind(content.len() as i64)
    .bind(content)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::debug!(
        artifact = %id,
        owner = %owner_id,
        bytes = content.len(),
        mime = %effective_mime,
        "Stored receipt artifact"
    );

    Ok(id)
}

/// Entries ending in `/*` match any subtype of that top-level type
fn mime_allowed(allowed: &[String], mime: &str) -> bool {
    allowed.iter().any(|entry| match entry.strip_suffix("/*") {
        Some(prefix) => mime
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/')),
        None => entry == mime,
    })
}

/// Fetch a receipt with its payload
pub async fn fetch_receipt(pool: &DbPool, id: &str) -> Result<Option<Receipt>, sqlx::Error> {
    sqlx::query_as::<_, Receipt>("SELECT * FROM archivos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}
