//! Receipt artifact models (`archivos` table).

use sqlx::FromRow;

/// A stored receipt artifact. Content is kept inline as a BLOB; an artifact
/// with no referencing payment is inert (accepted leak after a failed
/// submission, never corruption).
#[derive(Debug, Clone, FromRow)]
pub struct Receipt {
    pub id: String,
    pub usuario_id: String,
    pub nombre: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub contenido: Vec<u8>,
    pub created_at: String,
}
