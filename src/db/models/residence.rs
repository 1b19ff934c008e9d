//! Residence (housing unit) models and the user-residence membership link.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Residence {
    pub id: String,
    pub numero: String,
    pub descripcion: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateResidenceRequest {
    pub numero: String,
    pub descripcion: Option<String>,
}

/// Request to associate a user with a residence
#[derive(Debug, Deserialize)]
pub struct AssignResidenceRequest {
    pub usuario_id: String,
}
