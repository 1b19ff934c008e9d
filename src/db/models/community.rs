//! Ancillary community models: announcements, maintenance requests and
//! common spaces. Thin CRUD shapes only.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: String,
    pub autor_id: String,
    pub titulo: String,
    pub contenido: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub titulo: String,
    pub contenido: String,
}

/// Maintenance request states follow a simple open/in-progress/closed flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Abierta,
    EnProceso,
    Cerrada,
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abierta => write!(f, "abierta"),
            Self::EnProceso => write!(f, "en_proceso"),
            Self::Cerrada => write!(f, "cerrada"),
        }
    }
}

impl std::str::FromStr for MaintenanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abierta" => Ok(Self::Abierta),
            "en_proceso" => Ok(Self::EnProceso),
            "cerrada" => Ok(Self::Cerrada),
            _ => Err(format!("Unknown maintenance status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceRequest {
    pub id: String,
    pub usuario_id: String,
    pub titulo: String,
    pub descripcion: String,
    pub estado: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMaintenanceRequest {
    pub titulo: String,
    pub descripcion: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaintenanceRequest {
    pub estado: MaintenanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommonSpace {
    pub id: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub capacidad: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommonSpaceRequest {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub capacidad: Option<i64>,
}
