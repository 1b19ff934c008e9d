//! Notification models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Event categories carried by notifications
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PagoRecibido,
    PagoAprobado,
    PagoRechazado,
    EstadoCuenta,
    RecuperacionPassword,
    AnuncioEliminado,
    Mantenimiento,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PagoRecibido => write!(f, "pago_recibido"),
            Self::PagoAprobado => write!(f, "pago_aprobado"),
            Self::PagoRechazado => write!(f, "pago_rechazado"),
            Self::EstadoCuenta => write!(f, "estado_cuenta"),
            Self::RecuperacionPassword => write!(f, "recuperacion_password"),
            Self::AnuncioEliminado => write!(f, "anuncio_eliminado"),
            Self::Mantenimiento => write!(f, "mantenimiento"),
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pago_recibido" => Ok(Self::PagoRecibido),
            "pago_aprobado" => Ok(Self::PagoAprobado),
            "pago_rechazado" => Ok(Self::PagoRechazado),
            "estado_cuenta" => Ok(Self::EstadoCuenta),
            "recuperacion_password" => Ok(Self::RecuperacionPassword),
            "anuncio_eliminado" => Ok(Self::AnuncioEliminado),
            "mantenimiento" => Ok(Self::Mantenimiento),
            _ => Err(format!("Unknown notification kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub usuario_id: String,
    pub tipo: String,
    pub titulo: String,
    pub mensaje: String,
    pub leida: i64,
    pub requiere_accion: i64,
    pub entidad_tipo: Option<String>,
    pub entidad_id: Option<String>,
    pub created_at: String,
    pub read_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub tipo: String,
    pub titulo: String,
    pub mensaje: String,
    pub leida: bool,
    pub requiere_accion: bool,
    pub entidad_tipo: Option<String>,
    pub entidad_id: Option<String>,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            tipo: n.tipo,
            titulo: n.titulo,
            mensaje: n.mensaje,
            leida: n.leida != 0,
            requiere_accion: n.requiere_accion != 0,
            entidad_tipo: n.entidad_tipo,
            entidad_id: n.entidad_id,
            created_at: n.created_at,
            read_at: n.read_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}
