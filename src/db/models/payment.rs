//! Payment and payment history models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a payment.
///
/// Residents create payments in `Pendiente`. Only an administrator moves a
/// payment to `Aprobado` or `Rechazado`, which are terminal. `Vencido` is
/// assigned by the delinquency scan when the due date passes while the
/// payment is still undecided; it is not user-invokable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pendiente,
    Aprobado,
    Rechazado,
    Vencido,
    Pagado,
}

impl PaymentStatus {
    /// A decided payment can never be re-validated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aprobado | Self::Rechazado | Self::Pagado)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pendiente => write!(f, "pendiente"),
            Self::Aprobado => write!(f, "aprobado"),
            Self::Rechazado => write!(f, "rechazado"),
            Self::Vencido => write!(f, "vencido"),
            Self::Pagado => write!(f, "pagado"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pendiente" => Ok(Self::Pendiente),
            "aprobado" => Ok(Self::Aprobado),
            "rechazado" => Ok(Self::Rechazado),
            "vencido" => Ok(Self::Vencido),
            "pagado" => Ok(Self::Pagado),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Pendiente)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub usuario_id: String,
    pub vivienda_id: String,
    pub concepto: String,
    pub monto: f64,
    pub tipo: String,
    pub fecha_vencimiento: Option<String>,
    pub estado: String,
    pub archivo_id: Option<String>,
    pub observaciones: Option<String>,
    pub motivo_rechazo: Option<String>,
    pub referencia: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        self.estado.clone().into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: String,
    pub usuario_id: String,
    pub vivienda_id: String,
    pub concepto: String,
    pub monto: f64,
    pub tipo: String,
    pub fecha_vencimiento: Option<String>,
    pub estado: String,
    pub archivo_id: Option<String>,
    pub observaciones: Option<String>,
    pub motivo_rechazo: Option<String>,
    pub referencia: Option<String>,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            usuario_id: p.usuario_id,
            vivienda_id: p.vivienda_id,
            concepto: p.concepto,
            monto: p.monto,
            tipo: p.tipo,
            fecha_vencimiento: p.fecha_vencimiento,
            estado: p.estado,
            archivo_id: p.archivo_id,
            observaciones: p.observaciones,
            motivo_rechazo: p.motivo_rechazo,
            referencia: p.referencia,
            created_at: p.created_at,
        }
    }
}

/// Administrator decision on a pending payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationDecision {
    Aprobado,
    Rechazado,
}

impl ValidationDecision {
    pub fn as_status(&self) -> PaymentStatus {
        match self {
            Self::Aprobado => PaymentStatus::Aprobado,
            Self::Rechazado => PaymentStatus::Rechazado,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidatePaymentRequest {
    pub decision: ValidationDecision,
    pub motivo: Option<String>,
}

/// Audit entry recording an administrator's validation decision
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentHistoryEntry {
    pub id: String,
    pub pago_id: String,
    pub admin_id: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
    pub motivo: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decided_statuses_are_terminal() {
        assert!(PaymentStatus::Aprobado.is_terminal());
        assert!(PaymentStatus::Rechazado.is_terminal());
        assert!(PaymentStatus::Pagado.is_terminal());
        assert!(!PaymentStatus::Pendiente.is_terminal());
        assert!(!PaymentStatus::Vencido.is_terminal());
    }

    #[test]
    fn status_parses_case_insensitive() {
        assert_eq!(
            "Pendiente".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Pendiente
        );
        assert!("cancelado".parse::<PaymentStatus>().is_err());
    }
}
