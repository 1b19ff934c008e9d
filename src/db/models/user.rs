//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role of a community member
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Propietario,
    Residente,
    Conserje,
    Invitado,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Propietario => write!(f, "propietario"),
            Self::Residente => write!(f, "residente"),
            Self::Conserje => write!(f, "conserje"),
            Self::Invitado => write!(f, "invitado"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            // "administrador" is the label used by legacy imports
            "admin" | "administrador" => Ok(Self::Admin),
            "propietario" => Ok(Self::Propietario),
            "residente" => Ok(Self::Residente),
            "conserje" => Ok(Self::Conserje),
            "invitado" => Ok(Self::Invitado),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Invitado)
    }
}

/// Delinquency status. A cached projection over outstanding payments,
/// recomputed by the delinquency engine; never a source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResidentStatus {
    Activo,
    Moroso,
}

impl std::fmt::Display for ResidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activo => write!(f, "Activo"),
            Self::Moroso => write!(f, "Moroso"),
        }
    }
}

impl std::str::FromStr for ResidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activo" => Ok(Self::Activo),
            "moroso" => Ok(Self::Moroso),
            _ => Err(format!("Unknown resident status: {}", s)),
        }
    }
}

impl From<String> for ResidentStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Activo)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub password_hash: String,
    pub rol: String,
    pub estado: String,
    pub security_questions: Option<String>,
    pub telefono: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn role(&self) -> Role {
        self.rol.clone().into()
    }

    pub fn status(&self) -> ResidentStatus {
        self.estado.clone().into()
    }

    /// Admins are exempt from delinquency logic and bypass the session gate.
    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Security question with a salted answer hash, stored as a JSON array
/// in `usuarios.security_questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestion {
    pub question: String,
    pub answer_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub nombre: String,
    pub email: String,
    pub rol: String,
    pub estado: String,
    pub telefono: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nombre: user.nombre,
            email: user.email,
            rol: user.rol,
            estado: user.estado,
            telefono: user.telefono,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub usuario_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Request to register a resident. Status always starts as Activo with no
/// payments attached.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub nombre: String,
    pub email: String,
    pub password: String,
    pub rol: Option<String>,
    pub telefono: Option<String>,
    pub security_questions: Option<Vec<PlainSecurityQuestion>>,
}

/// Security question as submitted (plain answer, hashed before storage)
#[derive(Debug, Deserialize)]
pub struct PlainSecurityQuestion {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryQuestionsQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RecoveryQuestionsResponse {
    pub questions: Vec<String>,
}

/// Password recovery: answers must match the stored question order.
#[derive(Debug, Deserialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
    pub answers: Vec<String>,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_admin_label_parses_as_admin() {
        assert_eq!("Administrador".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("ADMINISTRADOR".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn status_roundtrip() {
        assert_eq!(ResidentStatus::Moroso.to_string(), "Moroso");
        assert_eq!(
            "moroso".parse::<ResidentStatus>().unwrap(),
            ResidentStatus::Moroso
        );
        assert_eq!(
            ResidentStatus::from("Activo".to_string()),
            ResidentStatus::Activo
        );
    }

    #[test]
    fn unknown_role_defaults_to_invitado() {
        assert_eq!(Role::from("vigilante".to_string()), Role::Invitado);
    }
}
