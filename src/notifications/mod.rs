//! Notification fan-out.
//!
//! Every business flow that produces a notification goes through
//! [`NotificationService`]. Insertion failures are logged and swallowed:
//! a payment submission or validation must succeed even when the
//! notification row cannot be written.

use crate::db::{DbPool, NotificationKind};
use uuid::Uuid;

pub struct NotificationService {
    db: DbPool,
}

impl NotificationService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Insert a notification for a single recipient. Best-effort.
    pub async fn notify(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        entity: Option<(&str, &str)>,
    ) {
        if let Err(e) = self
            .insert(recipient_id, kind, title, message, entity, false)
            .await
        {
            tracing::warn!(
                recipient = %recipient_id,
                kind = %kind,
                error = %e,
                "Failed to insert notification"
            );
        }
    }

    /// Broadcast to every admin by inserting one row per admin. Best-effort;
    /// a failure for one admin does not stop the rest.
    pub async fn notify_admins(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        entity: Option<(&str, &str)>,
    ) {
        let admins: Vec<(String,)> = match sqlx::query_as(
            "SELECT id FROM usuarios WHERE lower(rol) IN ('admin', 'administrador')",
        )
        .fetch_all(&self.db)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list admins for notification fan-out");
                return;
            }
        };

        for (admin_id,) in admins {
            if let Err(e) = self
                .insert(&admin_id, kind, title, message, entity, true)
                .await
            {
                tracing::warn!(
                    recipient = %admin_id,
                    kind = %kind,
                    error = %e,
                    "Failed to insert admin notification"
                );
            }
        }
    }

    /// Broadcast to every non-admin user. Best-effort, same isolation as
    /// the admin fan-out.
    pub async fn notify_residents(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        entity: Option<(&str, &str)>,
    ) {
        let residents: Vec<(String,)> = match sqlx::query_as(
            "SELECT id FROM usuarios WHERE lower(rol) NOT IN ('admin', 'administrador')",
        )
        .fetch_all(&self.db)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list residents for notification fan-out");
                return;
            }
        };

        for (user_id,) in residents {
            if let Err(e) = self
                .insert(&user_id, kind, title, message, entity, false)
                .await
            {
                tracing::warn!(
                    recipient = %user_id,
                    kind = %kind,
                    error = %e,
                    "Failed to insert resident notification"
                );
            }
        }
    }

    async fn insert(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        entity: Option<(&str, &str)>,
        requires_action: bool,
    ) -> Result<(), sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let (entity_type, entity_id) = match entity {
            Some((t, i)) => (Some(t), Some(i)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO notificaciones
                (id, usuario_id, tipo, titulo, mensaje, leida, requiere_accion, entidad_tipo, entidad_id, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(recipient_id)
        .bind(kind.to_string())
        .bind(title)
        .bind(message)
        .bind(if requires_action { 1 } else { 0 })
        .bind(entity_type)
        .bind(entity_id)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_user(pool: &DbPool, id: &str, rol: &str) {
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
    }

    #[tokio::test]
    async fn notify_admins_inserts_one_row_per_admin() {
        let pool = test_pool().await;
        seed_user(&pool, "a1", "admin").await;
        seed_user(&pool, "a2", "Administrador").await;
        seed_user(&pool, "r1", "residente").await;

        let service = NotificationService::new(pool.clone());
        service
            .notify_admins(
                NotificationKind::PagoRecibido,
                "Nuevo pago",
                "Un pago espera revisión",
                Some(("pago", "p-1")),
            )
            .await;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notificaciones")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);

        let resident_rows: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notificaciones WHERE usuario_id = 'r1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(resident_rows.0, 0);
    }

    #[tokio::test]
    async fn notify_failure_is_swallowed() {
        let pool = test_pool().await;
        // No such user: FK violation inside insert, but notify must not panic
        let service = NotificationService::new(pool.clone());
        service
            .notify(
                "missing-user",
                NotificationKind::PagoRechazado,
                "t",
                "m",
                None,
            )
            .await;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notificaciones")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
