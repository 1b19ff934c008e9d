//! Delinquency recomputation engine.
//!
//! Scans every non-admin user, decides whether they hold an overdue
//! obligation, and caches the result as the user's estado (Activo/Moroso).
//! Runs as a periodic background task and can also be triggered manually
//! from the admin API. A failure for one user never aborts the pass.

use crate::config::DelinquencyConfig;
use crate::db::{NotificationKind, Payment, PaymentStatus, ResidentStatus, User};
use crate::notifications::NotificationService;
use crate::DbPool;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::time::{interval, Duration};

/// One user status flip recorded during a scan
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub usuario_id: String,
    pub nombre: String,
    pub estado_anterior: String,
    pub estado_nuevo: String,
}

/// Outcome of a full scan
#[derive(Debug, Default, Serialize)]
pub struct ScanSummary {
    /// Users examined
    pub total: u64,
    /// Users whose estado changed
    pub updated: u64,
    /// Users skipped because of a per-user failure
    pub errors: u64,
    pub changes: Vec<StatusChange>,
}

pub struct DelinquencyScanner {
    db: DbPool,
}

impl DelinquencyScanner {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Run a full scan against today's local calendar date.
    pub async fn run_scan(&self) -> Result<ScanSummary> {
        let today = chrono::Local::now().date_naive();
        self.run_scan_at(today).await
    }

    /// Run a full scan against an explicit reference date.
    ///
    /// Only a failure of this initial user fetch aborts the routine; every
    /// later failure is isolated to the user it belongs to.
    pub async fn run_scan_at(&self, today: NaiveDate) -> Result<ScanSummary> {
        let users: Vec<User> = sqlx::query_as(
            "SELECT * FROM usuarios WHERE lower(rol) NOT IN ('admin', 'administrador')",
        )
        .fetch_all(&self.db)
        .await?;

        let mut summary = ScanSummary {
            total: users.len() as u64,
            ..Default::default()
        };

        for user in users {
            match scan_user(&self.db, &user, today).await {
                Ok(Some(change)) => {
                    tracing::info!(
                        usuario = %change.nombre,
                        anterior = %change.estado_anterior,
                        nuevo = %change.estado_nuevo,
                        "Delinquency status changed"
                    );
                    summary.updated += 1;
                    summary.changes.push(change);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        usuario = %user.nombre,
                        error = %e,
                        "Failed to recompute delinquency status"
                    );
                    summary.errors += 1;
                }
            }
        }

        tracing::info!(
            total = summary.total,
            updated = summary.updated,
            errors = summary.errors,
            "Delinquency scan completed"
        );

        Ok(summary)
    }
}

/// Recompute a single user's status. Used by the scan and, synchronously,
/// by the payment validation flow so an approval clears the Moroso flag
/// without waiting for the next periodic pass.
pub async fn recompute_user_status(
    pool: &DbPool,
    usuario_id: &str,
    today: NaiveDate,
) -> Result<Option<StatusChange>> {
    let user: User = sqlx::query_as("SELECT * FROM usuarios WHERE id = ?")
        .bind(usuario_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow!("user {} not found", usuario_id))?;

    // Admins never participate in delinquency
    if user.is_admin() {
        return Ok(None);
    }

    scan_user(pool, &user, today).await
}

async fn scan_user(pool: &DbPool, user: &User, today: NaiveDate) -> Result<Option<StatusChange>> {
    let payments: Vec<Payment> = sqlx::query_as(
        "SELECT * FROM pagos WHERE usuario_id = ? AND estado IN ('pendiente', 'vencido')",
    )
    .bind(&user.id)
    .fetch_all(pool)
    .await?;

    // Parse every due date up front so a malformed row fails the whole user
    // before any write happens.
    let mut overdue_pending: Vec<&Payment> = Vec::new();
    let mut has_overdue = false;
    for payment in &payments {
        if let Some(raw) = payment.fecha_vencimiento.as_deref() {
            let due = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| anyhow!("payment {} has malformed due date {:?}", payment.id, raw))?;
            // A payment due today is not overdue
            if due < today {
                has_overdue = true;
                if payment.status() == PaymentStatus::Pendiente {
                    overdue_pending.push(payment);
                }
            }
        }
    }

    // Mark past-due pending payments as vencido
    for payment in overdue_pending {
        sqlx::query("UPDATE pagos SET estado = 'vencido', updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&payment.id)
            .execute(pool)
            .await?;
    }

    let target = if has_overdue {
        ResidentStatus::Moroso
    } else {
        ResidentStatus::Activo
    };

    if user.status() == target {
        return Ok(None);
    }

    sqlx::query("UPDATE usuarios SET estado = ?, updated_at = ? WHERE id = ?")
        .bind(target.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&user.id)
        .execute(pool)
        .await?;

    // Tell the resident their account status changed. Best-effort.
    let (titulo, mensaje) = match target {
        ResidentStatus::Moroso => (
            "Cuenta en estado Moroso",
            "Su cuenta pasó a Moroso por pagos vencidos",
        ),
        ResidentStatus::Activo => ("Cuenta al día", "Su cuenta volvió a estado Activo"),
    };
    NotificationService::new(pool.clone())
        .notify(&user.id, NotificationKind::EstadoCuenta, titulo, mensaje, None)
        .await;

    Ok(Some(StatusChange {
        usuario_id: user.id.clone(),
        nombre: user.nombre.clone(),
        estado_anterior: user.estado.clone(),
        estado_nuevo: target.to_string(),
    }))
}

/// Spawn the periodic delinquency scan task
pub fn spawn_delinquency_task(db: DbPool, config: DelinquencyConfig) {
    if !config.enabled {
        tracing::info!("Delinquency scan is disabled");
        return;
    }

    let interval_secs = config.scan_interval_seconds;
    tracing::info!(
        interval_secs = interval_secs,
        "Starting delinquency scan task"
    );

    let scanner = DelinquencyScanner::new(db);

    tokio::spawn(async move {
        // Let startup settle before the first pass
        tokio::time::sleep(Duration::from_secs(30)).await;

        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            if let Err(e) = scanner.run_scan().await {
                tracing::error!(error = %e, "Delinquency scan failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_user(pool: &DbPool, id: &str, rol: &str, estado: &str) {
        sqlx::query(
            "INSERT INTO usuarios (id, nombre, email, password_hash, rol, estado) VALUES (?, ?, ?, 'x', ?, ?)",
        )
        .bind(id)
        .bind(format!("user-{}", id))
        .bind(format!("{}@test.local", id))
        .bind(rol)
        .bind(estado)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_residence(pool: &DbPool, id: &str, numero: &str) {
        sqlx::query("INSERT INTO viviendas (id, numero) VALUES (?, ?)")
            .bind(id)
            .bind(numero)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn seed_payment(
        pool: &DbPool,
        id: &str,
        usuario_id: &str,
        estado: &str,
        fecha_vencimiento: Option<&str>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO pagos (id, usuario_id, vivienda_id, concepto, estado, fecha_vencimiento)
            VALUES (?, ?, 'v1', 'cuota', ?, ?)
            "#,
        )
        .bind(id)
        .bind(usuario_id)
        .bind(estado)
        .bind(fecha_vencimiento)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn user_estado(pool: &DbPool, id: &str) -> String {
        sqlx::query_scalar("SELECT estado FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn past_due_pending_payment_marks_user_moroso() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u42", "residente", "Activo").await;
        seed_payment(&pool, "p1", "u42", "pendiente", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.changes[0].estado_anterior, "Activo");
        assert_eq!(summary.changes[0].estado_nuevo, "Moroso");
        assert_eq!(user_estado(&pool, "u42").await, "Moroso");

        // The past-due pending payment is also flipped to vencido
        let estado: String = sqlx::query_scalar("SELECT estado FROM pagos WHERE id = 'p1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(estado, "vencido");
    }

    #[tokio::test]
    async fn payment_due_today_is_not_overdue() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u1", "residente", "Activo").await;
        seed_payment(&pool, "p1", "u1", "pendiente", Some("2024-06-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        assert_eq!(summary.updated, 0);
        assert_eq!(user_estado(&pool, "u1").await, "Activo");
    }

    #[tokio::test]
    async fn null_due_date_never_counts_as_overdue() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u1", "residente", "Activo").await;
        seed_payment(&pool, "p1", "u1", "pendiente", None).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2030-01-01")).await.unwrap();

        assert_eq!(summary.updated, 0);
        assert_eq!(user_estado(&pool, "u1").await, "Activo");
    }

    #[tokio::test]
    async fn approved_payments_do_not_keep_user_moroso() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u1", "residente", "Moroso").await;
        seed_payment(&pool, "p1", "u1", "aprobado", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.changes[0].estado_nuevo, "Activo");
        assert_eq!(user_estado(&pool, "u1").await, "Activo");
    }

    #[tokio::test]
    async fn scan_is_idempotent() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u1", "residente", "Activo").await;
        seed_user(&pool, "u2", "propietario", "Moroso").await;
        seed_payment(&pool, "p1", "u1", "pendiente", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let first = scanner.run_scan_at(date("2024-06-01")).await.unwrap();
        assert_eq!(first.updated, 2);

        let second = scanner.run_scan_at(date("2024-06-01")).await.unwrap();
        assert_eq!(second.updated, 0);
        assert!(second.changes.is_empty());
    }

    #[tokio::test]
    async fn admins_are_exempt_including_legacy_label() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "a1", "admin", "Activo").await;
        seed_user(&pool, "a2", "Administrador", "Activo").await;
        seed_payment(&pool, "p1", "a1", "pendiente", Some("2000-01-01")).await;
        seed_payment(&pool, "p2", "a2", "pendiente", Some("2000-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(user_estado(&pool, "a1").await, "Activo");
        assert_eq!(user_estado(&pool, "a2").await, "Activo");

        // The single-user path also refuses to touch admins
        let change = recompute_user_status(&pool, "a1", date("2024-06-01"))
            .await
            .unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn per_user_failure_does_not_abort_the_pass() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "bad", "residente", "Activo").await;
        seed_user(&pool, "good", "residente", "Activo").await;
        // Malformed due date makes recomputation fail for this user only
        seed_payment(&pool, "p1", "bad", "pendiente", Some("01/01/2024")).await;
        seed_payment(&pool, "p2", "good", "pendiente", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let summary = scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(user_estado(&pool, "bad").await, "Activo");
        assert_eq!(user_estado(&pool, "good").await, "Moroso");
    }

    #[tokio::test]
    async fn status_change_notifies_the_resident() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u1", "residente", "Activo").await;
        seed_payment(&pool, "p1", "u1", "pendiente", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        scanner.run_scan_at(date("2024-06-01")).await.unwrap();

        let tipos: Vec<(String,)> =
            sqlx::query_as("SELECT tipo FROM notificaciones WHERE usuario_id = 'u1'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(tipos, vec![("estado_cuenta".to_string(),)]);

        // No change on the second pass, so no second notification
        scanner.run_scan_at(date("2024-06-01")).await.unwrap();
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notificaciones WHERE usuario_id = 'u1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn example_scenario_moroso_then_approved_then_activo() {
        let pool = test_pool().await;
        seed_residence(&pool, "v1", "A-1").await;
        seed_user(&pool, "u42", "residente", "Activo").await;
        seed_payment(&pool, "p1", "u42", "pendiente", Some("2024-01-01")).await;

        let scanner = DelinquencyScanner::new(pool.clone());
        let first = scanner.run_scan_at(date("2024-06-01")).await.unwrap();
        assert_eq!(first.changes[0].estado_nuevo, "Moroso");

        // Admin approves the payment
        sqlx::query("UPDATE pagos SET estado = 'aprobado' WHERE id = 'p1'")
            .execute(&pool)
            .await
            .unwrap();

        let second = scanner.run_scan_at(date("2024-06-01")).await.unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(second.changes[0].estado_anterior, "Moroso");
        assert_eq!(second.changes[0].estado_nuevo, "Activo");
    }
}
