//! Manual delinquency scan trigger for the administrative page.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::User;
use crate::engine::delinquency::{DelinquencyScanner, ScanSummary};
use crate::AppState;

use super::auth::require_admin;
use super::error::ApiError;

/// Run a full scan now and return the summary table
pub async fn run_scan(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<ScanSummary>, ApiError> {
    require_admin(&user)?;

    let scanner = DelinquencyScanner::new(state.db.clone());
    let summary = scanner.run_scan().await.map_err(|e| {
        tracing::error!(error = %e, "Manual delinquency scan failed");
        ApiError::internal("Delinquency scan failed")
    })?;

    Ok(Json(summary))
}
