mod announcements;
pub mod auth;
mod delinquency;
pub mod error;
mod maintenance;
mod notifications;
pub mod payments;
mod residences;
mod spaces;
mod users;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_public = Router::new()
        .route("/login", post(auth::login))
        .route("/validate", get(auth::validate))
        .route("/recovery-questions", get(auth::recovery_questions))
        .route("/recover", post(auth::recover_password));

    // Auth routes that need a live session
    let auth_private = Router::new()
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Protected API routes, gated twice: session first, then the
    // delinquency gate which locks Moroso residents to the payment screen
    let api_routes = Router::new()
        // Payments
        .route("/pagos", get(payments::list))
        .route("/pagos", post(payments::submit))
        .route("/pagos/cargos", post(payments::create_charge))
        .route("/pagos/:id", get(payments::get))
        .route("/pagos/:id/validar", post(payments::validate))
        .route("/pagos/:id/comprobante", get(payments::receipt))
        .route("/pagos/:id/historial", get(payments::history))
        // Delinquency scan (admin page)
        .route("/delinquency/scan", post(delinquency::run_scan))
        // Notifications (bell)
        .route("/notificaciones", get(notifications::list))
        .route("/notificaciones/unread-count", get(notifications::unread_count))
        .route("/notificaciones/leidas", put(notifications::mark_all_read))
        .route("/notificaciones/leidas", delete(notifications::delete_read))
        .route("/notificaciones/:id/leida", put(notifications::mark_read))
        .route("/notificaciones/:id", delete(notifications::delete))
        // Users
        .route("/usuarios", get(users::list))
        .route("/usuarios", post(users::create))
        .route("/usuarios/:id", get(users::get))
        // Residences
        .route("/viviendas", get(residences::list))
        .route("/viviendas", post(residences::create))
        .route("/viviendas/mias", get(residences::mine))
        .route("/viviendas/:id/usuarios", post(residences::assign_user))
        // Announcements
        .route("/anuncios", get(announcements::list))
        .route("/anuncios", post(announcements::create))
        .route("/anuncios/:id", delete(announcements::delete))
        // Maintenance requests
        .route("/solicitudes", get(maintenance::list))
        .route("/solicitudes", post(maintenance::create))
        .route("/solicitudes/:id", put(maintenance::update))
        // Common spaces
        .route("/espacios", get(spaces::list))
        .route("/espacios", post(spaces::create))
        .route("/espacios/:id", delete(spaces::delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::delinquency_gate,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Multipart receipt uploads need headroom above the receipt ceiling
    let body_limit = state.config.uploads.max_receipt_bytes + 64 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_public.merge(auth_private))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
