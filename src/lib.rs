pub mod appresult;
pub mod auth;
pub mod config;
pub mod courses;
pub mod error;
pub mod gateway;
pub mod messaging;
pub mod session;

use axum::{extract::FromRef, http::{header::CONTENT_TYPE, HeaderValue, Method}, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::Backend;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub gateway: Backend,
}

/// The full HTTP surface: session routes at the root, messaging under `/m`
/// and courses under `/c`.
pub fn app(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_minutes)));

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new(),
    };

    Ok(
        Router::new()
            .merge(auth::router())
            .nest("/m", messaging::router())
            .nest("/c", courses::router())
            .with_state(state)
            .layer(session_layer)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    )
}
