use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::request_id::assign_request_id;
use crate::routes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<_> = state
        .config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_headers(tower_http::cors::Any);

    let middleware = ServiceBuilder::new()
        .layer(axum::middleware::from_fn(assign_request_id))
        .layer(cors);

    Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/verify-registration", post(routes::auth::verify_registration))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/api/auth/reset-password", post(routes::auth::reset_password))
        .route("/api/save/session", post(routes::save::start_session))
        .route("/api/save", get(routes::save::get_save))
        .route("/api/save", put(routes::save::put_save))
        .route("/api/save", delete(routes::save::delete_save))
        .route("/api/credits", get(routes::credits::get_balance))
        .route("/api/credits/checkout", post(routes::credits::checkout))
        .route("/api/credits/continue", post(routes::credits::continue_run))
        .route("/api/credits/redeem", post(routes::credits::redeem))
        .route("/api/credits/webhook", post(routes::credits::webhook))
        .route("/api/leaderboard/session", post(routes::leaderboard::start_session))
        .route("/api/leaderboard/submit", post(routes::leaderboard::submit))
        .route("/api/leaderboard", get(routes::leaderboard::list))
        .route("/api/progression", get(routes::progression::get_progression))
        .route("/api/progression", put(routes::progression::put_progression))
        .route("/api/achievements", get(routes::progression::get_achievements))
        .route("/api/achievements/:id", post(routes::progression::unlock_achievement))
        .layer(middleware)
        .with_state(state)
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let router = build_router(state).into_make_service_with_connect_info::<std::net::SocketAddr>();

    let host = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&host).await?;
    info!("Server started at {:?}", host);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
