use crate::config::ServerConfig;
use crate::error::Result;
use crate::build_state;
use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router, ServiceExt,
};
use futures::FutureExt;
use tower::Layer as _;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer, trace::TraceLayer};
use tracing::info;
use yamdb_app::{
    auth::{auth_router, token::RequesterLayer},
    error::ApiError,
    state::AppState,
};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(CorsLayer::very_permissive());
    }

    // `/titles/` and `/titles` are the same resource
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    info!("Server stopped");

    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    let api = Router::new()
        .nest("/auth", auth_router())
        .nest("/users", yamdb_app::user::router())
        .merge(yamdb_app::rest_api::api_router())
        .fallback(not_found)
        // requester is resolved for all API routes, permission layers depend on it
        .layer(RequesterLayer::new(state.clone()));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Resource".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_router_builds() {
        // route conflicts panic when router is assembled
        let config = yamdb_app::state::AppConfig {
            base_url: "http://localhost:3000".parse().unwrap(),
            default_page_size: 10,
            mail_from: "noreply@yamdb.local".into(),
        };
        let pool = yamdb_dal::new_pool("sqlite::memory:").await.unwrap();
        let tokens = yamdb_auth::token::TokenManager::new(
            [7u8; 32],
            std::time::Duration::from_secs(60),
        );
        let state = AppState::new(
            config,
            pool,
            tokens,
            std::sync::Arc::new(yamdb_app::mail::LogMailer),
        );
        let _router = main_router(state);
    }
}
