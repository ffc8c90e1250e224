use crate::build_state;
use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use kritika_app::state::AppState;
use kritika_app::{auth::auth_router, auth::token::TokenLayer, user::users_router};
use tracing::debug;

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

    if !args.no_cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .nest("/users", users_router())
        .nest("/api/category", kritika_app::rest_api::category::router())
        .nest("/api/genre", kritika_app::rest_api::genre::router())
        .nest("/api/title", kritika_app::rest_api::title::router())
        .nest(
            "/api/title/{title_id}/review",
            kritika_app::rest_api::review::router(),
        )
        .nest(
            "/api/title/{title_id}/review/{review_id}/comment",
            kritika_app::rest_api::comment::router(),
        )
        // All above routes resolve the caller's token
        .layer(TokenLayer::new(state.clone()))
        .nest("/auth", auth_router())
        .layer(tower_cookies::CookieManagerLayer::new())
        .with_state(state)
        .route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
