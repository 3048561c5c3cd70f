mod config;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");
    let addr = config.socket_addr();
    match &config.client_origin {
        Some(origin) => tracing::info!(?origin, "cors restricted to client origin"),
        None => tracing::info!("CLIENT_URL unset; cors allows any origin"),
    }

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");

    tracing::info!(%addr, "sketchroom relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
