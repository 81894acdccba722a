use std::net::SocketAddr;

use axum::{Router, error_handling::HandleError, http::StatusCode};
use tracing_subscriber::prelude::*;

use murmur_stream::ListenService;

fn default_port() -> u16 {
    3010
}

#[derive(serde::Deserialize)]
struct Env {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn env() -> Env {
    let _ = dotenvy::dotenv();
    envy::from_env().expect("failed to load environment")
}

fn app() -> Router {
    let listen = HandleError::new(ListenService::new(), |err: String| async move {
        (StatusCode::INTERNAL_SERVER_ERROR, err)
    });

    Router::new()
        .route("/health", axum::routing::get(version))
        .route_service("/v1/listen", listen)
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = env();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let addr = SocketAddr::from(([0, 0, 0, 0], env.port));
            tracing::info!(addr = %addr, "server_listening");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app())
                .with_graceful_shutdown(shutdown_signal())
                .await
        })
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown_signal_received");
}

async fn version() -> &'static str {
    option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
}
