//! Health-check HTTP routes, for hosts that expect the process to listen on `PORT`.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create all HTTP routes.
pub fn routes() -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

async fn banner() -> &'static str {
    "GW2 Verify Bot"
}

async fn health() -> &'static str {
    "OK"
}

/// Serve the health routes until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Health check listening on {}", addr);
    axum::serve(listener, routes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes()).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn root_names_the_bot() {
        let addr = spawn().await;
        let body = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "GW2 Verify Bot");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let addr = spawn().await;
        let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "OK");
    }
}
