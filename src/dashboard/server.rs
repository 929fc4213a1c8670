use axum::{routing::get, Router};
use std::sync::Arc;

use super::routes;
use super::state::DashboardState;

/// Start the dashboard server on the given port.
///
/// Runs as a background tokio task alongside the chat REPL.
pub async fn start_dashboard(state: Arc<DashboardState>, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        // HTML page
        .route("/", get(routes::index))
        // JSON API endpoints
        .route("/api/metrics", get(routes::get_metrics))
        .route("/api/activity", get(routes::get_activity))
        .route("/api/topics", get(routes::get_topics))
        .route("/api/queries", get(routes::get_queries))
        .with_state(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
