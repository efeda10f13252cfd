//! Background metrics endpoint (`GET /metrics`).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use vhagar_core::error::Result;
use vhagar_core::metrics::Metrics;

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render_prometheus(),
    )
}

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// Serve metrics on an already-bound listener until the process exits.
pub async fn serve_metrics(listener: TcpListener, metrics: Arc<Metrics>) -> Result<()> {
    axum::serve(listener, router(metrics)).await?;
    Ok(())
}

/// Bind `addr` and serve metrics on a detached task.
pub async fn spawn_metrics_server(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("📊 metrics endpoint on http://{local}/metrics");
    tokio::spawn(async move {
        if let Err(e) = serve_metrics(listener, metrics).await {
            tracing::error!("metrics server stopped: {e}");
        }
    });
    Ok(local)
}
