//! Route table and HTTP server.

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use crate::{admin, public};

/// Build the full route table.
pub fn router(state: SharedState) -> Router {
    let public = Router::new()
        .route("/voting-context", get(public::voting_context))
        .route("/property-units", get(public::property_units))
        .route("/validate-resident", post(public::validate_resident))
        .route("/voting-info", get(public::voting_info))
        .route("/vote", post(public::cast_vote))
        .route("/units-with-residents", get(public::units_with_residents))
        .route("/votes", get(public::votes))
        .route("/voting-stream", get(public::voting_stream));

    let admin = Router::new()
        .route("/voting-groups/:id", get(admin::voting_group))
        .route("/voting-groups/:id/votings", get(admin::group_votings))
        .route("/votings/:id", get(admin::voting))
        .route("/votings/:id/activate", post(admin::activate))
        .route("/votings/:id/deactivate", post(admin::deactivate))
        .route("/votings/:id/results", get(admin::results))
        .route("/votings/:id/quorum", get(admin::quorum))
        .route("/votings/:id/votes", get(admin::votes))
        .route("/votings/:id/votes/:vote_id", delete(admin::delete_vote))
        .route(
            "/votings/:id/generate-public-url",
            post(admin::generate_public_url),
        )
        .route("/votings/:id/stream", get(admin::stream));

    let mut app = Router::new()
        .nest("/public", public)
        .nest("/admin", admin)
        .route("/health", get(health));
    if state.settings.enable_metrics {
        app = app.route("/metrics", get(metrics));
    }

    app.fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "liveVotings": state.voting.cache().hub_count(),
            "streams": state.metrics.sse_connections.get(),
        }
    }))
}

async fn metrics(State(state): State<SharedState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".into())
}

/// The HTTP server for the voting API.
pub struct RpcServer {
    pub addr: SocketAddr,
    pub state: SharedState,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: SharedState) -> Self {
        Self { addr, state }
    }

    /// Serve until `shutdown` resolves, then let open requests finish.
    ///
    /// Live vote streams only finish once [`AppState::shutdown`] fires, so
    /// the caller fires it alongside `shutdown`.
    ///
    /// [`AppState::shutdown`]: crate::AppState::shutdown
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        Self::serve_on(listener, self.state, shutdown).await
    }

    /// Like [`RpcServer::serve`], on a listener the caller already bound.
    pub async fn serve_on<F>(
        listener: TcpListener,
        state: SharedState,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %listener.local_addr()?, "voting API listening");
        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await
    }
}
