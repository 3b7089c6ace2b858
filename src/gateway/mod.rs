//! Loopback HTTP gateway.
//!
//! Translates `GET /share/{server_id}/{share}/{path...}` into reads on a
//! remote share, honouring single byte ranges. Every request opens its own
//! [`ShareLease`]; the lease travels inside the response body and is
//! released when the body completes or the client goes away.

pub mod error;
pub mod local;
pub mod range;
pub mod urls;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sharestream_common::{paths::content_type_for, ServerId};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::Config;
use crate::share::{ShareConnector, ShareLease};
use crate::vault::{CredentialVault, VaultSummary};

pub use error::GatewayError;
pub use local::{local_router, LocalState};
pub use range::{parse_range_header, ByteRange};

/// Shared gateway context.
#[derive(Clone)]
pub struct GatewayState {
    pub vault: Arc<CredentialVault>,
    pub connector: Arc<dyn ShareConnector>,
}

/// Create the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/debug", get(debug_info))
        .route("/share/*rest", get(stream_share))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "ok",
    )
}

async fn debug_info(State(state): State<GatewayState>) -> Result<Response, GatewayError> {
    let summary = state.vault.summary()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_debug(&summary),
    )
        .into_response())
}

/// One `key: value` line per fact. Never includes credentials.
fn render_debug(summary: &VaultSummary) -> String {
    let known = summary
        .known_server_ids
        .iter()
        .map(ServerId::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let last = summary
        .last_server_id
        .as_ref()
        .map(ServerId::as_str)
        .unwrap_or("none");

    let mut out = format!("known_server_ids: {}\nlast_server_id: {}\n", known, last);
    for (id, share) in &summary.last_shares {
        out.push_str(&format!("last_share {}: {}\n", id, share));
    }
    out
}

/// A decoded `/share/...` request path.
#[derive(Debug, PartialEq, Eq)]
struct ShareRequest {
    server_id: String,
    share: String,
    path: String,
}

impl ShareRequest {
    fn from_path(raw: &str) -> Result<Self, GatewayError> {
        let segments = urls::decode_segments(raw).ok_or_else(|| {
            GatewayError::BadRequest("path segment is not valid UTF-8 or is unsafe".into())
        })?;

        match segments.as_slice() {
            [prefix, server_id, share, rest @ ..] if prefix == "share" && !rest.is_empty() => {
                Ok(Self {
                    server_id: server_id.clone(),
                    share: share.clone(),
                    path: rest.join("/"),
                })
            }
            _ => Err(GatewayError::BadRequest(
                "expected /share/{server_id}/{share}/{path}".into(),
            )),
        }
    }
}

async fn stream_share(
    State(state): State<GatewayState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let request = ShareRequest::from_path(uri.path())?;
    let span = tracing::info_span!(
        "share_request",
        server_id = %request.server_id,
        share = %request.share,
    );
    open_stream(state, request, headers).instrument(span).await
}

async fn open_stream(
    state: GatewayState,
    request: ShareRequest,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let server_id = ServerId::parse(&request.server_id).ok_or(GatewayError::Unauthorized)?;
    let stored = state
        .vault
        .load(&server_id)?
        .ok_or(GatewayError::Unauthorized)?;

    let mut lease = ShareLease::open(
        state.connector.as_ref(),
        &stored.endpoint,
        &stored.credentials,
        &request.share,
        &request.path,
    )
    .await?;

    let file_size = lease.file_size();
    let range = range::requested_range(&headers, file_size);

    if let Some(range) = range {
        if let Err(e) = lease.skip_exact(range.start).await {
            lease.release().await;
            return Err(e.into());
        }
    }

    tracing::debug!(path = %request.path, file_size, ?range, "Streaming remote file");

    let body = match range {
        Some(range) => Body::from_stream(ReaderStream::new(lease.take(range.len()))),
        None => Body::from_stream(ReaderStream::new(lease)),
    };

    Ok(range::build_response(
        body,
        content_type_for(&request.path),
        file_size,
        range,
    ))
}

async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid server address")?;
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}

/// Serve `app` on `listener` until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Start the share gateway.
pub async fn start_gateway(config: &Config, state: GatewayState) -> Result<()> {
    let listener = bind(&config.server.host, config.server.port).await?;
    tracing::info!("Starting gateway on {}", listener.local_addr()?);

    serve(listener, router(state)).await?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}

/// Start the local-file server on the configured port.
pub async fn start_local_server(config: &Config) -> Result<()> {
    let listener = bind(&config.server.host, config.local.port).await?;
    tracing::info!(
        root = %config.local.root.display(),
        "Starting local file server on {}",
        listener.local_addr()?
    );

    serve(listener, local_router(LocalState::new(&config.local.root))).await?;

    tracing::info!("Local file server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
