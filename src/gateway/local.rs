//! Local file server.
//!
//! Serves `GET /{absolute path...}` from the local disk with the same range
//! semantics as the share gateway. Only files whose canonical path lies
//! under the canonical root are served.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Uri},
    response::Response,
    routing::get,
    Router,
};
use sharestream_common::paths::content_type_for;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use super::error::GatewayError;
use super::range;
use super::urls::decode_segments;

#[derive(Clone)]
pub struct LocalState {
    root: Arc<PathBuf>,
}

impl LocalState {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: Arc::new(root.as_ref().to_path_buf()),
        }
    }
}

/// Create the local-file router.
pub fn local_router(state: LocalState) -> Router {
    Router::new()
        .route("/*path", get(serve_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve a request path to a canonical file path under `root`.
async fn resolve(root: &Path, raw_path: &str) -> Result<PathBuf, GatewayError> {
    let segments = decode_segments(raw_path).ok_or_else(|| {
        GatewayError::BadRequest("path segment is not valid UTF-8 or is unsafe".into())
    })?;

    let mut requested = PathBuf::from("/");
    requested.extend(&segments);

    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| GatewayError::NotFound(format!("root unavailable: {}", e)))?;
    let canonical = tokio::fs::canonicalize(&requested)
        .await
        .map_err(|_| GatewayError::NotFound(requested.display().to_string()))?;

    if !canonical.starts_with(&root) {
        tracing::warn!(path = %canonical.display(), "Refusing path outside the served root");
        return Err(GatewayError::Forbidden);
    }
    Ok(canonical)
}

async fn serve_file(
    State(state): State<LocalState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let path = resolve(&state.root, uri.path()).await?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| GatewayError::NotFound(path.display().to_string()))?;
    if !metadata.is_file() {
        return Err(GatewayError::NotFound(path.display().to_string()));
    }

    let file_size = metadata.len();
    let range = range::requested_range(&headers, file_size);
    let content_type = content_type_for(&path.to_string_lossy());

    let mut file = File::open(&path)
        .await
        .map_err(|_| GatewayError::NotFound(path.display().to_string()))?;

    let body = match range {
        Some(range) => {
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            Body::from_stream(ReaderStream::new(file.take(range.len())))
        }
        None => Body::from_stream(ReaderStream::new(file)),
    };

    Ok(range::build_response(body, content_type, file_size, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_resolve_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a b.mkv");
        std::fs::write(&file, b"data").unwrap();

        let url = super::super::urls::local_url(1, &file);
        let raw = url.trim_start_matches("http://127.0.0.1:1");
        let resolved = resolve(dir.path(), raw).await.unwrap();
        assert_eq!(resolved, file.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_rejects_escape() {
        let root = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let outside = other.path().join("x.mkv");
        std::fs::write(&outside, b"data").unwrap();

        let raw = format!("{}", outside.display());
        assert_matches!(resolve(root.path(), &raw).await, Err(GatewayError::Forbidden));

        let sibling = other.path().file_name().unwrap().to_string_lossy();
        let dotted = format!("{}/../{}/x.mkv", root.path().display(), sibling);
        assert_matches!(resolve(root.path(), &dotted).await, Err(GatewayError::BadRequest(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_out_of_root() {
        let root = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let outside = other.path().join("x.mkv");
        std::fs::write(&outside, b"data").unwrap();
        let link = root.path().join("link.mkv");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let raw = format!("{}", link.display());
        assert_matches!(resolve(root.path(), &raw).await, Err(GatewayError::Forbidden));
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let raw = format!("{}/missing.mkv", root.path().display());
        assert_matches!(resolve(root.path(), &raw).await, Err(GatewayError::NotFound(_)));
    }
}
