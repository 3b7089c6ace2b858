//! HTTP `Range` header handling.

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};

/// An inclusive byte range already clamped to the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// The requested range, or `None` to serve the whole file.
pub fn requested_range(headers: &HeaderMap, file_size: u64) -> Option<ByteRange> {
    let raw = headers.get(header::RANGE)?.to_str().ok()?;
    let range = parse_range_header(raw, file_size);
    if range.is_none() {
        tracing::debug!(range = raw, file_size, "Unsatisfiable range, serving full content");
    }
    range
}

/// Parse a single-range `Range` header.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
///
/// Anything else, including multiple ranges and starts past the end, yields
/// `None`.
pub fn parse_range_header(header: &str, file_size: u64) -> Option<ByteRange> {
    if file_size == 0 {
        return None;
    }

    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    let (start, end) = match (start.is_empty(), end.is_empty()) {
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            if suffix_len == 0 {
                return None;
            }
            (file_size.saturating_sub(suffix_len), file_size - 1)
        }
        (false, true) => (start.parse().ok()?, file_size - 1),
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            (start, end.min(file_size - 1))
        }
        (true, true) => return None,
    };

    if start >= file_size || start > end {
        return None;
    }
    Some(ByteRange { start, end })
}

/// Build the 200 or 206 response around an already positioned body.
pub fn build_response(
    body: Body,
    content_type: &str,
    file_size: u64,
    range: Option<ByteRange>,
) -> Response {
    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");

    let builder = match range {
        Some(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, range.len().to_string())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", range.start, range.end, file_size),
            ),
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, file_size.to_string()),
    };

    builder.body(body).unwrap_or_else(|e| {
        tracing::error!("Failed to build stream response: {}", e);
        let mut response = Response::new(Body::from("failed to build response"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
