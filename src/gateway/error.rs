//! Error-to-HTTP response conversion for the gateway.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use sharestream_common::Error;

/// Failures of a gateway request, each mapped to one status code.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no saved credentials for server")]
    Unauthorized,

    #[error("path outside the served root")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for GatewayError {
    fn from(e: Error) -> Self {
        match e {
            Error::Unauthorized => Self::Unauthorized,
            Error::Forbidden => Self::Forbidden,
            Error::InvalidInput(msg) => Self::BadRequest(msg),
            // Unreachable hosts and rejected logins are reported as missing
            // content so players stop retrying.
            Error::NotFound(msg) | Error::Remote(msg) => Self::NotFound(msg),
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(e.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Gateway request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Gateway request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status() {
        let cases = [
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::Forbidden, StatusCode::FORBIDDEN),
            (Error::not_found("a.mkv"), StatusCode::NOT_FOUND),
            (Error::remote("host down"), StatusCode::NOT_FOUND),
            (Error::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (Error::database("locked"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(GatewayError::from(error).status(), status);
        }
    }

    #[test]
    fn test_response_is_plain_text() {
        let response = GatewayError::NotFound("a.mkv".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
