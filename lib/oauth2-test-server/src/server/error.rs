use axum::Json;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

/// Protocol errors answered by the endpoints (RFC 6749 section 5.2).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum OAuthError {
    /// A required parameter is missing or a value is malformed.
    #[display("invalid request: {description}")]
    InvalidRequest {
        /// Human readable detail.
        description: String,
    },

    /// Client authentication failed.
    #[display("invalid client")]
    InvalidClient,

    /// The code or refresh token is unknown, used, expired or issued to someone else.
    #[display("invalid grant: {description}")]
    InvalidGrant {
        /// Human readable detail.
        description: String,
    },

    /// The grant type is not supported by this server.
    #[display("unsupported grant type")]
    UnsupportedGrantType,

    /// The response type is not supported by this server.
    #[display("unsupported response type")]
    UnsupportedResponseType,

    /// Something went wrong on the server side.
    #[display("server error: {description}")]
    ServerError {
        /// Human readable detail.
        description: String,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl OAuthError {
    pub(crate) fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest {
            description: description.into(),
        }
    }

    pub(crate) fn invalid_grant(description: impl Into<String>) -> Self {
        Self::InvalidGrant {
            description: description.into(),
        }
    }

    /// The `error` code sent on the wire.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::ServerError { .. } => "server_error",
        }
    }

    /// The optional `error_description` sent on the wire.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest { description }
            | Self::InvalidGrant { description }
            | Self::ServerError { description } => Some(description),
            Self::InvalidClient | Self::UnsupportedGrantType | Self::UnsupportedResponseType => {
                None
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(error = %self, "rejecting request");

        let body = ErrorBody {
            error: self.error_code(),
            error_description: self.description().map(ToString::to_string),
        };

        (
            status,
            [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
            Json(body),
        )
            .into_response()
    }
}
