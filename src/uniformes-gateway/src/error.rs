//! Error types for gateway calls.
//!
//! Every failed call produces a `GatewayError` tagged with a `FailureKind`.
//! The error keeps the decoded response detail so callers can either show
//! it raw or hand it to the normalizer for a display string.

use indexmap::IndexMap;
use thiserror::Error;

use crate::detail::ErrorDetail;
use crate::normalize::{MSG_FORBIDDEN, MSG_SESSION_EXPIRED};

/// Failure taxonomy shared by every gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Session invalid or expired. Always clears the session.
    Unauthorized,
    /// Authenticated but not allowed. Session untouched.
    Forbidden,
    /// Rejected input, possibly with per-field messages.
    Validation,
    NotFound,
    Conflict,
    ServerError,
    /// No response was obtained at all.
    NetworkUnreachable,
    Unknown,
}

impl FailureKind {
    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => FailureKind::Validation,
            401 => FailureKind::Unauthorized,
            403 => FailureKind::Forbidden,
            404 => FailureKind::NotFound,
            409 => FailureKind::Conflict,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ServerError => "server_error",
            Self::NetworkUnreachable => "network_unreachable",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified gateway failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: FailureKind,
    status: Option<u16>,
    detail: ErrorDetail,
    message: String,
    #[source]
    source: Option<reqwest::Error>,
}

/// Result type for gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    fn new(kind: FailureKind, status: Option<u16>, detail: ErrorDetail, message: String) -> Self {
        Self {
            kind,
            status,
            detail,
            message,
            source: None,
        }
    }

    /// 401 handled by the session guard.
    pub fn unauthorized() -> Self {
        Self::new(
            FailureKind::Unauthorized,
            Some(401),
            ErrorDetail::Absent,
            MSG_SESSION_EXPIRED.to_string(),
        )
    }

    /// 403, with the fixed permission message.
    pub fn forbidden() -> Self {
        Self::new(
            FailureKind::Forbidden,
            Some(403),
            ErrorDetail::Absent,
            MSG_FORBIDDEN.to_string(),
        )
    }

    /// Any other non-2xx response.
    pub fn from_response(status: u16, detail: ErrorDetail) -> Self {
        let message = detail.summary(status);
        Self::new(FailureKind::from_status(status), Some(status), detail, message)
    }

    /// The request could not be built; nothing was sent.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::Unknown,
            None,
            ErrorDetail::Absent,
            message.into(),
        )
    }

    /// A response arrived but its body was unusable.
    pub fn invalid_response(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::Unknown,
            Some(status),
            ErrorDetail::Absent,
            message.into(),
        )
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// HTTP status, absent for transport failures.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn detail(&self) -> &ErrorDetail {
        &self.detail
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Per-field messages when the failure carried validation entries.
    pub fn field_errors(&self) -> IndexMap<String, String> {
        self.detail.field_errors()
    }

    pub fn is_network(&self) -> bool {
        self.kind == FailureKind::NetworkUnreachable
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Network request timed out: {err}")
        } else if err.is_connect() {
            format!("Network connection failed: {err}")
        } else {
            format!("Network error: {err}")
        };
        Self {
            kind: FailureKind::NetworkUnreachable,
            status: None,
            detail: ErrorDetail::Absent,
            message,
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::FieldError;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(FailureKind::from_status(400), FailureKind::Validation);
        assert_eq!(FailureKind::from_status(422), FailureKind::Validation);
        assert_eq!(FailureKind::from_status(404), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(409), FailureKind::Conflict);
        assert_eq!(FailureKind::from_status(503), FailureKind::ServerError);
        assert_eq!(FailureKind::from_status(418), FailureKind::Unknown);
    }

    #[test]
    fn test_from_response_uses_detail_summary() {
        let err = GatewayError::from_response(
            422,
            ErrorDetail::Validation(vec![FieldError::new(&["body", "price"], "must be positive")]),
        );
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(err.to_string(), "price: must be positive");
        assert_eq!(
            err.field_errors().get("price").map(String::as_str),
            Some("must be positive")
        );
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(GatewayError::forbidden().message(), MSG_FORBIDDEN);
        assert_eq!(GatewayError::unauthorized().status(), Some(401));
        assert!(!GatewayError::unauthorized().is_network());
    }
}
