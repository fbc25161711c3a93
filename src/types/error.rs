//! Error types for homegate
//!
//! Every failure the service can report, with its HTTP mapping. Denials on
//! home-scoped resources are always reported as `NotFound` so a caller can
//! not tell a private resource apart from a missing one.

use hyper::StatusCode;

/// Main error type for homegate operations
#[derive(Debug, thiserror::Error)]
pub enum HomegateError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No authenticated principal
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Principal present but lacking a global privilege (admin gate)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing resource, or a resource the principal may not see
    #[error("{0}")]
    NotFound(String),

    /// Redeeming principal's email differs from the invited email
    #[error("This invitation was sent to a different email address")]
    EmailMismatch,

    /// No invitation record exists for the token
    #[error("Invalid or expired invitation")]
    InvitationInvalid,

    /// An invitation existed for the token but has lapsed
    #[error("Invitation has expired")]
    InvitationExpired,

    /// A nested resource with no resolvable home, or an ambiguous scope
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HomegateError {
    /// Combined "missing or not permitted" outcome for a resource kind
    pub fn hidden(kind: &str) -> Self {
        Self::NotFound(format!("{} not found or insufficient permissions", kind))
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailMismatch => StatusCode::FORBIDDEN,
            Self::InvitationInvalid => StatusCode::NOT_FOUND,
            Self::InvitationExpired => StatusCode::GONE,
            Self::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the JSON error body
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::EmailMismatch => "EMAIL_MISMATCH",
            Self::InvitationInvalid => "INVITATION_INVALID",
            Self::InvitationExpired => "INVITATION_EXPIRED",
            Self::Integrity(_)
            | Self::Database(_)
            | Self::Timeout(_)
            | Self::Internal(_)
            | Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this is a server-side failure rather than a caller outcome
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Convert to status code and body tuple for HTTP response.
    /// Internal failures are reported without detail.
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for HomegateError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for HomegateError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for HomegateError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for HomegateError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for HomegateError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON serialization failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for HomegateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for HomegateError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err.to_string())
    }
}

/// Result type alias for homegate operations
pub type Result<T> = std::result::Result<T, HomegateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_is_not_found() {
        let err = HomegateError::hidden("Task");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Task not found or insufficient permissions");
    }

    #[test]
    fn test_invitation_outcomes_are_distinct() {
        assert_eq!(
            HomegateError::InvitationInvalid.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(HomegateError::InvitationExpired.status_code(), StatusCode::GONE);
        assert_ne!(
            HomegateError::InvitationInvalid.code(),
            HomegateError::InvitationExpired.code()
        );
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let (status, body) =
            HomegateError::Integrity("item 42 has no room".into()).into_status_code_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("item 42"));

        let (status, body) =
            HomegateError::Database("connection reset".into()).into_status_code_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal server error");
    }
}
