//! HTTP routes for homegate
//!
//! Handlers take an [`ApiRequest`] whose body has already been read, so
//! they can be driven without a socket.

pub mod access;
pub mod admin;
pub mod health;
pub mod invites;
pub mod shares;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::auth::Principal;
use crate::types::{HomegateError, Result};

pub use access::handle_access_check;
pub use admin::{handle_admin_stats, handle_list_users, handle_update_user};
pub use health::health_check;
pub use invites::{handle_accept_invite, handle_get_invite};
pub use shares::handle_share_request;

pub type FullBody = Full<Bytes>;

/// A request as the handlers see it
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Resolved from the bearer token, if any
    pub principal: Option<Principal>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            principal: None,
            body: Bytes::new(),
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(body).unwrap_or_default());
        self
    }

    /// Parse the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Err(HomegateError::BadRequest("Request body required".into()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| HomegateError::BadRequest(format!("Invalid JSON: {}", e)))
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response<FullBody> {
    match serde_json::to_string(&body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .header("Cache-Control", "no-store")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|_| internal_error_response()),
        Err(_) => internal_error_response(),
    }
}

/// Map an error to its JSON response. Server-side failures are logged here
/// and reported without detail.
pub fn error_response(err: HomegateError) -> Response<FullBody> {
    if err.is_internal() {
        error!("Request failed: {}", err);
    }
    let code = err.code();
    let (status, message) = err.into_status_code_and_body();
    json_response(
        status,
        ErrorResponse {
            error: message,
            code,
        },
    )
}

pub fn empty_response(status: StatusCode) -> Response<FullBody> {
    Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| internal_error_response())
}

/// Unmatched path or method
pub fn not_found_response(path: &str) -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "error": "Not Found",
            "code": "NOT_FOUND",
            "path": path,
        }),
    )
}

fn internal_error_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::from(
        r#"{"error":"Internal server error","code":"INTERNAL_ERROR"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Collapse a handler result into a response
pub(crate) fn respond(result: Result<Response<FullBody>>) -> Response<FullBody> {
    result.unwrap_or_else(error_response)
}
