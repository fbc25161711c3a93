//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Each request resolves
//! its principal, reads its body, and runs under the configured timeout.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::PrincipalResolver;
use crate::config::Args;
use crate::db::AccessStore;
use crate::routes::{self, error_response, ApiRequest, FullBody};
use crate::services::{InvitationService, InviteNotifier, ScopeResolver};
use crate::types::{HomegateError, Result};

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn AccessStore>,
    /// Bearer token -> principal
    pub principals: PrincipalResolver,
    pub scope: ScopeResolver,
    pub invitations: InvitationService,
    /// "mongodb" or "memory", reported by /health
    pub storage_backend: &'static str,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn AccessStore>,
        notifier: Arc<dyn InviteNotifier>,
        storage_backend: &'static str,
    ) -> Result<Self> {
        let principals = PrincipalResolver::new(args.jwt_validator()?);
        let invitations =
            InvitationService::new(Arc::clone(&store), notifier, args.invitation_ttl());

        Ok(Self {
            scope: ScopeResolver::new(Arc::clone(&store)),
            principals,
            invitations,
            store,
            storage_backend,
            started_at: Instant::now(),
            args,
        })
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "homegate listening on {} ({} storage)",
        state.args.listen, state.storage_backend
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory storage, built-in JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(preflight_response());
    }

    let timeout = state.args.request_timeout();
    let response = match tokio::time::timeout(timeout, serve(&state, req)).await {
        Ok(response) => response,
        Err(elapsed) => {
            warn!("[{}] {} {} timed out after {:?}", addr, method, path, timeout);
            error_response(HomegateError::from(elapsed))
        }
    };

    info!(
        "[{}] {} {} -> {}",
        addr,
        method,
        path,
        response.status().as_u16()
    );
    Ok(response)
}

async fn serve(state: &AppState, req: Request<Incoming>) -> Response<FullBody> {
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let principal = state.principals.resolve(auth_header);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(HomegateError::BadRequest(format!(
                "Failed to read request body: {}",
                e
            )))
        }
    };

    let api = ApiRequest {
        method,
        path,
        query,
        principal,
        body,
    };
    dispatch(state, &api).await
}

/// Match a request to its handler
pub async fn dispatch(state: &AppState, req: &ApiRequest) -> Response<FullBody> {
    let path = req.path.as_str();

    if let Some(rest) = path.strip_prefix("/api/homes/") {
        if let Some((home_id, subpath)) = split_share_path(rest) {
            return routes::handle_share_request(state, req, home_id, subpath).await;
        }
    }

    if let Some(token) = path.strip_prefix("/api/invite/accept/") {
        if req.method == Method::POST {
            return routes::handle_accept_invite(state, req, token).await;
        }
    }

    if let Some(rest) = path.strip_prefix("/api/access/") {
        if req.method == Method::GET {
            if let Some((kind, id)) = rest.split_once('/') {
                if !id.is_empty() && !id.contains('/') {
                    return routes::handle_access_check(state, req, kind, id).await;
                }
            }
        }
    }

    match (req.method.clone(), path) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),

        (Method::GET, "/api/admin/stats") => routes::handle_admin_stats(state, req).await,
        (Method::GET, "/api/admin/users") => routes::handle_list_users(state, req).await,
        (Method::PATCH, "/api/admin/users") => routes::handle_update_user(state, req).await,

        (Method::GET, p) if p.starts_with("/api/invite/") => {
            let token = p.trim_start_matches("/api/invite/");
            routes::handle_get_invite(state, token).await
        }

        _ => routes::not_found_response(path),
    }
}

/// Split `{homeId}/share{subpath}`
fn split_share_path(rest: &str) -> Option<(&str, &str)> {
    let (home_id, tail) = rest.split_once('/')?;
    if home_id.is_empty() {
        return None;
    }
    let subpath = tail.strip_prefix("share")?;
    if subpath.is_empty() || subpath.starts_with('/') {
        Some((home_id, subpath))
    } else {
        None
    }
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Authorization, Content-Type")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| routes::empty_response(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, body_json, bob, owner};
    use serde_json::json;

    #[test]
    fn test_split_share_path() {
        assert_eq!(split_share_path("h1/share"), Some(("h1", "")));
        assert_eq!(split_share_path("h1/share/bob"), Some(("h1", "/bob")));
        assert_eq!(
            split_share_path("h1/share/pending/a%40b.co"),
            Some(("h1", "/pending/a%40b.co"))
        );
        assert_eq!(split_share_path("h1/shared"), None);
        assert_eq!(split_share_path("/share"), None);
        assert_eq!(split_share_path("h1"), None);
    }

    #[tokio::test]
    async fn test_dispatch_full_invite_flow() {
        let app = app().await;

        let invite = ApiRequest::new(Method::POST, "/api/homes/h1/share")
            .with_principal(owner())
            .with_json(&json!({ "email": "bob@x.com", "role": "WRITE" }));
        assert_eq!(
            dispatch(&app.state, &invite).await.status(),
            StatusCode::CREATED
        );
        let token = app.notifier.sent().last().unwrap().token.clone();

        let lookup = ApiRequest::new(Method::GET, format!("/api/invite/{}", token));
        let details = body_json(dispatch(&app.state, &lookup).await).await;
        assert_eq!(details["role"], "WRITE");

        let accept = ApiRequest::new(Method::POST, format!("/api/invite/accept/{}", token))
            .with_principal(bob());
        assert_eq!(dispatch(&app.state, &accept).await.status(), StatusCode::OK);

        let check = ApiRequest::new(Method::GET, "/api/access/items/i1")
            .with_principal(bob())
            .with_query("require=write");
        let body = body_json(dispatch(&app.state, &check).await).await;
        assert_eq!(body["access"], "WRITE");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_route() {
        let app = app().await;
        let req = ApiRequest::new(Method::GET, "/api/garages");
        assert_eq!(
            dispatch(&app.state, &req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = ApiRequest::new(Method::PATCH, "/api/homes/h1/share");
        assert_eq!(
            dispatch(&app.state, &req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_dispatch_admin_users() {
        let app = app().await;
        let admin = crate::auth::Principal::new("root", "root@x.com", crate::auth::Role::Admin);

        let req = ApiRequest::new(Method::GET, "/api/admin/users").with_principal(admin.clone());
        assert_eq!(dispatch(&app.state, &req).await.status(), StatusCode::OK);

        let req = ApiRequest::new(Method::PATCH, "/api/admin/users")
            .with_principal(admin)
            .with_json(&json!({ "userId": "ghost", "isDisabled": true }));
        assert_eq!(
            dispatch(&app.state, &req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_dispatch_health() {
        let app = app().await;
        let req = ApiRequest::new(Method::GET, "/health");
        let response = dispatch(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["healthy"], true);
    }

    #[test]
    fn test_preflight_allows_auth_header() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::OK);
        let allowed = response.headers()["Access-Control-Allow-Headers"]
            .to_str()
            .unwrap();
        assert!(allowed.contains("Authorization"));
    }
}
