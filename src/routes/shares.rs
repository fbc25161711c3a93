//! Home sharing endpoints
//!
//! ## Endpoints
//!
//! - `GET /api/homes/{homeId}/share` - Collaborators (+ pending invitations for WRITE)
//! - `POST /api/homes/{homeId}/share` - Invite by email `{email, role}`
//! - `POST /api/homes/{homeId}/share/resend` - Resend a pending invitation `{email}`
//! - `PUT /api/homes/{homeId}/share/{userId}` - Grant or change a role `{role}` (owner)
//! - `DELETE /api/homes/{homeId}/share/{userId}` - Remove a collaborator (owner)
//! - `DELETE /api/homes/{homeId}/share/pending/{email}` - Revoke an invitation (owner)
//!
//! All endpoints require an authenticated principal.

use hyper::{Method, Response, StatusCode};
use serde::Deserialize;

use crate::auth::{require_principal, ShareRole};
use crate::routes::{
    empty_response, error_response, json_response, not_found_response, respond, ApiRequest,
    FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{HomegateError, Result};

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

fn parse_role(raw: &str) -> Result<ShareRole> {
    ShareRole::parse(raw)
        .ok_or_else(|| HomegateError::BadRequest(format!("Invalid role: {}", raw)))
}

/// Route `/api/homes/{home_id}/share{subpath}`
pub async fn handle_share_request(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
    subpath: &str,
) -> Response<FullBody> {
    match (req.method.clone(), subpath) {
        (Method::GET, "" | "/") => respond(list_shares(state, req, home_id).await),
        (Method::POST, "" | "/") => respond(invite(state, req, home_id).await),
        (Method::POST, "/resend") => respond(resend(state, req, home_id).await),
        (Method::PUT | Method::DELETE, p) if is_reserved_segment(p) => {
            let err = HomegateError::BadRequest("Email or user id is required".into());
            error_response(err)
        }
        (Method::DELETE, p) if p.starts_with("/pending/") => {
            let encoded = p.trim_start_matches("/pending/");
            respond(revoke(state, req, home_id, encoded).await)
        }
        (Method::PUT, p) if is_single_segment(p) => {
            respond(update_role(state, req, home_id, &p[1..]).await)
        }
        (Method::DELETE, p) if is_single_segment(p) => {
            respond(remove(state, req, home_id, &p[1..]).await)
        }
        _ => not_found_response(&req.path),
    }
}

/// Subpaths naming an action, never a user id
fn is_reserved_segment(p: &str) -> bool {
    matches!(p.trim_end_matches('/'), "/pending" | "/resend")
}

fn is_single_segment(p: &str) -> bool {
    p.len() > 1 && p.starts_with('/') && !p[1..].contains('/')
}

async fn list_shares(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let listing = state.invitations.list_shares(home_id, principal).await?;
    Ok(json_response(StatusCode::OK, listing))
}

async fn invite(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let body: InviteRequest = req.json()?;
    let role = parse_role(&body.role)?;

    let invitation = state
        .invitations
        .create_invitation(home_id, principal, &body.email, role)
        .await?;
    Ok(json_response(StatusCode::CREATED, invitation))
}

async fn resend(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let body: ResendRequest = req.json()?;

    state
        .invitations
        .resend_invitation(home_id, &body.email, principal)
        .await?;
    Ok(json_response(StatusCode::OK, SuccessResponse { success: true }))
}

async fn revoke(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
    encoded_email: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let email = urlencoding::decode(encoded_email)
        .map_err(|_| HomegateError::BadRequest("Invalid email encoding".into()))?;
    if email.trim().is_empty() {
        return Err(HomegateError::BadRequest("Email or user id is required".into()));
    }

    state
        .invitations
        .revoke_invitation(home_id, &email, principal)
        .await?;
    Ok(empty_response(StatusCode::NO_CONTENT))
}

async fn update_role(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
    user_id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let body: UpdateRoleRequest = req.json()?;
    let role = parse_role(&body.role)?;

    let grant = state
        .invitations
        .grant_access(home_id, user_id, role, principal)
        .await?;
    Ok(json_response(StatusCode::OK, grant))
}

async fn remove(
    state: &AppState,
    req: &ApiRequest,
    home_id: &str,
    user_id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    state
        .invitations
        .remove_grant(home_id, user_id, principal)
        .await?;
    Ok(empty_response(StatusCode::NO_CONTENT))
}
