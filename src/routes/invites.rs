//! Invitation endpoints for the invitee
//!
//! - `GET /api/invite/{token}` - Invitation details (no authentication)
//! - `POST /api/invite/accept/{token}` - Redeem as the signed-in user
//!
//! An unknown token is 404, a lapsed one 410.

use hyper::{Response, StatusCode};
use tracing::info;

use crate::auth::require_principal;
use crate::routes::{json_response, respond, ApiRequest, FullBody};
use crate::server::AppState;
use crate::types::{HomegateError, Result};

pub async fn handle_get_invite(state: &AppState, token: &str) -> Response<FullBody> {
    respond(get_invite(state, token).await)
}

pub async fn handle_accept_invite(
    state: &AppState,
    req: &ApiRequest,
    token: &str,
) -> Response<FullBody> {
    respond(accept_invite(state, req, token).await)
}

fn check_token(token: &str) -> Result<()> {
    if token.is_empty() || token.contains('/') {
        return Err(HomegateError::InvitationInvalid);
    }
    Ok(())
}

async fn get_invite(state: &AppState, token: &str) -> Result<Response<FullBody>> {
    check_token(token)?;
    let details = state.invitations.get_invitation(token).await?;
    Ok(json_response(StatusCode::OK, details))
}

async fn accept_invite(
    state: &AppState,
    req: &ApiRequest,
    token: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    check_token(token)?;

    let grant = state.invitations.redeem(token, principal).await?;
    info!("Invitation accepted by {}", principal.id);
    Ok(json_response(StatusCode::OK, grant))
}
