//! Per-resource authorization check
//!
//! `GET /api/access/{kind}/{id}?homeId=&require=read|write`
//!
//! Resolves the resource's owning home and answers with the caller's
//! access on it. Resource endpoints call this before touching a resource.
//! A denied check is indistinguishable from a missing resource.

use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{require_principal, AccessLevel};
use crate::routes::{json_response, respond, ApiRequest, FullBody};
use crate::server::AppState;
use crate::types::{HomegateError, ResourceKind, ResourceRef, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessQuery {
    /// Home the caller believes the resource belongs to
    pub home_id: Option<String>,
    /// `read` (default) or `write`
    pub require: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub home_id: String,
    pub access: AccessLevel,
}

impl AccessQuery {
    fn parse(query: Option<&str>) -> Result<Self> {
        match query {
            None | Some("") => Ok(Self::default()),
            Some(q) => serde_urlencoded::from_str(q)
                .map_err(|e| HomegateError::BadRequest(format!("Invalid query: {}", e))),
        }
    }

    fn required(&self) -> Result<AccessLevel> {
        match self.require.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("read") => Ok(AccessLevel::Read),
            Some("write") => Ok(AccessLevel::Write),
            Some(other) => Err(HomegateError::BadRequest(format!(
                "Invalid access requirement: {}",
                other
            ))),
        }
    }
}

pub async fn handle_access_check(
    state: &AppState,
    req: &ApiRequest,
    kind: &str,
    id: &str,
) -> Response<FullBody> {
    respond(access_check(state, req, kind, id).await)
}

async fn access_check(
    state: &AppState,
    req: &ApiRequest,
    kind: &str,
    id: &str,
) -> Result<Response<FullBody>> {
    let principal = require_principal(req.principal.as_ref())?;
    let kind: ResourceKind = kind.parse()?;
    let query = AccessQuery::parse(req.query.as_deref())?;
    let required = query.required()?;

    let authorized = state
        .scope
        .authorize(
            Some(principal),
            &ResourceRef::new(kind, id),
            query.home_id.as_deref().filter(|h| !h.is_empty()),
            required,
        )
        .await?;

    Ok(json_response(
        StatusCode::OK,
        AccessResponse {
            home_id: authorized.home.id,
            access: authorized.access,
        },
    ))
}
