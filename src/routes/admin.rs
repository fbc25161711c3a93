//! Admin API endpoints
//!
//! - `GET /api/admin/stats` - Platform-wide counts
//! - `GET /api/admin/users` - All users with owned-home and created-task counts
//! - `PATCH /api/admin/users` - Change a user's role or disabled flag
//!
//! Gated on the ADMIN role only. Nothing here reads or writes per-home data.

use hyper::{Response, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::auth::{require_admin, Role};
use crate::logging::audit::{self, AuditEvent};
use crate::routes::{json_response, respond, ApiRequest, FullBody};
use crate::server::AppState;
use crate::types::{HomegateError, Result, UserUpdate};

/// Body of `PATCH /api/admin/users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub is_disabled: Option<bool>,
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<(String, UserUpdate)> {
        let role = match self.role.as_deref() {
            Some(raw) => Some(
                Role::parse(raw)
                    .ok_or_else(|| HomegateError::BadRequest(format!("Invalid role: {}", raw)))?,
            ),
            None => None,
        };
        let update = UserUpdate {
            role,
            is_disabled: self.is_disabled,
        };

        match self.user_id {
            Some(user_id) if !user_id.is_empty() && !update.is_empty() => Ok((user_id, update)),
            _ => Err(HomegateError::BadRequest("Missing required fields".into())),
        }
    }
}

pub async fn handle_admin_stats(state: &AppState, req: &ApiRequest) -> Response<FullBody> {
    respond(admin_stats(state, req).await)
}

pub async fn handle_list_users(state: &AppState, req: &ApiRequest) -> Response<FullBody> {
    respond(list_users(state, req).await)
}

pub async fn handle_update_user(state: &AppState, req: &ApiRequest) -> Response<FullBody> {
    respond(update_user(state, req).await)
}

async fn admin_stats(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let admin = require_admin(req.principal.as_ref())?;
    let stats = state.store.platform_stats().await?;
    info!("Admin {} fetched platform stats", admin.id);
    Ok(json_response(StatusCode::OK, stats))
}

async fn list_users(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    require_admin(req.principal.as_ref())?;
    let users = state.store.list_users().await?;
    Ok(json_response(StatusCode::OK, users))
}

async fn update_user(state: &AppState, req: &ApiRequest) -> Result<Response<FullBody>> {
    let admin = require_admin(req.principal.as_ref())?;
    let (user_id, update) = req.json::<UpdateUserRequest>()?.into_update()?;

    let user = state
        .store
        .update_user(&user_id, &update)
        .await?
        .ok_or_else(|| HomegateError::NotFound("User not found".into()))?;

    audit::record(&AuditEvent::UserUpdated {
        user_id: &user.id,
        role: update.role,
        is_disabled: update.is_disabled,
        updated_by: &admin.id,
    });
    info!("User {} updated by admin {}", user.id, admin.id);

    Ok(json_response(StatusCode::OK, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::routes::test_support::{app, body_json, owner, TestApp};
    use crate::types::User;
    use hyper::Method;
    use serde_json::json;

    fn admin() -> Principal {
        Principal::new("root", "root@x.com", Role::Admin)
    }

    async fn seed_users(app: &TestApp) {
        app.store
            .insert_user(User {
                id: "owner".into(),
                email: "olive@x.com".into(),
                name: Some("Olive".into()),
                ..Default::default()
            })
            .await;
        app.store
            .insert_user(User {
                id: "bob".into(),
                email: "bob@x.com".into(),
                ..Default::default()
            })
            .await;
        app.store.set_task_creator("t1", "bob").await;
    }

    #[tokio::test]
    async fn test_stats_gate() {
        let app = app().await;

        let req = ApiRequest::new(Method::GET, "/api/admin/stats");
        let response = handle_admin_stats(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let req = ApiRequest::new(Method::GET, "/api/admin/stats").with_principal(owner());
        let response = handle_admin_stats(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let req = ApiRequest::new(Method::GET, "/api/admin/stats").with_principal(admin());
        let response = handle_admin_stats(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totalHomes"], 1);
        assert_eq!(body["totalTasks"], 1);
        assert_eq!(body["totalItems"], 1);
        assert_eq!(body["totalUsers"], 0);
    }

    #[tokio::test]
    async fn test_list_users_with_counts() {
        let app = app().await;
        seed_users(&app).await;

        let req = ApiRequest::new(Method::GET, "/api/admin/users").with_principal(owner());
        let response = handle_list_users(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let req = ApiRequest::new(Method::GET, "/api/admin/users").with_principal(admin());
        let response = handle_list_users(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);

        let olive = users.iter().find(|u| u["id"] == "owner").unwrap();
        assert_eq!(olive["ownedHomes"], 1);
        assert_eq!(olive["createdTasks"], 0);
        let bob = users.iter().find(|u| u["id"] == "bob").unwrap();
        assert_eq!(bob["ownedHomes"], 0);
        assert_eq!(bob["createdTasks"], 1);
        assert_eq!(bob["isDisabled"], false);
    }

    #[tokio::test]
    async fn test_update_user_role_and_flag() {
        let app = app().await;
        seed_users(&app).await;

        let req = ApiRequest::new(Method::PATCH, "/api/admin/users")
            .with_principal(admin())
            .with_json(&json!({ "userId": "bob", "role": "ADMIN", "isDisabled": true }));
        let response = handle_update_user(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "ADMIN");
        assert_eq!(body["isDisabled"], true);

        let req = ApiRequest::new(Method::PATCH, "/api/admin/users")
            .with_principal(admin())
            .with_json(&json!({ "userId": "bob", "isDisabled": false }));
        let body = body_json(handle_update_user(&app.state, &req).await).await;
        assert_eq!(body["role"], "ADMIN");
        assert_eq!(body["isDisabled"], false);
    }

    #[tokio::test]
    async fn test_update_user_rejects_bad_input() {
        let app = app().await;
        seed_users(&app).await;

        let patch = |body: serde_json::Value| {
            ApiRequest::new(Method::PATCH, "/api/admin/users")
                .with_principal(admin())
                .with_json(&body)
        };

        let response = handle_update_user(&app.state, &patch(json!({ "userId": "bob" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handle_update_user(&app.state, &patch(json!({ "role": "ADMIN" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handle_update_user(
            &app.state,
            &patch(json!({ "userId": "bob", "role": "OWNER" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handle_update_user(
            &app.state,
            &patch(json!({ "userId": "ghost", "isDisabled": true })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "User not found");

        let req = ApiRequest::new(Method::PATCH, "/api/admin/users")
            .with_principal(owner())
            .with_json(&json!({ "userId": "bob", "role": "ADMIN" }));
        let response = handle_update_user(&app.state, &req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
