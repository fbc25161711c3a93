//! Health check endpoint

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since startup
    pub uptime: u64,
    /// "development" or "production"
    pub mode: &'static str,
    /// "mongodb" or "memory"
    pub storage: &'static str,
    pub timestamp: String,
}

pub fn health_check(state: &AppState) -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            mode: if state.args.dev_mode {
                "development"
            } else {
                "production"
            },
            storage: state.storage_backend,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, body_json};

    #[tokio::test]
    async fn test_health_reports_backend() {
        let app = app().await;
        let response = health_check(&app.state);
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["mode"], "development");
    }
}
