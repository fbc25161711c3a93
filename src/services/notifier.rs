//! Invitation delivery
//!
//! homegate only generates the token and persists the expiry. Delivering
//! the invite (email, chat, ...) is the notifier's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::types::{HomegateError, Result};

/// What the invitee needs to accept an invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteNotice {
    pub email: String,
    pub home_name: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Display name of the inviter
    pub invited_by: String,
}

/// Sink for invitation notices
#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send_invite(&self, notice: &InviteNotice) -> Result<()>;
}

/// Logs issued invitations instead of sending mail.
///
/// The token is the redemption capability, so the accept link is only
/// logged (at debug) when links are enabled, which `main` does in dev mode.
pub struct LogNotifier {
    app_url: String,
    show_links: bool,
}

impl LogNotifier {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
            show_links: false,
        }
    }

    /// Also log the accept link
    pub fn with_links(mut self, show_links: bool) -> Self {
        self.show_links = show_links;
        self
    }

    pub fn invite_url(&self, token: &str) -> String {
        format!("{}/invite/accept/{}", self.app_url, token)
    }

    fn loggable_link(&self, token: &str) -> Option<String> {
        self.show_links.then(|| self.invite_url(token))
    }
}

#[async_trait]
impl InviteNotifier for LogNotifier {
    async fn send_invite(&self, notice: &InviteNotice) -> Result<()> {
        info!(
            email = %notice.email,
            home = %notice.home_name,
            invited_by = %notice.invited_by,
            expires_at = %notice.expires_at,
            "Invitation issued"
        );
        if let Some(link) = self.loggable_link(&notice.token) {
            debug!(email = %notice.email, "Invitation link: {}", link);
        }
        Ok(())
    }
}

/// Keeps every notice in memory (dev mode inspection and tests)
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<InviteNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<InviteNotice> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InviteNotifier for RecordingNotifier {
    async fn send_invite(&self, notice: &InviteNotice) -> Result<()> {
        if self.fail {
            return Err(HomegateError::Internal("delivery failed".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notice.clone());
        }
        Ok(())
    }
}
