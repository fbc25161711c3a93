//! Audit trail for access-control changes
//!
//! Every event that creates, changes, or removes someone's access is
//! emitted as one JSON line on the `homegate::audit` tracing target, so it
//! can be routed separately from operational logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::auth::{Role, ShareRole};

/// Tracing target for audit lines
pub const AUDIT_TARGET: &str = "homegate::audit";

/// Access-control events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent<'a> {
    InvitationCreated {
        home_id: &'a str,
        email: &'a str,
        role: ShareRole,
        invited_by: &'a str,
    },
    InvitationResent {
        home_id: &'a str,
        email: &'a str,
    },
    InvitationRevoked {
        home_id: &'a str,
        email: &'a str,
        revoked_by: &'a str,
    },
    InvitationExpired {
        home_id: &'a str,
        email: &'a str,
    },
    InvitationRedeemed {
        home_id: &'a str,
        user_id: &'a str,
        role: ShareRole,
    },
    GrantCreated {
        home_id: &'a str,
        user_id: &'a str,
        role: ShareRole,
        granted_by: &'a str,
    },
    GrantRemoved {
        home_id: &'a str,
        user_id: &'a str,
        removed_by: &'a str,
    },
    AdminDenied {
        user_id: &'a str,
        role: Role,
    },
    UserUpdated {
        user_id: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<Role>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_disabled: Option<bool>,
        updated_by: &'a str,
    },
}

#[derive(Serialize)]
struct AuditLine<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a AuditEvent<'a>,
}

/// Render an event as a JSON line
pub fn to_jsonl(event: &AuditEvent<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&AuditLine {
        timestamp: Utc::now(),
        event,
    })
}

/// Emit an audit event
pub fn record(event: &AuditEvent<'_>) {
    match to_jsonl(event) {
        Ok(line) => info!(target: AUDIT_TARGET, "{}", line),
        Err(e) => error!("Failed to serialize audit event {:?}: {}", event, e),
    }
}
