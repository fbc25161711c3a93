//! Pending share invitation document
//!
//! Unique on (home_id, email) and on token. Replacing the document for a
//! pair swaps in a new token, so the previous one stops resolving.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::ShareRole;
use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::Invitation;

/// Collection name for pending invitations
pub const PENDING_HOME_SHARE_COLLECTION: &str = "pending_home_shares";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PendingHomeShareDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub home_id: String,

    /// Normalized (trimmed, lowercase) invitee email
    pub email: String,

    pub role: ShareRole,

    /// Opaque redemption capability
    pub token: String,

    pub expires_at: DateTime,

    /// User id of the inviter
    pub invited_by: String,
}

impl Default for PendingHomeShareDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            home_id: String::new(),
            email: String::new(),
            role: ShareRole::Read,
            token: String::new(),
            expires_at: DateTime::now(),
            invited_by: String::new(),
        }
    }
}

impl PendingHomeShareDoc {
    /// Filter addressing the invitation for one email on one home
    pub fn key(home_id: &str, email: &str) -> Document {
        doc! { "home_id": home_id, "email": email }
    }

    /// Replacement document for an upsert; keeps any existing `_id`
    pub fn from_invitation(invitation: &Invitation) -> Self {
        let mut metadata = Metadata::new();
        metadata.created_at = Some(DateTime::from_chrono(invitation.created_at));
        Self {
            _id: None,
            metadata,
            home_id: invitation.home_id.clone(),
            email: invitation.email.clone(),
            role: invitation.role,
            token: invitation.token.clone(),
            expires_at: DateTime::from_chrono(invitation.expires_at),
            invited_by: invitation.invited_by.clone(),
        }
    }

    pub fn into_invitation(self) -> Invitation {
        let created_at = self
            .metadata
            .created_at
            .unwrap_or(self.expires_at)
            .to_chrono();
        Invitation {
            id: self._id.map(|id| id.to_hex()).unwrap_or_default(),
            home_id: self.home_id,
            email: self.email,
            role: self.role,
            token: self.token,
            expires_at: self.expires_at.to_chrono(),
            invited_by: self.invited_by,
            created_at,
        }
    }
}

impl IntoIndexes for PendingHomeShareDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "home_id": 1, "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("home_email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_invitation_conversion_keeps_fields() {
        let now = Utc::now();
        let invitation = Invitation {
            id: String::new(),
            home_id: "h1".into(),
            email: "bob@x.com".into(),
            role: ShareRole::Write,
            token: "abc".into(),
            expires_at: now + Duration::days(7),
            invited_by: "u1".into(),
            created_at: now,
        };

        let mut doc = PendingHomeShareDoc::from_invitation(&invitation);
        assert!(doc._id.is_none());
        doc._id = Some(ObjectId::new());

        let back = doc.into_invitation();
        assert_eq!(back.token, "abc");
        assert_eq!(back.role, ShareRole::Write);
        assert_eq!(back.email, "bob@x.com");
        assert!(!back.id.is_empty());
        // bson stores millisecond precision
        assert_eq!(
            back.expires_at.timestamp_millis(),
            invitation.expires_at.timestamp_millis()
        );
    }
}
