//! Collaborator grant document (one per home/user pair)

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::ShareRole;
use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::Grant;

/// Collection name for collaborator grants
pub const HOME_SHARE_COLLECTION: &str = "home_shares";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HomeShareDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub home_id: String,

    pub user_id: String,

    pub role: ShareRole,

    pub created_at: DateTime,
}

impl Default for HomeShareDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            home_id: String::new(),
            user_id: String::new(),
            role: ShareRole::Read,
            created_at: DateTime::now(),
        }
    }
}

impl HomeShareDoc {
    /// Filter addressing the grant of one user on one home
    pub fn key(home_id: &str, user_id: &str) -> Document {
        doc! { "home_id": home_id, "user_id": user_id }
    }

    /// Update that sets the role, creating the document if absent.
    /// `created_at` is kept when an existing grant is replaced.
    pub fn upsert_update(grant: &Grant) -> Document {
        doc! {
            "$set": {
                "role": grant.role.as_str(),
                "metadata.updated_at": DateTime::now(),
            },
            "$setOnInsert": {
                "created_at": DateTime::from_chrono(grant.created_at),
                "metadata.is_deleted": false,
                "metadata.created_at": DateTime::now(),
            },
        }
    }
}

impl From<HomeShareDoc> for Grant {
    fn from(doc: HomeShareDoc) -> Self {
        Grant {
            home_id: doc.home_id,
            user_id: doc.user_id,
            role: doc.role,
            created_at: doc.created_at.to_chrono(),
        }
    }
}

impl IntoIndexes for HomeShareDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "home_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("home_user_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_upsert_update_sets_role() {
        let grant = Grant {
            home_id: "h1".into(),
            user_id: "u1".into(),
            role: ShareRole::Write,
            created_at: Utc::now(),
        };
        let update = HomeShareDoc::upsert_update(&grant);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("role").unwrap(), "WRITE");
        assert!(update
            .get_document("$setOnInsert")
            .unwrap()
            .contains_key("created_at"));
    }
}
