//! User document schema
//!
//! Accounts are managed by the auth service. homegate reads them to check
//! grant targets and to count users for admin stats.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{User, UserUpdate};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Set by an admin; the auth service refuses sign-in while true
    #[serde(default)]
    pub is_disabled: bool,
}

impl UserDoc {
    /// `$set` document for an admin change
    pub fn update_document(update: &UserUpdate) -> Document {
        let mut set = doc! { "metadata.updated_at": bson::DateTime::now() };
        if let Some(role) = update.role {
            set.insert("role", role.to_string());
        }
        if let Some(is_disabled) = update.is_disabled {
            set.insert("is_disabled", is_disabled);
        }
        doc! { "$set": set }
    }
}

impl From<UserDoc> for User {
    fn from(doc: UserDoc) -> Self {
        User {
            id: doc.id,
            email: doc.email,
            name: doc.name,
            role: doc.role,
            is_disabled: doc.is_disabled,
            created_at: doc.metadata.created_at.map(|t| t.to_chrono()),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_document_sets_only_given_fields() {
        let update = UserDoc::update_document(&UserUpdate {
            role: Some(Role::Admin),
            is_disabled: None,
        });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("role").unwrap(), "ADMIN");
        assert!(!set.contains_key("is_disabled"));
        assert!(set.contains_key("metadata.updated_at"));
    }

    #[test]
    fn test_user_doc_without_flag_is_enabled() {
        let raw = doc! { "_id": "u1", "email": "u1@x.com", "role": "USER" };
        let user = User::from(bson::from_document::<UserDoc>(raw).unwrap());
        assert!(!user.is_disabled);
        assert_eq!(user.role, Role::User);
    }
}
