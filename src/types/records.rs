//! Domain records exchanged with the storage layer
//!
//! These are storage-agnostic; `db::schemas` holds the MongoDB documents
//! they are converted from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::{Role, ShareRole};
use crate::types::{HomegateError, Result};

/// Top-level owned resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home {
    pub id: String,
    pub owner_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub home_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub room_id: String,
}

/// Where a task is attached. Exactly one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    Home(String),
    Room(String),
    Item(String),
}

impl TaskScope {
    /// Build from the three optional parent references a task row carries.
    ///
    /// Zero or several references is a data-integrity violation.
    pub fn from_refs(
        task_id: &str,
        home_id: Option<String>,
        room_id: Option<String>,
        item_id: Option<String>,
    ) -> Result<Self> {
        match (home_id, room_id, item_id) {
            (Some(h), None, None) => Ok(Self::Home(h)),
            (None, Some(r), None) => Ok(Self::Room(r)),
            (None, None, Some(i)) => Ok(Self::Item(i)),
            (None, None, None) => Err(HomegateError::Integrity(format!(
                "task {} has no scope reference",
                task_id
            ))),
            _ => Err(HomegateError::Integrity(format!(
                "task {} has more than one scope reference",
                task_id
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub scope: TaskScope,
}

/// Parent of a paint or flooring record: a home or one of its rooms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentScope {
    Home(String),
    Room(String),
}

impl ParentScope {
    pub fn from_refs(
        kind: ResourceKind,
        record_id: &str,
        home_id: Option<String>,
        room_id: Option<String>,
    ) -> Result<Self> {
        match (home_id, room_id) {
            (Some(h), None) => Ok(Self::Home(h)),
            (None, Some(r)) => Ok(Self::Room(r)),
            (None, None) => Err(HomegateError::Integrity(format!(
                "{} {} has no scope reference",
                kind.label(),
                record_id
            ))),
            (Some(_), Some(_)) => Err(HomegateError::Integrity(format!(
                "{} {} has more than one scope reference",
                kind.label(),
                record_id
            ))),
        }
    }
}

/// Paint or flooring record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub id: String,
    pub scope: ParentScope,
}

/// Collaborator grant on a home (HomeShare)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub home_id: String,
    pub user_id: String,
    pub role: ShareRole,
    pub created_at: DateTime<Utc>,
}

/// Pending, token-keyed share invitation (PendingHomeShare)
///
/// Never serialized directly: the token must only travel to the invitee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: String,
    pub home_id: String,
    pub email: String,
    pub role: ShareRole,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Owner-facing view, without the token
    pub fn to_public(&self) -> PublicInvitation {
        PublicInvitation {
            id: self.id.clone(),
            home_id: self.home_id.clone(),
            email: self.email.clone(),
            role: self.role,
            expires_at: self.expires_at,
            invited_by: self.invited_by.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInvitation {
    pub id: String,
    pub home_id: String,
    pub email: String,
    pub role: ShareRole,
    pub expires_at: DateTime<Utc>,
    pub invited_by: String,
}

/// What the invitee sees when opening an invite link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDetails {
    pub email: String,
    pub home_name: String,
    pub role: ShareRole,
}

/// Registered account, as far as access control needs it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of the admin user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub is_disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    /// Homes this user owns
    pub owned_homes: u64,
    /// Tasks this user created
    pub created_tasks: u64,
}

impl UserSummary {
    pub fn new(user: User, owned_homes: u64, created_tasks: u64) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_disabled: user.is_disabled,
            created_at: user.created_at,
            owned_homes,
            created_tasks,
        }
    }
}

/// Admin change to an account. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub is_disabled: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_disabled.is_none()
    }
}

/// Platform-wide counts for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_homes: u64,
    pub total_tasks: u64,
    pub total_items: u64,
}

/// Kinds of resource that live under a home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Home,
    Room,
    Item,
    Task,
    Paint,
    Flooring,
}

impl ResourceKind {
    /// Human-readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Home => "Home",
            ResourceKind::Room => "Room",
            ResourceKind::Item => "Item",
            ResourceKind::Task => "Task",
            ResourceKind::Paint => "Paint",
            ResourceKind::Flooring => "Flooring",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = HomegateError;

    /// Accepts the singular or plural path segment (`room`, `rooms`, ...)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "home" | "homes" => Ok(ResourceKind::Home),
            "room" | "rooms" => Ok(ResourceKind::Room),
            "item" | "items" => Ok(ResourceKind::Item),
            "task" | "tasks" => Ok(ResourceKind::Task),
            "paint" | "paints" => Ok(ResourceKind::Paint),
            "flooring" | "floorings" => Ok(ResourceKind::Flooring),
            other => Err(HomegateError::BadRequest(format!(
                "Unknown resource kind: {}",
                other
            ))),
        }
    }
}

/// Reference to a resource whose owning home must be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn home(id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Home, id)
    }

    pub fn room(id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Room, id)
    }

    pub fn item(id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Item, id)
    }

    pub fn task(id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Task, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_scope_requires_exactly_one_parent() {
        assert_eq!(
            TaskScope::from_refs("t1", None, Some("r1".into()), None).unwrap(),
            TaskScope::Room("r1".into())
        );
        assert!(matches!(
            TaskScope::from_refs("t1", None, None, None),
            Err(HomegateError::Integrity(_))
        ));
        assert!(matches!(
            TaskScope::from_refs("t1", Some("h1".into()), None, Some("i1".into())),
            Err(HomegateError::Integrity(_))
        ));
    }

    #[test]
    fn test_parent_scope_requires_exactly_one_parent() {
        assert_eq!(
            ParentScope::from_refs(ResourceKind::Paint, "p1", Some("h1".into()), None).unwrap(),
            ParentScope::Home("h1".into())
        );
        assert!(matches!(
            ParentScope::from_refs(
                ResourceKind::Flooring,
                "f1",
                Some("h1".into()),
                Some("r1".into())
            ),
            Err(HomegateError::Integrity(_))
        ));
    }

    #[test]
    fn test_resource_kind_from_path_segment() {
        assert_eq!("rooms".parse::<ResourceKind>().unwrap(), ResourceKind::Room);
        assert_eq!("Task".parse::<ResourceKind>().unwrap(), ResourceKind::Task);
        assert!("garages".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_public_invitation_omits_token() {
        let now = Utc::now();
        let invitation = Invitation {
            id: "inv-1".into(),
            home_id: "home-1".into(),
            email: "bob@x.com".into(),
            role: ShareRole::Read,
            token: "secret-token".into(),
            expires_at: now,
            invited_by: "owner-1".into(),
            created_at: now,
        };
        let json = serde_json::to_string(&invitation.to_public()).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"homeId\":\"home-1\""));
    }
}
