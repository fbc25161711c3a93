//! Permission levels for home-scoped resources
//!
//! Effective access is derived from ownership and collaborator grants only.
//! The functions here are pure: callers fetch the home and grant first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Grant, Home};

/// Role stored on a collaborator grant or invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShareRole {
    Read,
    Write,
}

impl ShareRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareRole::Read => "READ",
            ShareRole::Write => "WRITE",
        }
    }

    /// Parse the stored/wire form (`READ` / `WRITE`, case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "READ" => Some(ShareRole::Read),
            "WRITE" => Some(ShareRole::Write),
            _ => None,
        }
    }
}

impl fmt::Display for ShareRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved access of a principal on one home
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum AccessLevel {
    /// No relationship to the home
    #[default]
    None = 0,
    /// Read-only collaborator
    Read = 1,
    /// Owner or write collaborator
    Write = 2,
}

impl From<ShareRole> for AccessLevel {
    fn from(role: ShareRole) -> Self {
        match role {
            ShareRole::Read => AccessLevel::Read,
            ShareRole::Write => AccessLevel::Write,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::None => write!(f, "NONE"),
            AccessLevel::Read => write!(f, "READ"),
            AccessLevel::Write => write!(f, "WRITE"),
        }
    }
}

impl AccessLevel {
    /// Whether this level satisfies `required`
    pub fn allows(self, required: AccessLevel) -> bool {
        self >= required
    }
}

/// Effective permission of `principal_id` on `home`, given the principal's
/// grant for that home (if one was found).
///
/// Ownership always wins. A grant belonging to another home or user is
/// ignored rather than trusted.
pub fn effective_permission(
    principal_id: Option<&str>,
    home: &Home,
    grant: Option<&Grant>,
) -> AccessLevel {
    let Some(principal_id) = principal_id else {
        return AccessLevel::None;
    };

    if home.owner_id == principal_id {
        return AccessLevel::Write;
    }

    match grant {
        Some(g) if g.home_id == home.id && g.user_id == principal_id => g.role.into(),
        _ => AccessLevel::None,
    }
}

/// Same as [`effective_permission`] but searching a home's full grant list
pub fn effective_permission_in(
    principal_id: Option<&str>,
    home: &Home,
    grants: &[Grant],
) -> AccessLevel {
    let grant = principal_id.and_then(|pid| {
        grants
            .iter()
            .find(|g| g.home_id == home.id && g.user_id == pid)
    });
    effective_permission(principal_id, home, grant)
}

pub fn has_write_access(principal_id: Option<&str>, home: &Home, grant: Option<&Grant>) -> bool {
    effective_permission(principal_id, home, grant) == AccessLevel::Write
}

pub fn has_read_access(principal_id: Option<&str>, home: &Home, grant: Option<&Grant>) -> bool {
    effective_permission(principal_id, home, grant).allows(AccessLevel::Read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn home() -> Home {
        Home {
            id: "home-1".into(),
            owner_id: "owner".into(),
            name: "Lake House".into(),
        }
    }

    fn grant(home_id: &str, user_id: &str, role: ShareRole) -> Grant {
        Grant {
            home_id: home_id.into(),
            user_id: user_id.into(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_has_write() {
        assert_eq!(
            effective_permission(Some("owner"), &home(), None),
            AccessLevel::Write
        );
    }

    #[test]
    fn test_ownership_dominates_grant() {
        let g = grant("home-1", "owner", ShareRole::Read);
        assert_eq!(
            effective_permission(Some("owner"), &home(), Some(&g)),
            AccessLevel::Write
        );
    }

    #[test]
    fn test_grant_role_is_used() {
        let read = grant("home-1", "bob", ShareRole::Read);
        let write = grant("home-1", "carol", ShareRole::Write);
        assert_eq!(
            effective_permission(Some("bob"), &home(), Some(&read)),
            AccessLevel::Read
        );
        assert_eq!(
            effective_permission(Some("carol"), &home(), Some(&write)),
            AccessLevel::Write
        );
        assert!(has_read_access(Some("bob"), &home(), Some(&read)));
        assert!(!has_write_access(Some("bob"), &home(), Some(&read)));
        assert!(has_write_access(Some("carol"), &home(), Some(&write)));
    }

    #[test]
    fn test_mismatched_grant_is_ignored() {
        let other_home = grant("home-2", "bob", ShareRole::Write);
        let other_user = grant("home-1", "eve", ShareRole::Write);
        assert_eq!(
            effective_permission(Some("bob"), &home(), Some(&other_home)),
            AccessLevel::None
        );
        assert_eq!(
            effective_permission(Some("bob"), &home(), Some(&other_user)),
            AccessLevel::None
        );
    }

    #[test]
    fn test_unauthenticated_has_none() {
        let g = grant("home-1", "bob", ShareRole::Write);
        assert_eq!(effective_permission(None, &home(), Some(&g)), AccessLevel::None);
        assert!(!has_read_access(None, &home(), None));
    }

    #[test]
    fn test_effective_permission_in_grant_list() {
        let grants = vec![
            grant("home-1", "bob", ShareRole::Read),
            grant("home-1", "carol", ShareRole::Write),
        ];
        assert_eq!(
            effective_permission_in(Some("bob"), &home(), &grants),
            AccessLevel::Read
        );
        assert_eq!(
            effective_permission_in(Some("carol"), &home(), &grants),
            AccessLevel::Write
        );
        assert_eq!(
            effective_permission_in(Some("dave"), &home(), &grants),
            AccessLevel::None
        );
        assert_eq!(
            effective_permission_in(Some("owner"), &home(), &[]),
            AccessLevel::Write
        );
    }

    #[test]
    fn test_access_ordering() {
        assert!(AccessLevel::Write > AccessLevel::Read);
        assert!(AccessLevel::Read > AccessLevel::None);
        assert!(AccessLevel::Write.allows(AccessLevel::Read));
        assert!(!AccessLevel::Read.allows(AccessLevel::Write));
    }

    #[test]
    fn test_share_role_parse() {
        assert_eq!(ShareRole::parse("write"), Some(ShareRole::Write));
        assert_eq!(ShareRole::parse("READ"), Some(ShareRole::Read));
        assert_eq!(ShareRole::parse("admin"), None);
    }
}
