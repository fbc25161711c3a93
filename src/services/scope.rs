//! Resource scope resolution and per-resource authorization
//!
//! Every nested resource (room, item, task, paint, flooring) is resolved to
//! its owning home by walking stored parent links. The home is never taken
//! from the request alone; a caller-supplied home id is only cross-checked
//! against the resolved one.
//!
//! Deny outcomes are all reported as the same combined "not found or
//! insufficient permissions" error, whether the resource exists or not.

use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::{effective_permission, AccessLevel, Principal};
use crate::db::AccessStore;
use crate::types::{
    Home, HomegateError, ParentScope, ResourceKind, ResourceRef, Result, TaskScope,
};

/// Outcome of a successful authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    /// The resource's owning home
    pub home: Home,
    /// Principal's effective access on that home
    pub access: AccessLevel,
}

/// Walks the containment hierarchy and evaluates access on the owning home
#[derive(Clone)]
pub struct ScopeResolver {
    store: Arc<dyn AccessStore>,
}

impl ScopeResolver {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }

    /// Id of the home that owns `resource`.
    ///
    /// A missing target is `NotFound`; a missing link further up the chain
    /// is an `Integrity` violation.
    pub async fn resolve_home(&self, resource: &ResourceRef) -> Result<String> {
        Ok(self.resolve(resource).await?.id)
    }

    /// Resolve `resource` and check that `principal` holds at least
    /// `required` on its owning home.
    ///
    /// If `claimed_home` is given it must match the resolved home.
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        resource: &ResourceRef,
        claimed_home: Option<&str>,
        required: AccessLevel,
    ) -> Result<Authorized> {
        let denied = || HomegateError::hidden(resource.kind.label());

        let Some(principal) = principal else {
            return Err(denied());
        };

        let home = match self.resolve(resource).await {
            Ok(home) => home,
            Err(HomegateError::NotFound(_)) => return Err(denied()),
            Err(e) => {
                if let HomegateError::Integrity(ref detail) = e {
                    error!(
                        kind = %resource.kind,
                        id = %resource.id,
                        "Scope resolution integrity violation: {}",
                        detail
                    );
                }
                return Err(e);
            }
        };

        if let Some(claimed) = claimed_home {
            if claimed != home.id {
                debug!(
                    kind = %resource.kind,
                    id = %resource.id,
                    claimed,
                    actual = %home.id,
                    "Claimed home does not match resource"
                );
                return Err(denied());
            }
        }

        let grant = if home.owner_id == principal.id {
            None
        } else {
            self.store.get_grant(&home.id, &principal.id).await?
        };
        let access = effective_permission(Some(&principal.id), &home, grant.as_ref());

        if !access.allows(required) || access == AccessLevel::None {
            debug!(
                user_id = %principal.id,
                home_id = %home.id,
                %access,
                %required,
                "Access denied"
            );
            return Err(denied());
        }

        Ok(Authorized { home, access })
    }

    /// Authorize directly against a home id
    pub async fn authorize_home(
        &self,
        principal: Option<&Principal>,
        home_id: &str,
        required: AccessLevel,
    ) -> Result<Authorized> {
        self.authorize(principal, &ResourceRef::home(home_id), None, required)
            .await
    }

    /// Home where `principal` is the owner, or the combined not-found error
    pub async fn owned_home(&self, principal: &Principal, home_id: &str) -> Result<Home> {
        match self.store.get_home(home_id).await? {
            Some(home) if home.owner_id == principal.id => Ok(home),
            _ => Err(HomegateError::hidden(ResourceKind::Home.label())),
        }
    }

    async fn resolve(&self, resource: &ResourceRef) -> Result<Home> {
        let id = resource.id.as_str();
        match resource.kind {
            ResourceKind::Home => self
                .store
                .get_home(id)
                .await?
                .ok_or_else(|| HomegateError::hidden(ResourceKind::Home.label())),
            ResourceKind::Room => {
                let room = self
                    .store
                    .get_room(id)
                    .await?
                    .ok_or_else(|| HomegateError::hidden(ResourceKind::Room.label()))?;
                self.parent_home(&room.home_id, ResourceKind::Room, id).await
            }
            ResourceKind::Item => {
                let item = self
                    .store
                    .get_item(id)
                    .await?
                    .ok_or_else(|| HomegateError::hidden(ResourceKind::Item.label()))?;
                self.home_of_room(&item.room_id, ResourceKind::Item, id).await
            }
            ResourceKind::Task => {
                let task = self
                    .store
                    .get_task(id)
                    .await?
                    .ok_or_else(|| HomegateError::hidden(ResourceKind::Task.label()))?;
                match task.scope {
                    TaskScope::Home(home_id) => {
                        self.parent_home(&home_id, ResourceKind::Task, id).await
                    }
                    TaskScope::Room(room_id) => {
                        self.home_of_room(&room_id, ResourceKind::Task, id).await
                    }
                    TaskScope::Item(item_id) => {
                        let item = self.store.get_item(&item_id).await?.ok_or_else(|| {
                            orphan(ResourceKind::Task, id, ResourceKind::Item, &item_id)
                        })?;
                        self.home_of_room(&item.room_id, ResourceKind::Item, &item_id)
                            .await
                    }
                }
            }
            ResourceKind::Paint | ResourceKind::Flooring => {
                let surface = if resource.kind == ResourceKind::Paint {
                    self.store.get_paint(id).await?
                } else {
                    self.store.get_flooring(id).await?
                };
                let surface =
                    surface.ok_or_else(|| HomegateError::hidden(resource.kind.label()))?;
                match surface.scope {
                    ParentScope::Home(home_id) => {
                        self.parent_home(&home_id, resource.kind, id).await
                    }
                    ParentScope::Room(room_id) => {
                        self.home_of_room(&room_id, resource.kind, id).await
                    }
                }
            }
        }
    }

    async fn home_of_room(
        &self,
        room_id: &str,
        child: ResourceKind,
        child_id: &str,
    ) -> Result<Home> {
        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or_else(|| orphan(child, child_id, ResourceKind::Room, room_id))?;
        self.parent_home(&room.home_id, ResourceKind::Room, room_id)
            .await
    }

    async fn parent_home(
        &self,
        home_id: &str,
        child: ResourceKind,
        child_id: &str,
    ) -> Result<Home> {
        self.store
            .get_home(home_id)
            .await?
            .ok_or_else(|| orphan(child, child_id, ResourceKind::Home, home_id))
    }
}

fn orphan(
    child: ResourceKind,
    child_id: &str,
    parent: ResourceKind,
    parent_id: &str,
) -> HomegateError {
    HomegateError::Integrity(format!(
        "{} {} references missing {} {}",
        child.label(),
        child_id,
        parent.label().to_lowercase(),
        parent_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Role, ShareRole};
    use crate::db::MemoryAccessStore;
    use crate::types::Grant;
    use chrono::Utc;

    fn owner() -> Principal {
        Principal::new("owner", "owner@x.com", Role::User)
    }

    fn carol() -> Principal {
        Principal::new("carol", "carol@x.com", Role::User)
    }

    fn stranger() -> Principal {
        Principal::new("mallory", "mallory@x.com", Role::User)
    }

    /// h1 (owner) > r1 > i1; carol holds READ on h1; h2 belongs to someone else
    async fn fixture() -> (Arc<MemoryAccessStore>, ScopeResolver) {
        let store = Arc::new(MemoryAccessStore::new());
        store.insert_home("h1", "owner", "Lake House").await;
        store.insert_home("h2", "other", "Cabin").await;
        store.insert_room("r1", "h1").await;
        store.insert_item("i1", "r1").await;
        store.insert_task("t-home", Some("h1"), None, None).await;
        store.insert_task("t-room", None, Some("r1"), None).await;
        store.insert_task("t-item", None, None, Some("i1")).await;
        store.insert_paint("p1", None, Some("r1")).await;
        store.insert_flooring("f1", Some("h1"), None).await;
        store
            .upsert_grant(Grant {
                home_id: "h1".into(),
                user_id: "carol".into(),
                role: ShareRole::Read,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let resolver = ScopeResolver::new(store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_resolve_home_walks_every_chain() {
        let (_store, resolver) = fixture().await;

        for resource in [
            ResourceRef::home("h1"),
            ResourceRef::room("r1"),
            ResourceRef::item("i1"),
            ResourceRef::task("t-home"),
            ResourceRef::task("t-room"),
            ResourceRef::task("t-item"),
            ResourceRef::new(ResourceKind::Paint, "p1"),
            ResourceRef::new(ResourceKind::Flooring, "f1"),
        ] {
            assert_eq!(resolver.resolve_home(&resource).await.unwrap(), "h1");
        }
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let (_store, resolver) = fixture().await;
        let err = resolver
            .resolve_home(&ResourceRef::item("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, HomegateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_orphan_link_is_integrity_violation() {
        let (store, resolver) = fixture().await;
        store.insert_item("i-orphan", "gone-room").await;
        store.insert_room("r-orphan", "gone-home").await;

        assert!(matches!(
            resolver.resolve_home(&ResourceRef::item("i-orphan")).await,
            Err(HomegateError::Integrity(_))
        ));
        assert!(matches!(
            resolver.resolve_home(&ResourceRef::room("r-orphan")).await,
            Err(HomegateError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_task_scope_is_not_a_deny() {
        let (store, resolver) = fixture().await;
        store.insert_task("t-bad", Some("h1"), Some("r1"), None).await;

        let err = resolver
            .authorize(
                Some(&owner()),
                &ResourceRef::task("t-bad"),
                None,
                AccessLevel::Read,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HomegateError::Integrity(_)));
        assert!(err.is_internal());
    }

    #[tokio::test]
    async fn test_read_collaborator_can_list_but_not_create_under_room() {
        let (_store, resolver) = fixture().await;
        let room = ResourceRef::room("r1");

        let write = resolver
            .authorize(Some(&carol()), &room, None, AccessLevel::Write)
            .await
            .unwrap_err();
        assert_eq!(
            write.to_string(),
            "Room not found or insufficient permissions"
        );

        let read = resolver
            .authorize(Some(&carol()), &room, None, AccessLevel::Read)
            .await
            .unwrap();
        assert_eq!(read.access, AccessLevel::Read);
        assert_eq!(read.home.id, "h1");
    }

    #[tokio::test]
    async fn test_owner_gets_write_everywhere() {
        let (_store, resolver) = fixture().await;
        let ok = resolver
            .authorize(
                Some(&owner()),
                &ResourceRef::task("t-item"),
                Some("h1"),
                AccessLevel::Write,
            )
            .await
            .unwrap();
        assert_eq!(ok.access, AccessLevel::Write);
    }

    #[tokio::test]
    async fn test_unrelated_user_sees_same_error_as_nonexistent_task() {
        let (_store, resolver) = fixture().await;

        let forbidden = resolver
            .authorize(
                Some(&stranger()),
                &ResourceRef::task("t-room"),
                None,
                AccessLevel::Read,
            )
            .await
            .unwrap_err();
        let missing = resolver
            .authorize(
                Some(&stranger()),
                &ResourceRef::task("t-does-not-exist"),
                None,
                AccessLevel::Read,
            )
            .await
            .unwrap_err();

        assert_eq!(forbidden.status_code(), missing.status_code());
        assert_eq!(forbidden.to_string(), missing.to_string());
        assert_eq!(forbidden.code(), missing.code());
    }

    #[tokio::test]
    async fn test_claimed_home_mismatch_is_denied() {
        let (store, resolver) = fixture().await;
        store.insert_room("r2", "h2").await;

        // owner of h1 claims a room that actually lives in h2
        let err = resolver
            .authorize(
                Some(&owner()),
                &ResourceRef::room("r2"),
                Some("h1"),
                AccessLevel::Read,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HomegateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unauthenticated_is_denied() {
        let (_store, resolver) = fixture().await;
        let err = resolver
            .authorize(None, &ResourceRef::home("h1"), None, AccessLevel::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, HomegateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_has_no_implicit_home_access() {
        let (_store, resolver) = fixture().await;
        let admin = Principal::new("admin", "admin@x.com", Role::Admin);
        assert!(resolver
            .authorize_home(Some(&admin), "h1", AccessLevel::Read)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_owned_home_rejects_write_collaborator() {
        let (store, resolver) = fixture().await;
        store
            .upsert_grant(Grant {
                home_id: "h1".into(),
                user_id: "carol".into(),
                role: ShareRole::Write,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(resolver.owned_home(&owner(), "h1").await.is_ok());
        assert!(matches!(
            resolver.owned_home(&carol(), "h1").await,
            Err(HomegateError::NotFound(_))
        ));
    }
}
