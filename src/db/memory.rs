//! In-memory storage
//!
//! Used in dev mode (no MongoDB) and as the test fixture. All state sits
//! behind one lock, which is what makes redemption atomic here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::store::AccessStore;
use crate::types::{
    Grant, Home, Invitation, Item, ParentScope, PlatformStats, ResourceKind, Result, Room,
    Surface, Task, TaskScope, User, UserSummary, UserUpdate,
};

/// Task row as stored, before scope validation
#[derive(Debug, Clone, Default)]
struct TaskRow {
    home_id: Option<String>,
    room_id: Option<String>,
    item_id: Option<String>,
    creator_id: Option<String>,
}

/// Paint/flooring row as stored, before scope validation
#[derive(Debug, Clone, Default)]
struct SurfaceRow {
    home_id: Option<String>,
    room_id: Option<String>,
}

#[derive(Default)]
struct Inner {
    homes: HashMap<String, Home>,
    rooms: HashMap<String, Room>,
    items: HashMap<String, Item>,
    tasks: HashMap<String, TaskRow>,
    paints: HashMap<String, SurfaceRow>,
    floorings: HashMap<String, SurfaceRow>,
    users: HashMap<String, User>,
    /// (home_id, user_id) -> grant
    grants: HashMap<(String, String), Grant>,
    /// (home_id, email) -> invitation
    invitations: HashMap<(String, String), Invitation>,
}

impl Inner {
    fn invitation_key_for_token(&self, token: &str) -> Option<(String, String)> {
        self.invitations
            .iter()
            .find(|(_, inv)| inv.token == token)
            .map(|(key, _)| key.clone())
    }

    /// Insert or replace a grant, keeping the original `created_at`
    fn put_grant(&mut self, mut grant: Grant) -> Grant {
        let key = (grant.home_id.clone(), grant.user_id.clone());
        if let Some(existing) = self.grants.get(&key) {
            grant.created_at = existing.created_at;
        }
        self.grants.insert(key, grant.clone());
        grant
    }
}

/// Access store held entirely in process memory
#[derive(Default)]
pub struct MemoryAccessStore {
    inner: RwLock<Inner>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_home(&self, id: &str, owner_id: &str, name: &str) {
        self.inner.write().await.homes.insert(
            id.to_string(),
            Home {
                id: id.to_string(),
                owner_id: owner_id.to_string(),
                name: name.to_string(),
            },
        );
    }

    pub async fn insert_room(&self, id: &str, home_id: &str) {
        self.inner.write().await.rooms.insert(
            id.to_string(),
            Room {
                id: id.to_string(),
                home_id: home_id.to_string(),
            },
        );
    }

    pub async fn insert_item(&self, id: &str, room_id: &str) {
        self.inner.write().await.items.insert(
            id.to_string(),
            Item {
                id: id.to_string(),
                room_id: room_id.to_string(),
            },
        );
    }

    /// Insert a task with raw parent references, valid or not
    pub async fn insert_task(
        &self,
        id: &str,
        home_id: Option<&str>,
        room_id: Option<&str>,
        item_id: Option<&str>,
    ) {
        self.inner.write().await.tasks.insert(
            id.to_string(),
            TaskRow {
                home_id: home_id.map(str::to_string),
                room_id: room_id.map(str::to_string),
                item_id: item_id.map(str::to_string),
                creator_id: None,
            },
        );
    }

    /// Record who created a task
    pub async fn set_task_creator(&self, task_id: &str, creator_id: &str) {
        if let Some(row) = self.inner.write().await.tasks.get_mut(task_id) {
            row.creator_id = Some(creator_id.to_string());
        }
    }

    pub async fn insert_paint(&self, id: &str, home_id: Option<&str>, room_id: Option<&str>) {
        self.inner.write().await.paints.insert(
            id.to_string(),
            SurfaceRow {
                home_id: home_id.map(str::to_string),
                room_id: room_id.map(str::to_string),
            },
        );
    }

    pub async fn insert_flooring(&self, id: &str, home_id: Option<&str>, room_id: Option<&str>) {
        self.inner.write().await.floorings.insert(
            id.to_string(),
            SurfaceRow {
                home_id: home_id.map(str::to_string),
                room_id: room_id.map(str::to_string),
            },
        );
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    /// Number of grants across all homes
    pub async fn grant_count(&self) -> usize {
        self.inner.read().await.grants.len()
    }
}

fn surface(kind: ResourceKind, id: &str, row: &SurfaceRow) -> Result<Surface> {
    Ok(Surface {
        id: id.to_string(),
        scope: ParentScope::from_refs(kind, id, row.home_id.clone(), row.room_id.clone())?,
    })
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn get_home(&self, home_id: &str) -> Result<Option<Home>> {
        Ok(self.inner.read().await.homes.get(home_id).cloned())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        Ok(self.inner.read().await.rooms.get(room_id).cloned())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(self.inner.read().await.items.get(item_id).cloned())
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let inner = self.inner.read().await;
        let Some(row) = inner.tasks.get(task_id) else {
            return Ok(None);
        };
        let scope = TaskScope::from_refs(
            task_id,
            row.home_id.clone(),
            row.room_id.clone(),
            row.item_id.clone(),
        )?;
        Ok(Some(Task {
            id: task_id.to_string(),
            scope,
        }))
    }

    async fn get_paint(&self, paint_id: &str) -> Result<Option<Surface>> {
        let inner = self.inner.read().await;
        inner
            .paints
            .get(paint_id)
            .map(|row| surface(ResourceKind::Paint, paint_id, row))
            .transpose()
    }

    async fn get_flooring(&self, flooring_id: &str) -> Result<Option<Surface>> {
        let inner = self.inner.read().await;
        inner
            .floorings
            .get(flooring_id)
            .map(|row| surface(ResourceKind::Flooring, flooring_id, row))
            .transpose()
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let inner = self.inner.read().await;
        let mut users: Vec<UserSummary> = inner
            .users
            .values()
            .map(|user| {
                let owned_homes = inner
                    .homes
                    .values()
                    .filter(|h| h.owner_id == user.id)
                    .count() as u64;
                let created_tasks = inner
                    .tasks
                    .values()
                    .filter(|t| t.creator_id.as_deref() == Some(user.id.as_str()))
                    .count() as u64;
                UserSummary::new(user.clone(), owned_homes, created_tasks)
            })
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<Option<User>> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_disabled) = update.is_disabled {
            user.is_disabled = is_disabled;
        }
        Ok(Some(user.clone()))
    }

    async fn get_grant(&self, home_id: &str, user_id: &str) -> Result<Option<Grant>> {
        Ok(self
            .inner
            .read()
            .await
            .grants
            .get(&(home_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn list_grants(&self, home_id: &str) -> Result<Vec<Grant>> {
        let inner = self.inner.read().await;
        let mut grants: Vec<Grant> = inner
            .grants
            .values()
            .filter(|g| g.home_id == home_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(grants)
    }

    async fn upsert_grant(&self, grant: Grant) -> Result<Grant> {
        Ok(self.inner.write().await.put_grant(grant))
    }

    async fn delete_grant(&self, home_id: &str, user_id: &str) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .await
            .grants
            .remove(&(home_id.to_string(), user_id.to_string()))
            .is_some())
    }

    async fn upsert_invitation(&self, invitation: Invitation) -> Result<Invitation> {
        let key = (invitation.home_id.clone(), invitation.email.clone());
        self.inner
            .write()
            .await
            .invitations
            .insert(key, invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .invitations
            .values()
            .find(|inv| inv.token == token)
            .cloned())
    }

    async fn get_invitation(&self, home_id: &str, email: &str) -> Result<Option<Invitation>> {
        Ok(self
            .inner
            .read()
            .await
            .invitations
            .get(&(home_id.to_string(), email.to_string()))
            .cloned())
    }

    async fn list_invitations(&self, home_id: &str) -> Result<Vec<Invitation>> {
        let inner = self.inner.read().await;
        let mut invitations: Vec<Invitation> = inner
            .invitations
            .values()
            .filter(|inv| inv.home_id == home_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(invitations)
    }

    async fn delete_invitation_by_token(&self, token: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.invitation_key_for_token(token) {
            Some(key) => Ok(inner.invitations.remove(&key).is_some()),
            None => Ok(false),
        }
    }

    async fn delete_invitation(&self, home_id: &str, email: &str) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .await
            .invitations
            .remove(&(home_id.to_string(), email.to_string()))
            .is_some())
    }

    async fn refresh_invitation(&self, token: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.invitations.values_mut().find(|inv| inv.token == token) {
            Some(inv) => {
                inv.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn redeem_invitation(&self, token: &str, grant: Grant) -> Result<Option<Grant>> {
        let mut inner = self.inner.write().await;
        let Some(key) = inner.invitation_key_for_token(token) else {
            return Ok(None);
        };
        inner.invitations.remove(&key);
        Ok(Some(inner.put_grant(grant)))
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        let inner = self.inner.read().await;
        Ok(PlatformStats {
            total_users: inner.users.len() as u64,
            total_homes: inner.homes.len() as u64,
            total_tasks: inner.tasks.len() as u64,
            total_items: inner.items.len() as u64,
        })
    }
}
