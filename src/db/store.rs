//! Storage contract for the access-control core
//!
//! Every read distinguishes "not found" (`Ok(None)`) from failure (`Err`).
//! Implementations must make [`AccessStore::redeem_invitation`] atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{
    Grant, Home, Invitation, Item, PlatformStats, Result, Room, Surface, Task, User, UserSummary,
    UserUpdate,
};

#[async_trait]
pub trait AccessStore: Send + Sync {
    // Containment hierarchy

    async fn get_home(&self, home_id: &str) -> Result<Option<Home>>;
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>>;
    async fn get_item(&self, item_id: &str) -> Result<Option<Item>>;
    /// Fails with `Integrity` if the task row has zero or several parents
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>>;
    async fn get_paint(&self, paint_id: &str) -> Result<Option<Surface>>;
    async fn get_flooring(&self, flooring_id: &str) -> Result<Option<Surface>>;

    // Users

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    /// All users, newest first, with owned-home and created-task counts
    async fn list_users(&self) -> Result<Vec<UserSummary>>;
    /// Apply an admin change. `None` if the user does not exist.
    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<Option<User>>;

    // Collaborator grants, unique on (home_id, user_id)

    async fn get_grant(&self, home_id: &str, user_id: &str) -> Result<Option<Grant>>;
    async fn list_grants(&self, home_id: &str) -> Result<Vec<Grant>>;
    /// Create or replace the grant for its (home_id, user_id) pair
    async fn upsert_grant(&self, grant: Grant) -> Result<Grant>;
    /// Returns whether a grant was removed
    async fn delete_grant(&self, home_id: &str, user_id: &str) -> Result<bool>;

    // Pending invitations, unique on (home_id, email) and on token

    /// Create or replace the invitation for its (home_id, email) pair.
    /// The replaced invitation's token stops resolving immediately.
    async fn upsert_invitation(&self, invitation: Invitation) -> Result<Invitation>;
    async fn get_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>>;
    async fn get_invitation(&self, home_id: &str, email: &str) -> Result<Option<Invitation>>;
    async fn list_invitations(&self, home_id: &str) -> Result<Vec<Invitation>>;
    /// Returns whether the token was still present
    async fn delete_invitation_by_token(&self, token: &str) -> Result<bool>;
    async fn delete_invitation(&self, home_id: &str, email: &str) -> Result<bool>;
    /// Move the expiry of the invitation identified by `token`
    async fn refresh_invitation(&self, token: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Atomically delete the invitation for `token` and upsert `grant`.
    ///
    /// Returns `None` without writing anything if the token no longer
    /// exists, which is what a losing concurrent redemption observes.
    async fn redeem_invitation(&self, token: &str, grant: Grant) -> Result<Option<Grant>>;

    // Admin aggregates

    async fn platform_stats(&self) -> Result<PlatformStats>;
}
