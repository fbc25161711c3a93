//! MongoDB-backed access store
//!
//! Redemption runs as a multi-document transaction, which needs a replica
//! set (a single-node replica set is enough for development).

use async_trait::async_trait;
use bson::{doc, DateTime};
use chrono::Utc;
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;
use mongodb::options::ReturnDocument;
use mongodb::ClientSession;
use tracing::{debug, warn};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    HomeDoc, HomeShareDoc, ItemDoc, PendingHomeShareDoc, RoomDoc, SurfaceDoc, TaskDoc, UserDoc,
    FLOORING_COLLECTION, HOME_COLLECTION, HOME_SHARE_COLLECTION, ITEM_COLLECTION,
    PAINT_COLLECTION, PENDING_HOME_SHARE_COLLECTION, ROOM_COLLECTION, TASK_COLLECTION,
    USER_COLLECTION,
};
use crate::db::store::AccessStore;
use crate::types::{
    Grant, Home, HomegateError, Invitation, Item, PlatformStats, ResourceKind, Result, Room,
    Surface, Task, User, UserSummary, UserUpdate,
};

pub struct MongoAccessStore {
    client: MongoClient,
    homes: MongoCollection<HomeDoc>,
    rooms: MongoCollection<RoomDoc>,
    items: MongoCollection<ItemDoc>,
    tasks: MongoCollection<TaskDoc>,
    paints: MongoCollection<SurfaceDoc>,
    floorings: MongoCollection<SurfaceDoc>,
    users: MongoCollection<UserDoc>,
    shares: MongoCollection<HomeShareDoc>,
    pending: MongoCollection<PendingHomeShareDoc>,
}

impl MongoAccessStore {
    /// Open all collections, creating their indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        Ok(Self {
            homes: client.collection(HOME_COLLECTION).await?,
            rooms: client.collection(ROOM_COLLECTION).await?,
            items: client.collection(ITEM_COLLECTION).await?,
            tasks: client.collection(TASK_COLLECTION).await?,
            paints: client.collection(PAINT_COLLECTION).await?,
            floorings: client.collection(FLOORING_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
            shares: client.collection(HOME_SHARE_COLLECTION).await?,
            pending: client.collection(PENDING_HOME_SHARE_COLLECTION).await?,
            client,
        })
    }

    /// The transaction failed. If it lost a write conflict against another
    /// redemption the token is gone now, which is an ordinary "invalid".
    async fn classify_redeem_failure(
        &self,
        token: &str,
        err: mongodb::error::Error,
    ) -> Result<Option<Grant>> {
        if err.contains_label(TRANSIENT_TRANSACTION_ERROR)
            && self.get_invitation_by_token(token).await?.is_none()
        {
            debug!("Redemption lost a write conflict; token already consumed");
            return Ok(None);
        }
        Err(err.into())
    }

    async fn redeem_in(
        &self,
        session: &mut ClientSession,
        token: &str,
        grant: &Grant,
    ) -> std::result::Result<Option<Grant>, mongodb::error::Error> {
        let consumed = self
            .pending
            .inner()
            .find_one_and_delete(doc! { "token": token })
            .session(&mut *session)
            .await?;

        if consumed.is_none() {
            return Ok(None);
        }

        let stored = self
            .shares
            .inner()
            .find_one_and_update(
                HomeShareDoc::key(&grant.home_id, &grant.user_id),
                HomeShareDoc::upsert_update(grant),
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?;

        Ok(stored.map(Grant::from))
    }
}

#[async_trait]
impl AccessStore for MongoAccessStore {
    async fn get_home(&self, home_id: &str) -> Result<Option<Home>> {
        Ok(self
            .homes
            .find_one(doc! { "_id": home_id })
            .await?
            .map(Home::from))
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        Ok(self
            .rooms
            .find_one(doc! { "_id": room_id })
            .await?
            .map(Room::from))
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(self
            .items
            .find_one(doc! { "_id": item_id })
            .await?
            .map(Item::from))
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.tasks
            .find_one(doc! { "_id": task_id })
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn get_paint(&self, paint_id: &str) -> Result<Option<Surface>> {
        self.paints
            .find_one(doc! { "_id": paint_id })
            .await?
            .map(|d| d.into_surface(ResourceKind::Paint))
            .transpose()
    }

    async fn get_flooring(&self, flooring_id: &str) -> Result<Option<Surface>> {
        self.floorings
            .find_one(doc! { "_id": flooring_id })
            .await?
            .map(|d| d.into_surface(ResourceKind::Flooring))
            .transpose()
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "_id": user_id })
            .await?
            .map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let (users, owned_homes, created_tasks) = tokio::try_join!(
            self.users
                .find_sorted(doc! {}, doc! { "metadata.created_at": -1 }),
            self.homes.count_by("owner_id"),
            self.tasks.count_by("creator_id"),
        )?;

        Ok(users
            .into_iter()
            .map(|doc| {
                let user = User::from(doc);
                let owned = owned_homes.get(&user.id).copied().unwrap_or(0);
                let created = created_tasks.get(&user.id).copied().unwrap_or(0);
                UserSummary::new(user, owned, created)
            })
            .collect())
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<Option<User>> {
        let updated = self
            .users
            .inner()
            .find_one_and_update(
                doc! { "_id": user_id, "metadata.is_deleted": { "$ne": true } },
                UserDoc::update_document(update),
            )
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated.map(User::from))
    }

    async fn get_grant(&self, home_id: &str, user_id: &str) -> Result<Option<Grant>> {
        Ok(self
            .shares
            .find_one(HomeShareDoc::key(home_id, user_id))
            .await?
            .map(Grant::from))
    }

    async fn list_grants(&self, home_id: &str) -> Result<Vec<Grant>> {
        let mut grants: Vec<Grant> = self
            .shares
            .find_many(doc! { "home_id": home_id })
            .await?
            .into_iter()
            .map(Grant::from)
            .collect();
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(grants)
    }

    async fn upsert_grant(&self, grant: Grant) -> Result<Grant> {
        let stored = self
            .shares
            .inner()
            .find_one_and_update(
                HomeShareDoc::key(&grant.home_id, &grant.user_id),
                HomeShareDoc::upsert_update(&grant),
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        stored
            .map(Grant::from)
            .ok_or_else(|| HomegateError::Database("Grant upsert returned no document".into()))
    }

    async fn delete_grant(&self, home_id: &str, user_id: &str) -> Result<bool> {
        self.shares
            .delete_one(HomeShareDoc::key(home_id, user_id))
            .await
    }

    async fn upsert_invitation(&self, invitation: Invitation) -> Result<Invitation> {
        let replacement = PendingHomeShareDoc::from_invitation(&invitation);
        let stored = self
            .pending
            .inner()
            .find_one_and_replace(
                PendingHomeShareDoc::key(&invitation.home_id, &invitation.email),
                replacement,
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        stored
            .map(PendingHomeShareDoc::into_invitation)
            .ok_or_else(|| HomegateError::Database("Invitation upsert returned no document".into()))
    }

    async fn get_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>> {
        Ok(self
            .pending
            .find_one(doc! { "token": token })
            .await?
            .map(PendingHomeShareDoc::into_invitation))
    }

    async fn get_invitation(&self, home_id: &str, email: &str) -> Result<Option<Invitation>> {
        Ok(self
            .pending
            .find_one(PendingHomeShareDoc::key(home_id, email))
            .await?
            .map(PendingHomeShareDoc::into_invitation))
    }

    async fn list_invitations(&self, home_id: &str) -> Result<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .pending
            .find_many(doc! { "home_id": home_id })
            .await?
            .into_iter()
            .map(PendingHomeShareDoc::into_invitation)
            .collect();
        invitations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(invitations)
    }

    async fn delete_invitation_by_token(&self, token: &str) -> Result<bool> {
        self.pending.delete_one(doc! { "token": token }).await
    }

    async fn delete_invitation(&self, home_id: &str, email: &str) -> Result<bool> {
        self.pending
            .delete_one(PendingHomeShareDoc::key(home_id, email))
            .await
    }

    async fn refresh_invitation(
        &self,
        token: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<bool> {
        let result = self
            .pending
            .update_one(
                doc! { "token": token },
                doc! {
                    "$set": {
                        "expires_at": DateTime::from_chrono(expires_at),
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn redeem_invitation(&self, token: &str, grant: Grant) -> Result<Option<Grant>> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.redeem_in(&mut session, token, &grant).await {
            Ok(None) => {
                session.abort_transaction().await?;
                Ok(None)
            }
            Ok(Some(stored)) => match session.commit_transaction().await {
                Ok(()) => Ok(Some(stored)),
                Err(e) => self.classify_redeem_failure(token, e).await,
            },
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort redemption transaction: {}", abort_err);
                }
                self.classify_redeem_failure(token, e).await
            }
        }
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        let (total_users, total_homes, total_tasks, total_items) = tokio::try_join!(
            self.users.count(doc! {}),
            self.homes.count(doc! {}),
            self.tasks.count(doc! {}),
            self.items.count(doc! {}),
        )?;

        Ok(PlatformStats {
            total_users,
            total_homes,
            total_tasks,
            total_items,
        })
    }
}
