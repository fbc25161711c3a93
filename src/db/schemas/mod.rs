//! Database schemas for homegate
//!
//! MongoDB document structures for the home hierarchy, users, grants, and
//! pending invitations.

mod home_share;
mod metadata;
mod pending_home_share;
mod resource;
mod user;

pub use home_share::{HomeShareDoc, HOME_SHARE_COLLECTION};
pub use metadata::Metadata;
pub use pending_home_share::{PendingHomeShareDoc, PENDING_HOME_SHARE_COLLECTION};
pub use resource::{
    HomeDoc, ItemDoc, RoomDoc, SurfaceDoc, TaskDoc, FLOORING_COLLECTION, HOME_COLLECTION,
    ITEM_COLLECTION, PAINT_COLLECTION, ROOM_COLLECTION, TASK_COLLECTION,
};
pub use user::{UserDoc, USER_COLLECTION};
