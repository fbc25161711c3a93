//! Shared types for homegate

pub mod error;
pub mod records;

pub use error::{HomegateError, Result};
pub use records::{
    Grant, Home, Invitation, InvitationDetails, Item, ParentScope, PlatformStats,
    PublicInvitation, ResourceKind, ResourceRef, Room, Surface, Task, TaskScope, User, UserSummary,
    UserUpdate,
};
