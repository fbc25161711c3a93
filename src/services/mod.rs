//! Services layer for homegate
//!
//! ## Services
//!
//! - **Scope**: resolves nested resources to their owning home and
//!   authorizes principals against it
//! - **Invitations**: share invitation lifecycle and collaborator grants
//! - **Notifier**: delivery of invitation tokens to invitees

pub mod invitations;
pub mod notifier;
pub mod scope;

pub use invitations::{
    normalize_email, InvitationService, ShareListing, DEFAULT_INVITATION_TTL_HOURS,
};
pub use notifier::{InviteNotice, InviteNotifier, LogNotifier, RecordingNotifier};
pub use scope::{Authorized, ScopeResolver};
