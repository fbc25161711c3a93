//! Share invitations and collaborator grants
//!
//! ## Lifecycle per (home, email)
//!
//! - **create**: owner or WRITE collaborator; replaces any pending invitation
//!   for the same pair, so the previous token stops resolving
//! - **lookup / redeem**: by token only; an expired invitation is deleted by
//!   whichever read notices it first
//! - **redeem**: the grant is written and the invitation consumed in one
//!   storage transaction
//! - **revoke / remove / resend / direct grant**: owner only
//!
//! Tokens are 32 bytes from the OS RNG, hex encoded.

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{AccessLevel, Principal, ShareRole};
use crate::db::AccessStore;
use crate::logging::audit::{self, AuditEvent};
use crate::services::notifier::{InviteNotice, InviteNotifier};
use crate::services::scope::ScopeResolver;
use crate::types::{
    Grant, Home, HomegateError, Invitation, InvitationDetails, PublicInvitation, Result,
};

/// Default lifetime of an invitation
pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 7 * 24;

/// Grants on a home, plus pending invitations for callers who can invite
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareListing {
    pub shares: Vec<Grant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Vec<PublicInvitation>>,
}

pub struct InvitationService {
    store: Arc<dyn AccessStore>,
    scope: ScopeResolver,
    notifier: Arc<dyn InviteNotifier>,
    ttl: Duration,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn AccessStore>,
        notifier: Arc<dyn InviteNotifier>,
        ttl: Duration,
    ) -> Self {
        Self {
            scope: ScopeResolver::new(Arc::clone(&store)),
            store,
            notifier,
            ttl,
        }
    }

    /// Invite `email` to `home_id` with `role`.
    ///
    /// Returns the owner-facing record; the token only goes to the notifier.
    pub async fn create_invitation(
        &self,
        home_id: &str,
        inviter: &Principal,
        email: &str,
        role: ShareRole,
    ) -> Result<PublicInvitation> {
        let home = self
            .scope
            .authorize_home(Some(inviter), home_id, AccessLevel::Write)
            .await?
            .home;

        let email = normalize_email(email)?;
        if email == inviter.email.trim().to_lowercase() {
            return Err(HomegateError::BadRequest(
                "Cannot share home with yourself".into(),
            ));
        }

        let now = Utc::now();
        let invitation = Invitation {
            id: uuid::Uuid::new_v4().to_string(),
            home_id: home.id.clone(),
            email,
            role,
            token: generate_token(),
            expires_at: now + self.ttl,
            invited_by: inviter.id.clone(),
            created_at: now,
        };
        let stored = self.store.upsert_invitation(invitation).await?;

        audit::record(&AuditEvent::InvitationCreated {
            home_id: &stored.home_id,
            email: &stored.email,
            role: stored.role,
            invited_by: &inviter.id,
        });

        self.notify(&stored, &home, inviter).await;

        Ok(stored.to_public())
    }

    /// Details shown to the invitee before accepting
    pub async fn get_invitation(&self, token: &str) -> Result<InvitationDetails> {
        let (invitation, home) = self.live_invitation(token).await?;
        Ok(InvitationDetails {
            email: invitation.email,
            home_name: home.name,
            role: invitation.role,
        })
    }

    /// Accept an invitation as `principal`, whose email must match the
    /// invited one.
    pub async fn redeem(&self, token: &str, principal: &Principal) -> Result<Grant> {
        let (invitation, home) = self.live_invitation(token).await?;

        if principal.email.trim().to_lowercase() != invitation.email {
            warn!(
                home_id = %invitation.home_id,
                user_id = %principal.id,
                "Invitation redeemed with a different email"
            );
            return Err(HomegateError::EmailMismatch);
        }

        if home.owner_id == principal.id {
            return Err(HomegateError::BadRequest(
                "You already own this home".into(),
            ));
        }

        let grant = Grant {
            home_id: invitation.home_id.clone(),
            user_id: principal.id.clone(),
            role: invitation.role,
            created_at: Utc::now(),
        };

        let Some(grant) = self.store.redeem_invitation(token, grant).await? else {
            debug!("Invitation consumed by a concurrent redemption");
            return Err(HomegateError::InvitationInvalid);
        };

        audit::record(&AuditEvent::InvitationRedeemed {
            home_id: &grant.home_id,
            user_id: &grant.user_id,
            role: grant.role,
        });
        info!(
            "User {} joined home {} with {} access",
            grant.user_id, grant.home_id, grant.role
        );

        Ok(grant)
    }

    /// Withdraw the pending invitation for `email`. Idempotent.
    pub async fn revoke_invitation(
        &self,
        home_id: &str,
        email: &str,
        revoker: &Principal,
    ) -> Result<()> {
        let home = self.scope.owned_home(revoker, home_id).await?;
        let email = email.trim().to_lowercase();

        if self.store.delete_invitation(&home.id, &email).await? {
            audit::record(&AuditEvent::InvitationRevoked {
                home_id: &home.id,
                email: &email,
                revoked_by: &revoker.id,
            });
        }
        Ok(())
    }

    /// Remove a collaborator's grant. Idempotent.
    pub async fn remove_grant(
        &self,
        home_id: &str,
        user_id: &str,
        revoker: &Principal,
    ) -> Result<()> {
        let home = self.scope.owned_home(revoker, home_id).await?;

        if self.store.delete_grant(&home.id, user_id).await? {
            audit::record(&AuditEvent::GrantRemoved {
                home_id: &home.id,
                user_id,
                removed_by: &revoker.id,
            });
        }
        Ok(())
    }

    /// Push the expiry of a pending invitation out by one TTL and send the
    /// same token again.
    pub async fn resend_invitation(
        &self,
        home_id: &str,
        email: &str,
        requester: &Principal,
    ) -> Result<PublicInvitation> {
        let home = self.scope.owned_home(requester, home_id).await?;
        let email = normalize_email(email)?;

        let mut invitation = self
            .store
            .get_invitation(&home.id, &email)
            .await?
            .ok_or_else(|| {
                HomegateError::NotFound("No pending invitation found for this email".into())
            })?;

        let now = Utc::now();
        if invitation.is_expired(now) {
            self.expire(&invitation).await?;
            return Err(HomegateError::InvitationExpired);
        }

        invitation.expires_at = now + self.ttl;
        if !self
            .store
            .refresh_invitation(&invitation.token, invitation.expires_at)
            .await?
        {
            return Err(HomegateError::NotFound(
                "No pending invitation found for this email".into(),
            ));
        }

        audit::record(&AuditEvent::InvitationResent {
            home_id: &home.id,
            email: &email,
        });

        self.notify(&invitation, &home, requester).await;

        Ok(invitation.to_public())
    }

    /// Grant `role` to an existing user directly, replacing any prior role
    pub async fn grant_access(
        &self,
        home_id: &str,
        user_id: &str,
        role: ShareRole,
        granter: &Principal,
    ) -> Result<Grant> {
        let home = self.scope.owned_home(granter, home_id).await?;

        if user_id == granter.id {
            return Err(HomegateError::BadRequest(
                "Cannot share home with yourself".into(),
            ));
        }

        if self.store.get_user(user_id).await?.is_none() {
            return Err(HomegateError::NotFound("User not found".into()));
        }

        let grant = self
            .store
            .upsert_grant(Grant {
                home_id: home.id.clone(),
                user_id: user_id.to_string(),
                role,
                created_at: Utc::now(),
            })
            .await?;

        audit::record(&AuditEvent::GrantCreated {
            home_id: &grant.home_id,
            user_id: &grant.user_id,
            role: grant.role,
            granted_by: &granter.id,
        });

        Ok(grant)
    }

    /// Collaborators of a home. Pending invitations are only listed for
    /// principals with WRITE access, and never include tokens.
    pub async fn list_shares(&self, home_id: &str, principal: &Principal) -> Result<ShareListing> {
        let authorized = self
            .scope
            .authorize_home(Some(principal), home_id, AccessLevel::Read)
            .await?;

        let shares = self.store.list_grants(&authorized.home.id).await?;

        let pending = if authorized.access == AccessLevel::Write {
            let now = Utc::now();
            let mut live = Vec::new();
            for invitation in self.store.list_invitations(&authorized.home.id).await? {
                if invitation.is_expired(now) {
                    self.expire(&invitation).await?;
                } else {
                    live.push(invitation.to_public());
                }
            }
            Some(live)
        } else {
            None
        };

        Ok(ShareListing { shares, pending })
    }

    /// Invitation for `token` that is still valid, with its home.
    ///
    /// Deletes the invitation if it has lapsed or its home is gone.
    async fn live_invitation(&self, token: &str) -> Result<(Invitation, Home)> {
        let invitation = self
            .store
            .get_invitation_by_token(token)
            .await?
            .ok_or(HomegateError::InvitationInvalid)?;

        if invitation.is_expired(Utc::now()) {
            self.expire(&invitation).await?;
            return Err(HomegateError::InvitationExpired);
        }

        match self.store.get_home(&invitation.home_id).await? {
            Some(home) => Ok((invitation, home)),
            None => {
                warn!(
                    "Dropping invitation for missing home {}",
                    invitation.home_id
                );
                self.store.delete_invitation_by_token(token).await?;
                Err(HomegateError::InvitationInvalid)
            }
        }
    }

    async fn expire(&self, invitation: &Invitation) -> Result<()> {
        if self
            .store
            .delete_invitation_by_token(&invitation.token)
            .await?
        {
            audit::record(&AuditEvent::InvitationExpired {
                home_id: &invitation.home_id,
                email: &invitation.email,
            });
        }
        Ok(())
    }

    /// Hand the invitation to the notifier. Delivery failure is logged and
    /// leaves the invitation in place.
    async fn notify(&self, invitation: &Invitation, home: &Home, inviter: &Principal) {
        let invited_by = match self.store.get_user(&inviter.id).await {
            Ok(Some(user)) => user.name.unwrap_or(user.email),
            _ => inviter.email.clone(),
        };

        let notice = InviteNotice {
            email: invitation.email.clone(),
            home_name: home.name.clone(),
            token: invitation.token.clone(),
            expires_at: invitation.expires_at,
            invited_by,
        };

        if let Err(e) = self.notifier.send_invite(&notice).await {
            warn!(
                home_id = %invitation.home_id,
                email = %invitation.email,
                "Failed to deliver invitation: {}",
                e
            );
        }
    }
}

/// Trim and lowercase an email address, rejecting obviously invalid ones
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let invalid = || HomegateError::BadRequest(format!("Invalid email address: {}", raw.trim()));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(email)
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
