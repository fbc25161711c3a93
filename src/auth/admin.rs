//! Admin gate for platform-wide operations
//!
//! Decided on the principal's role alone. Passing this gate grants nothing
//! on individual homes; per-home endpoints never consult it.

use tracing::warn;

use crate::auth::Principal;
use crate::logging::audit::{self, AuditEvent};
use crate::types::{HomegateError, Result};

/// Allow only ADMIN principals through
pub fn require_admin(principal: Option<&Principal>) -> Result<&Principal> {
    let Some(principal) = principal else {
        warn!("Unauthenticated access attempt to admin route");
        return Err(HomegateError::Unauthorized("Authentication required".into()));
    };

    if !principal.is_admin() {
        audit::record(&AuditEvent::AdminDenied {
            user_id: &principal.id,
            role: principal.role,
        });
        return Err(HomegateError::Forbidden("Admin permission required".into()));
    }

    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn test_no_principal_is_unauthorized() {
        assert!(matches!(
            require_admin(None),
            Err(HomegateError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_user_is_forbidden() {
        let user = Principal::new("u1", "u1@x.com", Role::User);
        assert!(matches!(
            require_admin(Some(&user)),
            Err(HomegateError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_is_allowed() {
        let admin = Principal::new("a1", "a1@x.com", Role::Admin);
        assert_eq!(require_admin(Some(&admin)).unwrap().id, "a1");
    }
}
