//! Authenticated principal and its resolution from request credentials
//!
//! The principal is passed explicitly into every authorization decision.
//! Credentials are issued elsewhere; this module only reads bearer tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::auth::jwt::{extract_token_from_header, JwtValidator};
use crate::types::{HomegateError, Result};

/// Platform role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Identity making a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves the principal of a request from its `Authorization` header
#[derive(Clone)]
pub struct PrincipalResolver {
    jwt: JwtValidator,
}

impl PrincipalResolver {
    pub fn new(jwt: JwtValidator) -> Self {
        Self { jwt }
    }

    /// Missing, malformed, or expired credentials all mean "unauthenticated".
    pub fn resolve(&self, auth_header: Option<&str>) -> Option<Principal> {
        let token = extract_token_from_header(auth_header)?;
        let result = self.jwt.verify_token(token);

        match result.claims {
            Some(claims) if result.valid => Some(Principal {
                id: claims.sub,
                email: claims.email,
                role: claims.role,
            }),
            _ => {
                debug!(
                    "Rejected bearer token: {}",
                    result.error.as_deref().unwrap_or("unknown")
                );
                None
            }
        }
    }
}

/// Require an authenticated principal
pub fn require_principal(principal: Option<&Principal>) -> Result<&Principal> {
    principal.ok_or_else(|| HomegateError::Unauthorized("Authentication required".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenInput;

    #[test]
    fn test_resolve_valid_token() {
        let jwt = JwtValidator::new_dev();
        let token = jwt
            .generate_token(TokenInput {
                user_id: "user-1".into(),
                email: "bob@x.com".into(),
                role: Role::User,
            })
            .unwrap();

        let resolver = PrincipalResolver::new(jwt);
        let header = format!("Bearer {}", token);
        let principal = resolver.resolve(Some(&header)).unwrap();
        assert_eq!(principal, Principal::new("user-1", "bob@x.com", Role::User));
        assert!(!principal.is_admin());
    }

    #[test]
    fn test_resolve_invalid_or_missing_token() {
        let resolver = PrincipalResolver::new(JwtValidator::new_dev());
        assert!(resolver.resolve(None).is_none());
        assert!(resolver.resolve(Some("Bearer not-a-jwt")).is_none());
    }

    #[test]
    fn test_require_principal() {
        assert!(matches!(
            require_principal(None),
            Err(HomegateError::Unauthorized(_))
        ));
        let p = Principal::new("u", "u@x.com", Role::Admin);
        assert_eq!(require_principal(Some(&p)).unwrap().id, "u");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }
}
