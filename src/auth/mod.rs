//! Authentication and authorization for homegate
//!
//! Provides:
//! - JWT verification and principal resolution
//! - Home-scoped permission evaluation (owner / collaborator grants)
//! - The admin gate for platform-wide operations

pub mod admin;
pub mod jwt;
pub mod permissions;
pub mod principal;

pub use admin::require_admin;
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use permissions::{
    effective_permission, effective_permission_in, has_read_access, has_write_access,
    AccessLevel, ShareRole,
};
pub use principal::{require_principal, Principal, PrincipalResolver, Role};
