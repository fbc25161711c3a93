//! Homegate - home sharing and access control
//!
//! Homegate decides who may see or change a home and everything inside it.
//! Owners invite collaborators by email with a READ or WRITE role, invitees
//! redeem single-use tokens, and every rooms/items/tasks/paints/floorings
//! lookup is resolved back to its owning home before access is granted.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HomegateError, Result};
