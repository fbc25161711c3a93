//! HTTP server for homegate

mod http;

pub use http::{dispatch, run, AppState};
