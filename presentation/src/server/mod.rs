//! HTTP command surface and event stream

pub mod routes;

pub use routes::{AppState, app_router};
