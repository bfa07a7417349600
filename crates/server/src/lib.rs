pub mod routes;
pub mod webhook;

pub use crate::routes::{build_router, AppState};
