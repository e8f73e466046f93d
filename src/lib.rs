use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

pub use routes::create_routes;

/// Shared application state handed to every route handler.
///
/// The store is a trait object so the production MySQL-backed store and the
/// in-memory test store are interchangeable behind the same seam.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn store::Store>) -> Self {
        Self { store }
    }
}
