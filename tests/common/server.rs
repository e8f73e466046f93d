use std::sync::Arc;
use tokio::net::TcpListener;

use volunteerhub_server::store::MemoryStore;
use volunteerhub_server::{create_routes, AppState};

/// A test server on a random port. The store is shared so tests can seed
/// reference data and inspect state directly.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone());
        let app = create_routes(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
        }
    }

    /// Spawns a server pre-seeded with the standard location and skill
    /// catalog most tests need.
    pub async fn spawn_seeded() -> Self {
        let server = Self::spawn().await;
        server.store.add_location("Community Center", "123 Main St");
        server.store.add_location("Riverside Park", "9 River Rd");
        server.store.add_skill("organizing", Some("Coordinating teams"));
        server.store.add_skill("cooking", None);
        server.store.add_skill("first aid", None);
        server
    }
}
