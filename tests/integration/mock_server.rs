//! Mock HTTP server setup for integration tests

use cp_gate::ClusterContext;
use mockito::{Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TOKEN: &str = "test-token";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Cluster context pointing at the mock server, authenticated with [`TOKEN`].
    pub fn cluster(&self) -> ClusterContext {
        ClusterContext::new()
            .with_server(&self.base_url)
            .with_token(TOKEN)
    }

    /// Address usable as a direct transport target (`host:port`).
    pub fn host_port(&self) -> String {
        self.base_url.trim_start_matches("http://").to_string()
    }

    pub fn url(&self, path: &str) -> url::Url {
        url::Url::parse(&format!("{}{}", self.base_url, path)).unwrap()
    }

    /// Create a mock for a JSON response
    pub async fn mock_json(&self, method: &str, path: &str, status: usize, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock that only matches when the fixture token is presented
    pub async fn mock_authenticated(&self, method: &str, path: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a bare status response
    pub async fn mock_status(&self, method: &str, path: &str, status: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .with_status(status)
            .create_async()
            .await
    }
}
