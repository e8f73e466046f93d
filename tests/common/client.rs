use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Any well-formed bearer token is accepted by the auth stub.
pub const TEST_TOKEN: &str = "test-token";

/// HTTP client for the volunteer API. Write requests carry a bearer token;
/// read requests go out unauthenticated, matching the route guards.
pub struct TestClient {
    client: reqwest::Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(TEST_TOKEN)
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST without an authorization header, for exercising the 401 path.
    pub async fn post_json_unauthenticated(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(TEST_TOKEN)
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(TEST_TOKEN)
            .send()
            .await
            .expect("DELETE request failed")
    }

    pub async fn create_event(&self, body: &Value) -> Response {
        self.post_json("/api/events", body).await
    }

    pub async fn update_event(&self, id: i64, body: &Value) -> Response {
        self.put_json(&format!("/api/events/{id}"), body).await
    }

    pub async fn delete_event(&self, id: i64) -> Response {
        self.delete(&format!("/api/events/{id}")).await
    }

    pub async fn list_events(&self) -> Response {
        self.get("/api/events").await
    }
}

/// Unwraps the `data` field of the standard success envelope.
pub async fn data(response: Response) -> Value {
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(body["success"], true, "Expected a success envelope: {body}");
    body["data"].clone()
}
