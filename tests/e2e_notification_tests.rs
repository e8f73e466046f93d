//! End-to-end tests for notification dispatch: single sends, broadcast to
//! all volunteers, listing, and read marking.

mod common;

use common::{data, TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_send_notification_to_volunteer() {
    let server = TestServer::spawn_seeded().await;
    let client = TestClient::new(server.base_url.clone());

    let volunteer_id = server
        .store
        .add_volunteer("ada", "ada@example.com", None, "Ada L");

    let response = client
        .post_json(
            "/api/notifications",
            &json!({"volunteerId": volunteer_id, "message": "You have been matched"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let notification = data(response).await;
    assert_eq!(notification["volunteerId"], volunteer_id);
    assert_eq!(notification["message"], "You have been matched");
    assert_eq!(notification["isRead"], false);
}

#[tokio::test]
async fn test_send_to_unknown_volunteer_is_404() {
    let server = TestServer::spawn_seeded().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .post_json(
            "/api/notifications",
            &json!({"volunteerId": 9999, "message": "hello"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_broadcast_reaches_every_volunteer() {
    let server = TestServer::spawn_seeded().await;
    let client = TestClient::new(server.base_url.clone());

    let v1 = server.store.add_volunteer("ada", "ada@example.com", None, "Ada L");
    let v2 = server.store.add_volunteer("bob", "bob@example.com", None, "Bob M");
    let v3 = server.store.add_volunteer("cyd", "cyd@example.com", None, "Cyd N");

    let response = client
        .post_json(
            "/api/notifications/broadcast",
            &json!({"message": "New event posted"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(data(response).await["recipients"], 3);

    for volunteer_id in [v1, v2, v3] {
        let notifications =
            data(client.get(&format!("/api/notifications/volunteer/{volunteer_id}")).await).await;
        let notifications = notifications.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["message"], "New event posted");
    }
}

#[tokio::test]
async fn test_notifications_listed_newest_first() {
    let server = TestServer::spawn_seeded().await;
    let client = TestClient::new(server.base_url.clone());

    let volunteer_id = server
        .store
        .add_volunteer("ada", "ada@example.com", None, "Ada L");
    server.store.add_notification(volunteer_id, None, "first");
    server.store.add_notification(volunteer_id, None, "second");

    let notifications =
        data(client.get(&format!("/api/notifications/volunteer/{volunteer_id}")).await).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0]["message"], "second");
    assert_eq!(notifications[1]["message"], "first");
}

#[tokio::test]
async fn test_mark_notification_read() {
    let server = TestServer::spawn_seeded().await;
    let client = TestClient::new(server.base_url.clone());

    let volunteer_id = server
        .store
        .add_volunteer("ada", "ada@example.com", None, "Ada L");
    let notification_id = server
        .store
        .add_notification(volunteer_id, None, "You have been matched");

    let response = client
        .put_json(&format!("/api/notifications/{notification_id}/read"), &json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["isRead"], true);

    let response = client.put_json("/api/notifications/9999/read", &json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
