use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{events, health_check, matching, notifications};
use crate::AppState;

pub fn create_routes(state: AppState) -> Router {
    let event_routes = Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/locations", get(events::list_locations))
        .route("/skills", get(events::list_skills))
        .route("/search/skills", get(events::search_by_skills))
        .route(
            "/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        );

    let matching_routes = Router::new()
        .route("/", post(matching::create_match))
        .route("/volunteers", get(matching::search_volunteers))
        .route("/volunteers/:id/history", get(matching::volunteer_history))
        .route("/events", get(matching::list_match_events))
        .route("/:id", delete(matching::delete_match));

    let notification_routes = Router::new()
        .route("/", post(notifications::send_notification))
        .route("/broadcast", post(notifications::broadcast_notification))
        .route(
            "/volunteer/:id",
            get(notifications::volunteer_notifications),
        )
        .route("/:id/read", put(notifications::mark_notification_read));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/events", event_routes)
        .nest("/api/matching", matching_routes)
        .nest("/api/notifications", notification_routes)
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
