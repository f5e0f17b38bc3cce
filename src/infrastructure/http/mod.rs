//! HTTP REST API routes for the control panel

mod content_routes;
mod director_routes;
mod snapshot_routes;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::application::ports::outbound::SnapshotError;
use crate::application::services::publisher::PublishError;
use crate::application::services::DirectorError;
use crate::infrastructure::state::AppState;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Director control
        .route("/api/director/status", get(director_routes::get_status))
        .route("/api/director/pause", post(director_routes::pause))
        .route("/api/director/resume", post(director_routes::resume))
        .route("/api/director/personality", get(director_routes::get_personality))
        .route("/api/director/personality", put(director_routes::update_personality))
        .route("/api/director/events/config", get(director_routes::get_event_config))
        .route("/api/director/events/config", put(director_routes::update_event_config))
        .route("/api/director/guardrails", get(director_routes::get_guardrails))
        .route("/api/director/guardrails", put(director_routes::update_guardrails))
        // Proposals and generation
        .route("/api/director/proposals", get(director_routes::list_proposals))
        .route(
            "/api/director/proposals/{id}/approve",
            post(director_routes::approve_proposal),
        )
        .route(
            "/api/director/proposals/{id}/reject",
            post(director_routes::reject_proposal),
        )
        .route("/api/director/generate/{kind}", post(director_routes::generate))
        .route("/api/director/submit", post(director_routes::submit_payload))
        .route("/api/director/activity", post(director_routes::report_activity))
        // World events
        .route("/api/director/events", get(director_routes::list_events))
        .route("/api/director/events", post(director_routes::trigger_event))
        .route("/api/director/events/{id}", delete(director_routes::stop_event))
        // Chunks
        .route("/api/director/chunks/frontier", get(director_routes::chunk_frontier))
        .route("/api/director/chunks/{cx}/{cy}", get(director_routes::get_chunk))
        .route("/api/director/chunks/{cx}/{cy}", delete(director_routes::delete_chunk))
        .route(
            "/api/director/chunks/{cx}/{cy}/generate",
            post(director_routes::generate_chunk),
        )
        // Registries
        .route("/api/director/characters", get(content_routes::list_characters))
        .route("/api/director/characters/{id}", get(content_routes::get_character))
        .route("/api/director/characters/{id}", put(content_routes::update_character))
        .route("/api/director/characters/{id}", delete(content_routes::delete_character))
        .route("/api/director/items", get(content_routes::list_items))
        .route("/api/director/items/{id}", get(content_routes::get_item))
        .route("/api/director/items/{id}", put(content_routes::update_item))
        .route("/api/director/items/{id}", delete(content_routes::delete_item))
        .route("/api/director/locations", get(content_routes::list_locations))
        // Snapshots
        .route("/api/director/snapshots", get(snapshot_routes::list_snapshots))
        .route("/api/director/snapshots", post(snapshot_routes::create_snapshot))
        .route(
            "/api/director/snapshots/{id}/restore",
            post(snapshot_routes::restore_snapshot),
        )
        .route("/api/director/snapshots/{id}", delete(snapshot_routes::delete_snapshot))
}

/// Map a director failure onto the status code the control panel expects
pub(crate) fn director_error(e: DirectorError) -> (StatusCode, String) {
    let status = match &e {
        DirectorError::ProposalNotFound(_) | DirectorError::Snapshot(SnapshotError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        DirectorError::FeatureDisabled(_) | DirectorError::EventDisabled(_) => StatusCode::FORBIDDEN,
        DirectorError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
        DirectorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DirectorError::Validation(_)
        | DirectorError::Proposal(_)
        | DirectorError::Publish(PublishError::WorkflowState { .. }) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Director request failed: {}", e);
    }
    (status, e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::services::guardrail_service::tests::MemoryGuardrailRepository;
    use crate::application::services::{Director, DirectorDeps, GuardrailService, StaticContent};
    use crate::domain::value_objects::{GuardrailConfig, ProposalId};
    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::persistence::{InMemoryContentStore, InMemorySnapshotRepository};
    use crate::infrastructure::world::InMemoryWorld;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    /// Router over in-memory adapters with the given guardrails
    pub(crate) async fn test_app(guardrails: GuardrailConfig, static_content: StaticContent) -> (Router, Arc<AppState>) {
        let repository = Arc::new(MemoryGuardrailRepository::default());
        repository.external_edit(guardrails);
        let guardrails = Arc::new(GuardrailService::load(repository).await);

        let director = Arc::new(Director::new(DirectorDeps {
            world: Arc::new(InMemoryWorld::new()),
            store: Arc::new(InMemoryContentStore::default()),
            snapshots: Arc::new(InMemorySnapshotRepository::default()),
            guardrails,
            backend: None,
            static_content,
            seed: Some(5),
        }));
        director.initialize().await.unwrap();

        let state = Arc::new(AppState {
            config: AppConfig::default(),
            director,
        });
        (create_routes().with_state(state.clone()), state)
    }

    pub(crate) async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DirectorError::ProposalNotFound(ProposalId::new()), StatusCode::NOT_FOUND),
            (
                DirectorError::FeatureDisabled(crate::domain::entities::ContentKind::Quest),
                StatusCode::FORBIDDEN,
            ),
            (DirectorError::Throttled("busy".into()), StatusCode::TOO_MANY_REQUESTS),
            (DirectorError::Validation(vec!["too strong".into()]), StatusCode::CONFLICT),
            (DirectorError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                DirectorError::Snapshot(SnapshotError::Database("locked".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(director_error(error).0, expected);
        }
    }
}
