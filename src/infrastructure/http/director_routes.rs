//! Director control, proposal, event and chunk routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::director_error;
use crate::application::dto::{
    ChunkStatusDto, DirectorStatusDto, GenerateContentRequest, TriggerEventRequest,
};
use crate::application::services::TriggerOutcome;
use crate::domain::entities::{ActiveEvent, ContentKind, Originator, Proposal, ProposalPayload};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{
    ChunkCoord, EventId, EventSpawnConfig, GuardrailConfig, PersonalityConfig, ProposalId,
};
use crate::infrastructure::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Body of a `202 Accepted` response; the result arrives over the WebSocket
#[derive(Debug, Serialize)]
pub struct Accepted {
    pub kind: ContentKind,
    pub status: &'static str,
}

impl Accepted {
    fn generation(kind: ContentKind) -> (StatusCode, Json<Self>) {
        (
            StatusCode::ACCEPTED,
            Json(Self {
                kind,
                status: "generating",
            }),
        )
    }
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DirectorStatusDto> {
    Json(state.director.status().await)
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Json<DirectorStatusDto> {
    state.director.pause();
    Json(state.director.status().await)
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Json<DirectorStatusDto> {
    state.director.resume();
    Json(state.director.status().await)
}

pub async fn get_personality(State(state): State<Arc<AppState>>) -> Json<PersonalityConfig> {
    Json(state.director.personality().await)
}

pub async fn update_personality(
    State(state): State<Arc<AppState>>,
    Json(config): Json<PersonalityConfig>,
) -> Json<PersonalityConfig> {
    Json(state.director.update_personality(config).await)
}

pub async fn get_event_config(State(state): State<Arc<AppState>>) -> Json<EventSpawnConfig> {
    Json(state.director.event_config().await)
}

pub async fn update_event_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<EventSpawnConfig>,
) -> ApiResult<EventSpawnConfig> {
    state
        .director
        .update_event_config(config)
        .await
        .map(Json)
        .map_err(director_error)
}

/// Secrets are always masked on the way out
pub async fn get_guardrails(State(state): State<Arc<AppState>>) -> Json<GuardrailConfig> {
    Json(state.director.masked_guardrails().await)
}

pub async fn update_guardrails(
    State(state): State<Arc<AppState>>,
    Json(config): Json<GuardrailConfig>,
) -> ApiResult<GuardrailConfig> {
    state
        .director
        .update_guardrails(config)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn list_proposals(State(state): State<Arc<AppState>>) -> Json<Vec<Proposal>> {
    Json(state.director.pending_proposals().await)
}

pub async fn approve_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProposalId>,
) -> ApiResult<Proposal> {
    state
        .director
        .approve_proposal(id)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn reject_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProposalId>,
) -> StatusCode {
    if state.director.reject_proposal(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    body: Option<Json<GenerateContentRequest>>,
) -> Result<(StatusCode, Json<Accepted>), (StatusCode, String)> {
    let kind: ContentKind = kind
        .parse()
        .map_err(|e: anyhow::Error| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if kind == ContentKind::Event {
        return Err((
            StatusCode::BAD_REQUEST,
            "Events are started through /api/director/events".to_string(),
        ));
    }
    state.director.ensure_enabled(kind).await.map_err(director_error)?;

    let context = body.map(|Json(request)| request.context).unwrap_or_default();
    state.director.spawn_generation(kind, context);
    Ok(Accepted::generation(kind))
}

pub async fn submit_payload(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProposalPayload>,
) -> ApiResult<Proposal> {
    state
        .director
        .submit_payload(payload, Originator::Manual)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<ActiveEvent>> {
    Json(state.director.active_events().await)
}

pub async fn trigger_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TriggerEventRequest>,
) -> ApiResult<TriggerOutcome> {
    state
        .director
        .trigger_world_event_by(
            request.originator.unwrap_or_default(),
            request.event_type,
            request.force,
            request.duration_secs,
            None,
        )
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn stop_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EventId>,
) -> StatusCode {
    if state.director.stop_event(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn chunk_frontier(State(state): State<Arc<AppState>>) -> Json<Vec<ChunkCoord>> {
    Json(state.director.chunk_frontier().await)
}

pub async fn get_chunk(
    State(state): State<Arc<AppState>>,
    Path((cx, cy)): Path<(i64, i64)>,
) -> ApiResult<ChunkStatusDto> {
    state
        .director
        .chunk_status(cx, cy)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn generate_chunk(
    State(state): State<Arc<AppState>>,
    Path((cx, cy)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<Accepted>), (StatusCode, String)> {
    state
        .director
        .ensure_enabled(ContentKind::Location)
        .await
        .map_err(director_error)?;
    let context = state
        .director
        .chunk_context(cx, cy)
        .await
        .map_err(director_error)?;
    state.director.spawn_generation(ContentKind::Location, context);
    Ok(Accepted::generation(ContentKind::Location))
}

/// Movement or combat reported by the world model
pub async fn report_activity(
    State(state): State<Arc<AppState>>,
    Json(event): Json<DomainEvent>,
) -> StatusCode {
    state.director.record_activity(event);
    StatusCode::ACCEPTED
}

#[derive(Debug, Serialize)]
pub struct ChunkDeleted {
    pub cx: i64,
    pub cy: i64,
    pub removed_records: usize,
}

pub async fn delete_chunk(
    State(state): State<Arc<AppState>>,
    Path((cx, cy)): Path<(i64, i64)>,
) -> ApiResult<ChunkDeleted> {
    let removed_records = state
        .director
        .delete_chunk(cx, cy)
        .await
        .map_err(director_error)?;
    Ok(Json(ChunkDeleted {
        cx,
        cy,
        removed_records,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{send, test_app};
    use crate::application::services::StaticContent;
    use crate::domain::value_objects::GuardrailConfig;
    use axum::http::StatusCode;
    use serde_json::json;

    fn guardrails(require_approval: bool) -> GuardrailConfig {
        let mut config = GuardrailConfig::default();
        config.features.require_approval = require_approval;
        config.features.auto_snapshot_on_risk = false;
        config
    }

    #[tokio::test]
    async fn test_pause_and_resume_report_status() {
        let (app, _) = test_app(guardrails(true), StaticContent::default()).await;

        let (status, body) = send(&app, "POST", "/api/director/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paused"], true);

        let (_, body) = send(&app, "POST", "/api/director/resume", None).await;
        assert_eq!(body["paused"], false);
    }

    #[tokio::test]
    async fn test_event_queued_then_approved() {
        let (app, state) = test_app(guardrails(true), StaticContent::default()).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/director/events",
            Some(json!({"event_type": "boss"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "queued");
        let id = body["proposal"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "POST", &format!("/api/director/proposals/{}/approve", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.director.active_events().await.len(), 1);

        let (status, _) = send(&app, "POST", &format!("/api/director/proposals/{}/approve", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disabled_kind_is_forbidden() {
        let mut config = guardrails(true);
        config.features.enable_quests = false;
        let (app, _) = test_app(config, StaticContent::default()).await;

        let (status, _) = send(&app, "POST", "/api/director/generate/quest", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "POST", "/api/director/generate/dragon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generation_is_accepted() {
        let (app, _) = test_app(guardrails(true), StaticContent::default()).await;
        let (status, body) = send(&app, "POST", "/api/director/generate/item", Some(json!({}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["kind"], "item");
    }

    #[tokio::test]
    async fn test_guardrails_are_masked() {
        let mut config = guardrails(true);
        config.routing.insert(
            "default".to_string(),
            crate::domain::value_objects::RoutingProfile {
                base_url: Some("http://localhost:8080/v1".to_string()),
                model: "writer".to_string(),
                api_key: Some("sk-live-0123456789".to_string()),
                temperature: None,
            },
        );
        let (app, _) = test_app(config, StaticContent::default()).await;

        let (status, body) = send(&app, "GET", "/api/director/guardrails", None).await;
        assert_eq!(status, StatusCode::OK);
        let key = body["routing"]["default"]["api_key"].as_str().unwrap();
        assert!(key.contains("****"));
        assert!(!key.contains("0123456789"));
    }

    #[tokio::test]
    async fn test_unknown_event_stop_is_not_found() {
        let (app, _) = test_app(guardrails(false), StaticContent::default()).await;
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/director/events/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_out_of_range_event_config_is_refused() {
        let (app, _) = test_app(guardrails(false), StaticContent::default()).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/director/events/config",
            Some(json!({"spawn_radius": 1e308, "invasion_size": 200000})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().contains("spawn_radius"));

        let (_, body) = send(&app, "GET", "/api/director/events/config", None).await;
        assert_eq!(body["spawn_radius"], 8.0);
        assert_eq!(body["invasion_size"], 4);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/director/events/config",
            Some(json!({"invasion_size": 6})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invasion_size"], 6);
    }

    #[tokio::test]
    async fn test_activity_reaches_tracker() {
        let (app, state) = test_app(guardrails(false), StaticContent::default()).await;
        let activity = state.director.activity();
        let events = state.director.subscribe_domain_events();
        let subscriber = tokio::spawn(activity.clone().run_subscriber(events));

        let (status, _) = send(
            &app,
            "POST",
            "/api/director/activity",
            Some(json!({
                "type": "actor_moved",
                "entity_id": uuid::Uuid::new_v4(),
                "position": {"x": 10.0, "y": 12.0}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let bucket = crate::application::services::activity_tracker::bucket_for(
            crate::domain::value_objects::Position::new(10.0, 12.0),
        );
        let mut weight = 0.0;
        for _ in 0..50 {
            weight = activity.weight(bucket).await;
            if weight > 0.0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        subscriber.abort();
        assert!(weight > 0.0);
    }

    #[tokio::test]
    async fn test_chunk_status_and_delete() {
        let (app, _) = test_app(guardrails(false), StaticContent::default()).await;

        let (status, body) = send(&app, "GET", "/api/director/chunks/1/-2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated"], false);

        let (status, body) = send(&app, "DELETE", "/api/director/chunks/1/-2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed_records"], 0);
    }
}
