//! Registry routes: characters, items and locations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::director_error;
use crate::application::ports::outbound::RecordLocation;
use crate::domain::entities::{CharacterDefinition, ItemDefinition, LocationDefinition};
use crate::infrastructure::state::AppState;

fn mismatched_id(path: &str, body: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("Path id {} does not match body id {}", path, body),
    )
}

fn deleted(removed: bool) -> StatusCode {
    if removed {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn list_characters(State(state): State<Arc<AppState>>) -> Json<Vec<CharacterDefinition>> {
    Json(state.director.characters().await)
}

/// Look up by id, name or alias
pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CharacterDefinition>, StatusCode> {
    state
        .director
        .character(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(definition): Json<CharacterDefinition>,
) -> Result<Json<RecordLocation>, (StatusCode, String)> {
    if definition.id != id {
        return Err(mismatched_id(&id, &definition.id));
    }
    state
        .director
        .update_character(definition)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .director
        .delete_character(&id)
        .await
        .map(deleted)
        .map_err(director_error)
}

pub async fn list_items(State(state): State<Arc<AppState>>) -> Json<Vec<ItemDefinition>> {
    Json(state.director.items().await)
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemDefinition>, StatusCode> {
    state
        .director
        .item(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(definition): Json<ItemDefinition>,
) -> Result<Json<RecordLocation>, (StatusCode, String)> {
    if definition.id != id {
        return Err(mismatched_id(&id, &definition.id));
    }
    state
        .director
        .update_item(definition)
        .await
        .map(Json)
        .map_err(director_error)
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .director
        .delete_item(&id)
        .await
        .map(deleted)
        .map_err(director_error)
}

pub async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<LocationDefinition>> {
    Json(state.director.locations().await)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{send, test_app};
    use crate::application::services::StaticContent;
    use crate::domain::entities::ItemDefinition;
    use crate::domain::value_objects::GuardrailConfig;
    use axum::http::StatusCode;
    use serde_json::json;

    fn lantern() -> serde_json::Value {
        json!({
            "id": "item_lantern",
            "name": "Lantern",
            "description": "A brass lantern",
            "item_type": "tool",
            "value": 12,
            "aliases": ["lamp"]
        })
    }

    #[tokio::test]
    async fn test_item_update_then_lookup_by_alias() {
        let (app, _) = test_app(GuardrailConfig::default(), StaticContent::default()).await;

        let (status, body) = send(&app, "PUT", "/api/director/items/item_lantern", Some(lantern())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "item_lantern");

        let (status, body) = send(&app, "GET", "/api/director/items/lamp", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Lantern");

        let (status, _) = send(&app, "DELETE", "/api/director/items/item_lantern", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/api/director/items/item_lantern", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mismatched_id_rejected() {
        let (app, _) = test_app(GuardrailConfig::default(), StaticContent::default()).await;
        let (status, _) = send(&app, "PUT", "/api/director/items/item_other", Some(lantern())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_static_items_listed() {
        let static_content = StaticContent {
            items: vec![serde_json::from_value::<ItemDefinition>(lantern()).unwrap()],
            ..StaticContent::default()
        };
        let (app, _) = test_app(GuardrailConfig::default(), static_content).await;

        let (status, body) = send(&app, "GET", "/api/director/items", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
