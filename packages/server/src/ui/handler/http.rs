//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{infrastructure::dto::http::RoomSummaryDto, ui::state::AppState};

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// 公開ルームの一覧と現在の参加人数を返す
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms: Vec<RoomSummaryDto> = state
        .router
        .room_presence()
        .await
        .into_iter()
        .map(|(name, member_count)| RoomSummaryDto { name, member_count })
        .collect();

    Json(rooms)
}
