//! HTTP API response DTOs.

use serde::Serialize;

/// One public room in the `/api/rooms` listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub name: String,
    pub member_count: usize,
}
