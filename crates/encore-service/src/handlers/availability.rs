//! Availability slot handlers.
//!
//! Overlapping slots are allowed; responses list the overlaps so the UI can
//! flag them.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use encore_core::availability::overlapping;
use encore_core::{AvailabilitySlot, SlotId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Slot response.
#[derive(Debug, Serialize)]
pub struct SlotResponse {
    /// Slot ID.
    pub id: String,
    /// Day of week, 0 = Sunday.
    pub day_of_week: u8,
    /// Start time, `HH:MM`.
    pub start_time: String,
    /// End time, `HH:MM`.
    pub end_time: String,
    /// Category label.
    pub category: String,
    /// Other slots of the same user that overlap this one.
    pub overlaps_with: Vec<String>,
}

impl SlotResponse {
    fn new(slot: &AvailabilitySlot, others: &[AvailabilitySlot]) -> Self {
        Self {
            id: slot.id.to_string(),
            day_of_week: slot.day_of_week,
            start_time: slot.start_time.format("%H:%M").to_string(),
            end_time: slot.end_time.format("%H:%M").to_string(),
            category: slot.category.clone(),
            overlaps_with: overlapping(others, slot)
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Create slot request.
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    /// Day of week, 0 = Sunday.
    pub day_of_week: u8,
    /// Start time, `HH:MM` or `HH:MM:SS`.
    pub start_time: String,
    /// End time, `HH:MM` or `HH:MM:SS`.
    pub end_time: String,
    /// Category label (default: "lessons").
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "lessons".to_string()
}

/// Add a slot for the caller.
pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateSlotRequest>,
) -> Result<Json<SlotResponse>, ApiError> {
    let slot = AvailabilitySlot::new(
        auth.user_id,
        body.day_of_week,
        &body.start_time,
        &body.end_time,
        body.category,
    )?;

    let existing = state.store.list_slots_by_user(&auth.user_id)?;
    state.store.put_slot(&slot)?;

    let response = SlotResponse::new(&slot, &existing);
    if !response.overlaps_with.is_empty() {
        tracing::debug!(
            user_id = %auth.user_id,
            slot_id = %slot.id,
            overlaps = response.overlaps_with.len(),
            "Slot overlaps existing availability"
        );
    }

    Ok(Json(response))
}

/// Slot list response.
#[derive(Debug, Serialize)]
pub struct ListSlotsResponse {
    /// Slots ordered by day and start time.
    pub slots: Vec<SlotResponse>,
}

/// List the caller's slots.
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListSlotsResponse>, ApiError> {
    let slots = state.store.list_slots_by_user(&auth.user_id)?;

    Ok(Json(ListSlotsResponse {
        slots: slots.iter().map(|s| SlotResponse::new(s, &slots)).collect(),
    }))
}

/// Delete one of the caller's slots.
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(slot_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let slot_id: SlotId = slot_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid slot ID: {slot_id}")))?;

    state.store.delete_slot(&auth.user_id, &slot_id)?;

    Ok(Json(serde_json::json!({ "deleted": true, "id": slot_id.to_string() })))
}
