//! Admin reporting handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::users::ListActivityResponse;
use crate::handlers::PageQuery;
use crate::state::AppState;

/// List activity across all users, newest first.
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListActivityResponse>, ApiError> {
    let limit = query.clamped_limit();
    let entries = state.store.list_activity(limit + 1, query.offset)?;

    tracing::debug!(
        admin_id = %admin.admin_id,
        offset = query.offset,
        returned = entries.len().min(limit),
        "Activity report"
    );

    Ok(Json(ListActivityResponse::from_page(&entries, limit)))
}
