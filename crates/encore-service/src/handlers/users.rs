//! User profile handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use encore_core::{ActivityLog, Role, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::PageQuery;
use crate::state::AppState;

/// Profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User ID.
    pub id: String,
    /// Role.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&UserProfile> for ProfileResponse {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            role: profile.role,
            name: profile.name.clone(),
            email: profile.email.clone(),
            created_at: profile.created_at.to_rfc3339(),
        }
    }
}

/// Register profile request.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    /// Display name.
    pub name: String,
    /// Optional contact email.
    pub email: Option<String>,
    /// Requested role (default: student).
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Student
}

/// Register the caller's profile.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if body.role == Role::Admin {
        return Err(ApiError::Forbidden(
            "admin accounts cannot be self-registered".into(),
        ));
    }

    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }

    if state.store.get_user(&auth.user_id)?.is_some() {
        return Err(ApiError::Conflict("Profile already exists".into()));
    }

    let mut profile = UserProfile::new(auth.user_id, body.role, name);
    profile.email = body.email;
    state.store.put_user(&profile)?;

    tracing::info!(user_id = %auth.user_id, role = %profile.role, "Profile created");

    Ok(Json(ProfileResponse::from(&profile)))
}

/// Get the caller's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;

    Ok(Json(ProfileResponse::from(&profile)))
}

/// Activity entry response.
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    /// Entry ID.
    pub id: String,
    /// Acting user.
    pub user_id: String,
    /// Action name.
    pub action: String,
    /// Area of the app.
    pub component: String,
    /// Affected entity.
    pub entity_id: Option<String>,
    /// Page the action happened on.
    pub page_url: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&ActivityLog> for ActivityResponse {
    fn from(entry: &ActivityLog) -> Self {
        Self {
            id: entry.id.to_string(),
            user_id: entry.user_id.to_string(),
            action: entry.action.clone(),
            component: entry.component.clone(),
            entity_id: entry.entity_id.clone(),
            page_url: entry.page_url.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Activity list response.
#[derive(Debug, Serialize)]
pub struct ListActivityResponse {
    /// Entries (newest first).
    pub activity: Vec<ActivityResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

impl ListActivityResponse {
    /// Build a page from `limit + 1` fetched entries.
    #[must_use]
    pub fn from_page(entries: &[ActivityLog], limit: usize) -> Self {
        Self {
            activity: entries.iter().take(limit).map(ActivityResponse::from).collect(),
            has_more: entries.len() > limit,
        }
    }
}

/// List the caller's activity.
pub async fn list_my_activity(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListActivityResponse>, ApiError> {
    let limit = query.clamped_limit();
    let entries = state
        .store
        .list_activity_by_user(&auth.user_id, limit + 1, query.offset)?;

    Ok(Json(ListActivityResponse::from_page(&entries, limit)))
}
