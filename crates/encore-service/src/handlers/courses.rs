//! Course catalog handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use encore_core::activity::action;
use encore_core::{ActivityLog, ClassType, Course, CourseId};

use crate::auth::AuthUser;
use crate::enrollment;
use crate::error::ApiError;
use crate::handlers::PageQuery;
use crate::state::AppState;

/// Course response. The student list itself is not exposed.
#[derive(Debug, Serialize)]
pub struct CourseResponse {
    /// Course ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Owning teacher.
    pub teacher_id: Option<String>,
    /// Price in minor units.
    pub final_price: i64,
    /// ISO currency code.
    pub currency: String,
    /// Enrolled student count.
    pub students: u32,
    /// Capacity, 0 for unlimited.
    pub max_students: u32,
    /// Class types.
    pub class_types: Vec<ClassType>,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Course> for CourseResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.to_string(),
            title: course.title.clone(),
            description: course.description.clone(),
            teacher_id: course.teacher_id.map(|id| id.to_string()),
            final_price: course.final_price,
            currency: course.currency.clone(),
            students: course.students,
            max_students: course.max_students(),
            class_types: course.class_types.clone(),
            created_at: course.created_at.to_rfc3339(),
        }
    }
}

/// Create course request.
#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price in minor units; 0 makes the course free.
    #[serde(default)]
    pub final_price: i64,
    /// Currency (default: the configured payment currency).
    pub currency: Option<String>,
    /// Class types; `max_students` accepts numbers or numeric strings.
    #[serde(default)]
    pub class_types: Vec<ClassType>,
}

/// Create a course. Teachers and admins only.
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateCourseRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    let profile = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("user does not exist".into()))?;

    if !profile.role.can_manage_courses() {
        return Err(ApiError::Forbidden(format!(
            "{} accounts cannot create courses",
            profile.role
        )));
    }

    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    if body.final_price < 0 {
        return Err(ApiError::BadRequest("final_price must not be negative".into()));
    }

    let currency = body
        .currency
        .unwrap_or_else(|| state.config.payment_currency.clone());
    let mut course = Course::new(title, body.final_price, currency, body.class_types);
    course.description = body.description;
    course.teacher_id = Some(auth.user_id);

    state.store.put_course(&course)?;
    state.store.append_activity(&ActivityLog::new(
        auth.user_id,
        action::COURSE_CREATED,
        "courses",
        Some(course.id.to_string()),
    ))?;

    tracing::info!(
        course_id = %course.id,
        teacher_id = %auth.user_id,
        max_students = course.max_students(),
        "Course created"
    );

    Ok(Json(CourseResponse::from(&course)))
}

/// Course list response.
#[derive(Debug, Serialize)]
pub struct ListCoursesResponse {
    /// Courses (oldest first).
    pub courses: Vec<CourseResponse>,
    /// Whether there are more courses.
    pub has_more: bool,
}

/// List courses.
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListCoursesResponse>, ApiError> {
    let limit = query.clamped_limit();
    let courses = state.store.list_courses(limit + 1, query.offset)?;

    Ok(Json(ListCoursesResponse {
        has_more: courses.len() > limit,
        courses: courses.iter().take(limit).map(CourseResponse::from).collect(),
    }))
}

/// Get one course.
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course_id = parse_course_id(&course_id)?;
    let course = state
        .store
        .get_course(&course_id)?
        .ok_or_else(|| ApiError::NotFound(format!("course not found: {course_id}")))?;

    Ok(Json(CourseResponse::from(&course)))
}

/// Capacity response.
#[derive(Debug, Serialize)]
pub struct CapacityResponse {
    /// Course ID.
    pub course_id: String,
    /// Whether one more student fits.
    pub has_space: bool,
}

/// Capacity check. Unknown courses report no space.
pub async fn get_capacity(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<CapacityResponse>, ApiError> {
    let course_id = parse_course_id(&course_id)?;

    Ok(Json(CapacityResponse {
        course_id: course_id.to_string(),
        has_space: enrollment::has_space(state.store.as_ref(), &course_id),
    }))
}

pub(crate) fn parse_course_id(raw: &str) -> Result<CourseId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid course ID: {raw}")))
}
