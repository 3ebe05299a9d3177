//! Append-only user activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityId, UserId};

/// Well-known activity actions.
pub mod action {
    /// A student joined a course.
    pub const ENROLL: &str = "enroll";
    /// A student left a course.
    pub const UNENROLL: &str = "unenroll";
    /// A checkout was created at the gateway.
    pub const ORDER_CREATED: &str = "order_created";
    /// A gateway payment was verified.
    pub const PAYMENT_COMPLETED: &str = "payment_completed";
    /// A course was created.
    pub const COURSE_CREATED: &str = "course_created";
}

/// One activity entry. Never modified after it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Entry ID (time-ordered).
    pub id: ActivityId,

    /// Acting user.
    pub user_id: UserId,

    /// What happened (see [`action`]).
    pub action: String,

    /// Which part of the system recorded it.
    pub component: String,

    /// Related entity, if any (course ID, payment ID, ...).
    pub entity_id: Option<String>,

    /// Page the user was on, when known.
    pub page_url: Option<String>,

    /// When it happened.
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Create an entry stamped now.
    #[must_use]
    pub fn new(
        user_id: UserId,
        action: impl Into<String>,
        component: impl Into<String>,
        entity_id: Option<String>,
    ) -> Self {
        Self {
            id: ActivityId::generate(),
            user_id,
            action: action.into(),
            component: component.into(),
            entity_id,
            page_url: None,
            created_at: Utc::now(),
        }
    }
}
