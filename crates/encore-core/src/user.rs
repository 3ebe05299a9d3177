//! User profiles and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role of a user in the school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Takes lessons; the only role allowed to enroll.
    Student,
    /// Teaches courses.
    Teacher,
    /// Runs the school.
    Admin,
}

impl Role {
    /// Whether this role may enroll in courses.
    #[must_use]
    pub const fn can_enroll(self) -> bool {
        matches!(self, Self::Student)
    }

    /// Whether this role may create courses.
    #[must_use]
    pub const fn can_manage_courses(self) -> bool {
        matches!(self, Self::Teacher | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// A user profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID (same as the auth subject).
    pub id: UserId,

    /// Role.
    pub role: Role,

    /// Display name.
    pub name: String,

    /// Contact email.
    pub email: Option<String>,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Create a profile.
    #[must_use]
    pub fn new(id: UserId, role: Role, name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            name: name.into(),
            email: None,
            created_at: Utc::now(),
        }
    }
}
