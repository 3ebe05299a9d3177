//! Course catalog entries and the enrollment ledger they carry.
//!
//! A course keeps the enrolled student IDs together with a cached `students`
//! count. Every mutation recomputes the count from the list, so a drifted
//! counter heals itself on the next write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{CourseId, UserId};

/// A class type offered by a course (e.g. "group", "one-on-one").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassType {
    /// Display name of the class type.
    pub name: String,

    /// Maximum number of students; `None` or `Some(0)` means unlimited.
    #[serde(default, deserialize_with = "deserialize_max_students")]
    pub max_students: Option<u32>,

    /// Lesson duration, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl ClassType {
    /// Create a class type with a student limit.
    #[must_use]
    pub fn new(name: impl Into<String>, max_students: Option<u32>) -> Self {
        Self {
            name: name.into(),
            max_students,
            duration_minutes: None,
        }
    }
}

/// Normalize a loosely-typed `max_students` value.
///
/// Accepts non-negative integers, integral floats and numeric strings.
/// Anything else (negative numbers, fractions, text, arrays, objects) is
/// treated as absent, which the capacity check reads as unlimited.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize_max_students(value: &serde_json::Value) -> Option<u32> {
    let as_integral = |f: f64| (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then(|| f as u64);

    let raw = match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(as_integral)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(as_integral))
        }
        _ => None,
    }?;

    Some(u32::try_from(raw).unwrap_or(u32::MAX))
}

fn deserialize_max_students<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(normalize_max_students))
}

/// A course with its enrollment ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Course ID.
    pub id: CourseId,

    /// Course title.
    pub title: String,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// Teacher who owns the course.
    #[serde(default)]
    pub teacher_id: Option<UserId>,

    /// Price in minor currency units. Zero or negative means free.
    pub final_price: i64,

    /// ISO currency code for `final_price`.
    pub currency: String,

    /// Enrolled students. No duplicates; order is join order.
    #[serde(default)]
    pub student_ids: Vec<UserId>,

    /// Cached `student_ids.len()`.
    #[serde(default)]
    pub students: u32,

    /// Class types with their capacity settings.
    #[serde(default)]
    pub class_types: Vec<ClassType>,

    /// When the course was created.
    pub created_at: DateTime<Utc>,

    /// When the course was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Result of an enrollment attempt against a course ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnrollOutcome {
    /// The student was added.
    Enrolled {
        /// Student count after the change.
        students: u32,
    },
    /// The student was already enrolled; nothing changed.
    AlreadyEnrolled {
        /// Current student count.
        students: u32,
    },
    /// The course has no room; nothing changed.
    CourseFull {
        /// The capacity that was reached.
        max_students: u32,
        /// Current student count.
        students: u32,
    },
}

impl EnrollOutcome {
    /// Whether the student is enrolled after this outcome.
    #[must_use]
    pub const fn is_enrolled(&self) -> bool {
        matches!(self, Self::Enrolled { .. } | Self::AlreadyEnrolled { .. })
    }
}

impl Course {
    /// Create an empty course.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        final_price: i64,
        currency: impl Into<String>,
        class_types: Vec<ClassType>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CourseId::generate(),
            title: title.into(),
            description: None,
            teacher_id: None,
            final_price,
            currency: currency.into(),
            student_ids: Vec::new(),
            students: 0,
            class_types,
            created_at: now,
            updated_at: now,
        }
    }

    /// Capacity: the largest `max_students` over all class types, 0 if none.
    #[must_use]
    pub fn max_students(&self) -> u32 {
        self.class_types
            .iter()
            .filter_map(|c| c.max_students)
            .max()
            .unwrap_or(0)
    }

    /// Whether one more student fits. A capacity of 0 is unlimited.
    ///
    /// Compares against the cached `students` counter.
    #[must_use]
    pub fn has_space(&self) -> bool {
        let max = self.max_students();
        max == 0 || self.students < max
    }

    /// Whether the course can be taken without payment.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.final_price <= 0
    }

    /// Whether the student is in the ledger.
    #[must_use]
    pub fn is_enrolled(&self, student_id: &UserId) -> bool {
        self.student_ids.contains(student_id)
    }

    /// Add a student if not already present and the course has room.
    ///
    /// Idempotent. On success the counter is recomputed from the list.
    pub fn try_enroll(&mut self, student_id: UserId) -> EnrollOutcome {
        if self.is_enrolled(&student_id) {
            return EnrollOutcome::AlreadyEnrolled {
                students: self.students,
            };
        }

        if !self.has_space() {
            return EnrollOutcome::CourseFull {
                max_students: self.max_students(),
                students: self.students,
            };
        }

        self.student_ids.push(student_id);
        self.sync_student_count();
        self.updated_at = Utc::now();

        EnrollOutcome::Enrolled {
            students: self.students,
        }
    }

    /// Remove a student. Returns `false` if they were not enrolled.
    pub fn remove_student(&mut self, student_id: &UserId) -> bool {
        let before = self.student_ids.len();
        self.student_ids.retain(|id| id != student_id);
        if self.student_ids.len() == before {
            return false;
        }
        self.sync_student_count();
        self.updated_at = Utc::now();
        true
    }

    fn sync_student_count(&mut self) {
        self.students = u32::try_from(self.student_ids.len()).unwrap_or(u32::MAX);
    }
}
