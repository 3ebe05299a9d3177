//! Weekly availability slots for teachers and students.
//!
//! Slots may overlap; nothing prevents it. [`overlapping`] reports the
//! conflicts so callers can surface them.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::{SlotId, UserId};

/// A recurring weekly time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    /// Slot ID.
    pub id: SlotId,

    /// Owner.
    pub user_id: UserId,

    /// 0 = Sunday ... 6 = Saturday.
    pub day_of_week: u8,

    /// Start of the window.
    pub start_time: NaiveTime,

    /// End of the window (exclusive).
    pub end_time: NaiveTime,

    /// Free-form label ("lessons", "practice room", ...).
    pub category: String,

    /// When the slot was created.
    pub created_at: DateTime<Utc>,
}

impl AvailabilitySlot {
    /// Build a slot from wire values, validating day and time range.
    ///
    /// # Errors
    ///
    /// Returns an error if the day is outside 0-6, either time is not
    /// `HH:MM` / `HH:MM:SS`, or the window is empty.
    pub fn new(
        user_id: UserId,
        day_of_week: u8,
        start_time: &str,
        end_time: &str,
        category: impl Into<String>,
    ) -> Result<Self> {
        if day_of_week > 6 {
            return Err(CoreError::InvalidDayOfWeek(day_of_week));
        }

        let start = parse_time_of_day(start_time)?;
        let end = parse_time_of_day(end_time)?;
        if start >= end {
            return Err(CoreError::EmptyTimeRange {
                start: start_time.to_string(),
                end: end_time.to_string(),
            });
        }

        Ok(Self {
            id: SlotId::generate(),
            user_id,
            day_of_week,
            start_time: start,
            end_time: end,
            category: category.into(),
            created_at: Utc::now(),
        })
    }

    /// Whether two slots of the same user share any time on the same day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// IDs of the slots in `existing` that overlap `candidate` (excluding itself).
#[must_use]
pub fn overlapping(existing: &[AvailabilitySlot], candidate: &AvailabilitySlot) -> Vec<SlotId> {
    existing
        .iter()
        .filter(|slot| slot.id != candidate.id && slot.overlaps(candidate))
        .map(|slot| slot.id)
        .collect()
}

/// Parse `HH:MM` or `HH:MM:SS`.
///
/// # Errors
///
/// Returns `CoreError::InvalidTime` for anything else.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CoreError::InvalidTime(value.to_string()))
}
