//! Key encoding utilities for `RocksDB`.
//!
//! UUIDs and ULIDs are both 16 bytes, so composite keys are fixed-width
//! concatenations and prefixes line up on 16-byte boundaries.

use encore_core::{ActivityId, CourseId, PaymentId, SlotId, UserId};

/// Length of every ID component in a key.
pub const ID_LEN: usize = 16;

/// Index key for a user's payments on a course.
///
/// Format: `user_id || course_id || payment_id`
#[must_use]
pub fn user_course_payment_key(
    user_id: &UserId,
    course_id: &CourseId,
    payment_id: &PaymentId,
) -> Vec<u8> {
    let mut key = user_course_prefix(user_id, course_id);
    key.extend_from_slice(&payment_id.to_bytes());
    key
}

/// Prefix for iterating a user's payments on a course.
#[must_use]
pub fn user_course_prefix(user_id: &UserId, course_id: &CourseId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 3);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(course_id.as_bytes());
    key
}

/// Index key for a user's activity entry.
///
/// Format: `user_id || activity_id`. ULIDs sort by time, so a prefix scan
/// yields the user's entries oldest first.
#[must_use]
pub fn user_activity_key(user_id: &UserId, activity_id: &ActivityId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&activity_id.to_bytes());
    key
}

/// Key for a user's availability slot. Format: `user_id || slot_id`.
#[must_use]
pub fn user_slot_key(user_id: &UserId, slot_id: &SlotId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN * 2);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&slot_id.to_bytes());
    key
}

/// Read the trailing 16-byte ID component of a composite key.
///
/// Returns `None` if the key is shorter than one ID.
#[must_use]
pub fn trailing_id(key: &[u8]) -> Option<[u8; ID_LEN]> {
    let start = key.len().checked_sub(ID_LEN)?;
    key[start..].try_into().ok()
}
