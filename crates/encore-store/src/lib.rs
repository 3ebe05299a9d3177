//! Storage layer for Encore.
//!
//! The [`Store`] trait covers every table the service touches: user
//! profiles, courses and their enrollment ledgers, orders, payments, the
//! activity log and availability slots.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`]: in-process maps, used by default and in tests
//! - `RocksStore`: `RocksDB` with one column family per table (feature
//!   `rocksdb-backend`)
//!
//! # Atomicity
//!
//! Ledger mutations ([`Store::enroll_student`], [`Store::unenroll_student`])
//! and [`Store::complete_payment`] read and write under a single write lock
//! in both backends. Capacity can therefore not be exceeded by concurrent
//! enrollments, and a payment is never marked completed without its
//! enrollment being recorded in the same write.
//!
//! # Example
//!
//! ```
//! use encore_core::{ClassType, Course, EnrollOutcome, UserId};
//! use encore_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let course = Course::new("Violin", 0, "INR", vec![ClassType::new("group", Some(1))]);
//! store.put_course(&course).unwrap();
//!
//! let outcome = store.enroll_student(&course.id, &UserId::generate()).unwrap();
//! assert_eq!(outcome, EnrollOutcome::Enrolled { students: 1 });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod completion;
pub mod error;
pub mod memory;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use completion::{CompletionOutcome, PaymentCompletion};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use encore_core::{
    ActivityLog, AvailabilitySlot, Course, CourseId, EnrollOutcome, Order, Payment, PaymentId,
    SlotId, UserId, UserProfile,
};

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Insert or update a user profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_user(&self, user: &UserProfile) -> Result<()>;

    /// Get a user profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    // =========================================================================
    // Courses and the enrollment ledger
    // =========================================================================

    /// Insert or update a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_course(&self, course: &Course) -> Result<()>;

    /// Get a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>>;

    /// List courses, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_courses(&self, limit: usize, offset: usize) -> Result<Vec<Course>>;

    /// Add a student to a course if they are not enrolled and it has room.
    ///
    /// The capacity check, the append, the counter update and the `enroll`
    /// activity entry are one atomic write. `CourseFull` and
    /// `AlreadyEnrolled` write nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the course doesn't exist.
    fn enroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<EnrollOutcome>;

    /// Remove a student from a course. Returns `false` if not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the course doesn't exist.
    fn unenroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<bool>;

    // =========================================================================
    // Orders and payments
    // =========================================================================

    /// Persist a new pending order and its payment together.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the gateway order ID is already
    /// recorded.
    fn create_checkout(&self, order: &Order, payment: &Payment) -> Result<()>;

    /// Get an order by the gateway's order ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>>;

    /// Get a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>>;

    /// Whether the user has a completed payment for the course.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_completed_payment(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool>;

    /// Apply a verified payment: mark order and payment completed, enroll
    /// the payer and log the activity, all in one write.
    ///
    /// Idempotent for the same gateway payment ID.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the payment, order or course is missing.
    /// - `StoreError::CourseFull` if the payer cannot be enrolled.
    /// - `StoreError::Conflict` if the details do not match the stored state.
    fn complete_payment(&self, completion: &PaymentCompletion) -> Result<CompletionOutcome>;

    // =========================================================================
    // Activity log
    // =========================================================================

    /// Append an activity entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_activity(&self, entry: &ActivityLog) -> Result<()>;

    /// List activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_activity(&self, limit: usize, offset: usize) -> Result<Vec<ActivityLog>>;

    /// List one user's activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_activity_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActivityLog>>;

    // =========================================================================
    // Availability
    // =========================================================================

    /// Insert or update an availability slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_slot(&self, slot: &AvailabilitySlot) -> Result<()>;

    /// List a user's slots ordered by day and start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_slots_by_user(&self, user_id: &UserId) -> Result<Vec<AvailabilitySlot>>;

    /// Delete one of a user's slots.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user has no such slot.
    fn delete_slot(&self, user_id: &UserId, slot_id: &SlotId) -> Result<()>;
}

/// Sort slots for display: by day, then start time.
pub(crate) fn sort_slots(slots: &mut [AvailabilitySlot]) {
    slots.sort_by_key(|s| (s.day_of_week, s.start_time, s.end_time));
}
