//! Core types for Encore, the music school enrollment and payment service.
//!
//! - **Identifiers**: `UserId`, `CourseId` (UUID); `OrderId`, `PaymentId`,
//!   `ActivityId`, `SlotId` (ULID, time-ordered)
//! - **Courses**: `Course`, `ClassType`, `EnrollOutcome`
//! - **Payments**: `Order`, `Payment`, `PaymentStatus`
//! - **Users**: `UserProfile`, `Role`
//! - **Activity**: `ActivityLog`
//! - **Availability**: `AvailabilitySlot`
//!
//! # Money
//!
//! Amounts are `i64` in minor currency units (paise for INR), matching what
//! the payment gateway expects.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod activity;
pub mod availability;
pub mod course;
pub mod error;
pub mod ids;
pub mod payment;
pub mod user;

pub use activity::ActivityLog;
pub use availability::AvailabilitySlot;
pub use course::{ClassType, Course, EnrollOutcome};
pub use error::{CoreError, Result};
pub use ids::{ActivityId, CourseId, IdError, OrderId, PaymentId, SlotId, UserId};
pub use payment::{Order, Payment, PaymentStatus};
pub use user::{Role, UserProfile};
