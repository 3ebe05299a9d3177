//! Column families used by the `RocksDB` backend.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User profiles, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Courses with their enrollment ledger, keyed by `course_id`.
    pub const COURSES: &str = "courses";

    /// Orders, keyed by local `order_id` (ULID).
    pub const ORDERS: &str = "orders";

    /// Index: gateway order ID -> local `order_id` bytes.
    pub const ORDERS_BY_GATEWAY: &str = "orders_by_gateway";

    /// Payments, keyed by local `payment_id` (ULID).
    pub const PAYMENTS: &str = "payments";

    /// Index: `user_id || course_id || payment_id`, empty value.
    pub const PAYMENTS_BY_USER_COURSE: &str = "payments_by_user_course";

    /// Activity log, keyed by `activity_id` (ULID, time-ordered).
    pub const ACTIVITY: &str = "activity";

    /// Index: `user_id || activity_id`, empty value.
    pub const ACTIVITY_BY_USER: &str = "activity_by_user";

    /// Availability slots, keyed by `user_id || slot_id`.
    pub const SLOTS: &str = "slots";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::COURSES,
        cf::ORDERS,
        cf::ORDERS_BY_GATEWAY,
        cf::PAYMENTS,
        cf::PAYMENTS_BY_USER_COURSE,
        cf::ACTIVITY,
        cf::ACTIVITY_BY_USER,
        cf::SLOTS,
    ]
}
