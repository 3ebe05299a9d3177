//! API handlers.

pub mod admin;
pub mod availability;
pub mod courses;
pub mod enrollment;
pub mod health;
pub mod payments;
pub mod users;

use serde::Deserialize;

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

impl PageQuery {
    /// The limit clamped to 100.
    #[must_use]
    pub fn clamped_limit(&self) -> usize {
        self.limit.min(100)
    }
}

fn default_limit() -> usize {
    50
}
