//! Short-lived memory of checkout attempts per (user, course).
//!
//! Entries record the gateway order a user opened and whether they reported
//! a QR payment. The reconciliation flow reads them to decide whether to
//! enroll without a verified signature, and marks QR entries processed so
//! they are consumed once. Entries expire after a fixed TTL.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use encore_core::{CourseId, PaymentId, UserId};

/// A remembered checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentAttempt {
    /// The paying user.
    pub user_id: UserId,
    /// The course being bought.
    pub course_id: CourseId,
    /// Gateway order opened for this attempt, if any.
    pub gateway_order_id: Option<String>,
    /// Local payment record, if any.
    pub payment_id: Option<PaymentId>,
    /// Whether the user reported paying by QR code.
    pub qr_recorded: bool,
    /// Whether the reconciliation flow already acted on the QR report.
    pub processed: bool,
}

#[derive(Debug)]
struct Entry {
    attempt: PaymentAttempt,
    recorded_at: Instant,
}

/// TTL-bounded map of payment attempts.
#[derive(Debug)]
pub struct PaymentAttemptCache {
    ttl: Duration,
    entries: RwLock<HashMap<(UserId, CourseId), Entry>>,
}

impl PaymentAttemptCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Remember that a gateway order was opened.
    pub async fn record_order(
        &self,
        user_id: UserId,
        course_id: CourseId,
        gateway_order_id: &str,
        payment_id: PaymentId,
    ) {
        self.upsert(user_id, course_id, |attempt| {
            attempt.gateway_order_id = Some(gateway_order_id.to_string());
            attempt.payment_id = Some(payment_id);
        })
        .await;
    }

    /// Remember that the user reported a QR payment.
    ///
    /// A new report re-arms an attempt that was already processed.
    pub async fn record_qr(&self, user_id: UserId, course_id: CourseId) {
        self.upsert(user_id, course_id, |attempt| {
            attempt.qr_recorded = true;
            attempt.processed = false;
        })
        .await;
        tracing::info!(user_id = %user_id, course_id = %course_id, "QR payment recorded");
    }

    /// The live attempt for a (user, course) pair.
    pub async fn get(&self, user_id: UserId, course_id: CourseId) -> Option<PaymentAttempt> {
        let entries = self.entries.read().await;
        entries
            .get(&(user_id, course_id))
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.attempt.clone())
    }

    /// Whether a QR report is waiting to be acted on.
    pub async fn has_pending_qr(&self, user_id: UserId, course_id: CourseId) -> bool {
        self.get(user_id, course_id)
            .await
            .is_some_and(|attempt| attempt.qr_recorded && !attempt.processed)
    }

    /// Mark the attempt as handled. No-op when there is none.
    pub async fn mark_processed(&self, user_id: UserId, course_id: CourseId) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&(user_id, course_id)) {
            entry.attempt.processed = true;
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !self.is_expired(e)).count()
    }

    /// Whether there are no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn upsert(
        &self,
        user_id: UserId,
        course_id: CourseId,
        update: impl FnOnce(&mut PaymentAttempt),
    ) {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now.duration_since(entry.recorded_at) < ttl);

        let entry = entries.entry((user_id, course_id)).or_insert_with(|| Entry {
            attempt: PaymentAttempt {
                user_id,
                course_id,
                gateway_order_id: None,
                payment_id: None,
                qr_recorded: false,
                processed: false,
            },
            recorded_at: now,
        });
        update(&mut entry.attempt);
        entry.recorded_at = now;
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.recorded_at.elapsed() >= self.ttl
    }
}
