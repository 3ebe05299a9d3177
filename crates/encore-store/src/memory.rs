//! In-memory storage implementation.
//!
//! All tables live behind one `RwLock`; every compound operation holds the
//! write guard from its first read to its last write.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use encore_core::activity::action;
use encore_core::{
    ActivityId, ActivityLog, AvailabilitySlot, Course, CourseId, EnrollOutcome, Order, OrderId,
    Payment, PaymentId, SlotId, UserId, UserProfile,
};

use crate::completion::{plan_completion, CompletionOutcome, CompletionPlan, PaymentCompletion};
use crate::error::{Result, StoreError};
use crate::{sort_slots, Store};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserProfile>,
    courses: HashMap<CourseId, Course>,
    orders: HashMap<OrderId, Order>,
    orders_by_gateway: HashMap<String, OrderId>,
    payments: HashMap<PaymentId, Payment>,
    activity: BTreeMap<ActivityId, ActivityLog>,
    slots: BTreeMap<SlotId, AvailabilitySlot>,
}

/// Store backed by process memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }
}

fn page<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    limit: usize,
    offset: usize,
) -> Vec<T> {
    items.skip(offset).take(limit).cloned().collect()
}

impl Store for MemoryStore {
    fn put_user(&self, user: &UserProfile) -> Result<()> {
        self.write()?.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    fn put_course(&self, course: &Course) -> Result<()> {
        self.write()?.courses.insert(course.id, course.clone());
        Ok(())
    }

    fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>> {
        Ok(self.read()?.courses.get(course_id).cloned())
    }

    fn list_courses(&self, limit: usize, offset: usize) -> Result<Vec<Course>> {
        let tables = self.read()?;
        let mut courses: Vec<&Course> = tables.courses.values().collect();
        courses.sort_by_key(|c| (c.created_at, c.id));
        Ok(page(courses.into_iter(), limit, offset))
    }

    fn enroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<EnrollOutcome> {
        let mut tables = self.write()?;
        let course = tables
            .courses
            .get_mut(course_id)
            .ok_or_else(|| StoreError::not_found("course", course_id))?;

        let outcome = course.try_enroll(*student_id);
        if matches!(outcome, EnrollOutcome::Enrolled { .. }) {
            let entry = ActivityLog::new(
                *student_id,
                action::ENROLL,
                "courses",
                Some(course_id.to_string()),
            );
            tables.activity.insert(entry.id, entry);
        }

        Ok(outcome)
    }

    fn unenroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<bool> {
        let mut tables = self.write()?;
        let course = tables
            .courses
            .get_mut(course_id)
            .ok_or_else(|| StoreError::not_found("course", course_id))?;

        let removed = course.remove_student(student_id);
        if removed {
            let entry = ActivityLog::new(
                *student_id,
                action::UNENROLL,
                "courses",
                Some(course_id.to_string()),
            );
            tables.activity.insert(entry.id, entry);
        }

        Ok(removed)
    }

    fn create_checkout(&self, order: &Order, payment: &Payment) -> Result<()> {
        let mut tables = self.write()?;
        if tables.orders_by_gateway.contains_key(&order.gateway_order_id) {
            return Err(StoreError::Conflict(format!(
                "gateway order {} already recorded",
                order.gateway_order_id
            )));
        }

        tables
            .orders_by_gateway
            .insert(order.gateway_order_id.clone(), order.id);
        tables.orders.insert(order.id, order.clone());
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        let tables = self.read()?;
        Ok(tables
            .orders_by_gateway
            .get(gateway_order_id)
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>> {
        Ok(self.read()?.payments.get(payment_id).cloned())
    }

    fn has_completed_payment(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool> {
        Ok(self.read()?.payments.values().any(|p| {
            p.is_completed() && p.course_id == *course_id && p.owner() == Some(*user_id)
        }))
    }

    fn complete_payment(&self, completion: &PaymentCompletion) -> Result<CompletionOutcome> {
        let mut tables = self.write()?;

        let payment = tables
            .payments
            .get(&completion.payment_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("payment", completion.payment_id))?;
        let order = tables
            .orders
            .get(&payment.order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", payment.order_id))?;
        let course = tables
            .courses
            .get(&payment.course_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("course", payment.course_id))?;

        match plan_completion(completion, payment, order, course)? {
            CompletionPlan::Unchanged(outcome) => Ok(outcome),
            CompletionPlan::Write(writes) => {
                let writes = *writes;
                tables.orders.insert(writes.order.id, writes.order);
                tables.payments.insert(writes.payment.id, writes.payment);
                if let Some(course) = writes.course {
                    tables.courses.insert(course.id, course);
                }
                for entry in writes.activity {
                    tables.activity.insert(entry.id, entry);
                }
                Ok(writes.outcome)
            }
        }
    }

    fn append_activity(&self, entry: &ActivityLog) -> Result<()> {
        self.write()?.activity.insert(entry.id, entry.clone());
        Ok(())
    }

    fn list_activity(&self, limit: usize, offset: usize) -> Result<Vec<ActivityLog>> {
        Ok(page(self.read()?.activity.values().rev(), limit, offset))
    }

    fn list_activity_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActivityLog>> {
        let tables = self.read()?;
        let entries = tables
            .activity
            .values()
            .rev()
            .filter(|entry| entry.user_id == *user_id);
        Ok(page(entries, limit, offset))
    }

    fn put_slot(&self, slot: &AvailabilitySlot) -> Result<()> {
        self.write()?.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    fn list_slots_by_user(&self, user_id: &UserId) -> Result<Vec<AvailabilitySlot>> {
        let mut slots: Vec<_> = self
            .read()?
            .slots
            .values()
            .filter(|s| s.user_id == *user_id)
            .cloned()
            .collect();
        sort_slots(&mut slots);
        Ok(slots)
    }

    fn delete_slot(&self, user_id: &UserId, slot_id: &SlotId) -> Result<()> {
        let mut tables = self.write()?;
        match tables.slots.get(slot_id) {
            Some(slot) if slot.user_id == *user_id => {
                tables.slots.remove(slot_id);
                Ok(())
            }
            _ => Err(StoreError::not_found("availability slot", slot_id)),
        }
    }
}
