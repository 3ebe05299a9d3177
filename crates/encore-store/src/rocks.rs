//! `RocksDB` storage implementation.
//!
//! Values are CBOR-encoded. Multi-record writes go through a `WriteBatch`;
//! read-modify-write sequences additionally hold `write_lock` so that two
//! writers never act on the same snapshot.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use encore_core::activity::action;
use encore_core::{
    ActivityLog, AvailabilitySlot, Course, CourseId, EnrollOutcome, Order, OrderId,
    Payment, PaymentId, SlotId, UserId, UserProfile,
};

use crate::completion::{plan_completion, CompletionOutcome, CompletionPlan, PaymentCompletion};
use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{sort_slots, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, Self::serialize(value)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Keys in `cf_name` starting with `prefix`, in ascending order.
    fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let mut found = Vec::new();

        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key.to_vec());
        }

        Ok(found)
    }

    /// Add an activity entry and its user index to a batch.
    fn batch_activity(&self, batch: &mut WriteBatch, entry: &ActivityLog) -> Result<()> {
        let cf_activity = self.cf(cf::ACTIVITY)?;
        let cf_by_user = self.cf(cf::ACTIVITY_BY_USER)?;

        batch.put_cf(&cf_activity, entry.id.to_bytes(), Self::serialize(entry)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_activity_key(&entry.user_id, &entry.id),
            b"",
        );
        Ok(())
    }

    /// Persist a course and optionally one activity entry atomically.
    fn write_course(&self, course: &Course, entry: Option<&ActivityLog>) -> Result<()> {
        let cf_courses = self.cf(cf::COURSES)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_courses, course.id.as_bytes(), Self::serialize(course)?);
        if let Some(entry) = entry {
            self.batch_activity(&mut batch, entry)?;
        }
        self.write(batch)
    }

    fn load_course(&self, course_id: &CourseId) -> Result<Course> {
        self.get(cf::COURSES, course_id.as_bytes())?
            .ok_or_else(|| StoreError::not_found("course", course_id))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Users
    // =========================================================================

    fn put_user(&self, user: &UserProfile) -> Result<()> {
        self.put(cf::USERS, user.id.as_bytes(), user)
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        self.get(cf::USERS, user_id.as_bytes())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    fn put_course(&self, course: &Course) -> Result<()> {
        let _guard = self.lock()?;
        self.write_course(course, None)
    }

    fn get_course(&self, course_id: &CourseId) -> Result<Option<Course>> {
        self.get(cf::COURSES, course_id.as_bytes())
    }

    fn list_courses(&self, limit: usize, offset: usize) -> Result<Vec<Course>> {
        let cf = self.cf(cf::COURSES)?;
        let mut courses = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            courses.push(Self::deserialize::<Course>(&value)?);
        }

        courses.sort_by_key(|c| (c.created_at, c.id));
        Ok(courses.into_iter().skip(offset).take(limit).collect())
    }

    fn enroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<EnrollOutcome> {
        let _guard = self.lock()?;
        let mut course = self.load_course(course_id)?;

        let outcome = course.try_enroll(*student_id);
        if matches!(outcome, EnrollOutcome::Enrolled { .. }) {
            let entry = ActivityLog::new(
                *student_id,
                action::ENROLL,
                "courses",
                Some(course_id.to_string()),
            );
            self.write_course(&course, Some(&entry))?;
        }

        Ok(outcome)
    }

    fn unenroll_student(&self, course_id: &CourseId, student_id: &UserId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut course = self.load_course(course_id)?;

        let removed = course.remove_student(student_id);
        if removed {
            let entry = ActivityLog::new(
                *student_id,
                action::UNENROLL,
                "courses",
                Some(course_id.to_string()),
            );
            self.write_course(&course, Some(&entry))?;
        }

        Ok(removed)
    }

    // =========================================================================
    // Orders and payments
    // =========================================================================

    fn create_checkout(&self, order: &Order, payment: &Payment) -> Result<()> {
        let _guard = self.lock()?;

        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_gateway = self.cf(cf::ORDERS_BY_GATEWAY)?;
        let cf_payments = self.cf(cf::PAYMENTS)?;
        let cf_by_user_course = self.cf(cf::PAYMENTS_BY_USER_COURSE)?;

        let exists = self
            .db
            .get_cf(&cf_by_gateway, order.gateway_order_id.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Err(StoreError::Conflict(format!(
                "gateway order {} already recorded",
                order.gateway_order_id
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_orders, order.id.to_bytes(), Self::serialize(order)?);
        batch.put_cf(
            &cf_by_gateway,
            order.gateway_order_id.as_bytes(),
            order.id.to_bytes(),
        );
        batch.put_cf(&cf_payments, payment.id.to_bytes(), Self::serialize(payment)?);
        if let Some(owner) = payment.owner() {
            batch.put_cf(
                &cf_by_user_course,
                keys::user_course_payment_key(&owner, &payment.course_id, &payment.id),
                b"",
            );
        }

        self.write(batch)
    }

    fn get_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        let cf_by_gateway = self.cf(cf::ORDERS_BY_GATEWAY)?;
        let Some(id_bytes) = self
            .db
            .get_cf(&cf_by_gateway, gateway_order_id.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let order_id = keys::trailing_id(&id_bytes).map(OrderId::from_bytes).ok_or_else(|| {
            StoreError::Serialization(format!("corrupt order index for {gateway_order_id}"))
        })?;

        self.get(cf::ORDERS, &order_id.to_bytes())
    }

    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>> {
        self.get(cf::PAYMENTS, &payment_id.to_bytes())
    }

    fn has_completed_payment(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool> {
        let prefix = keys::user_course_prefix(user_id, course_id);

        for key in self.prefix_keys(cf::PAYMENTS_BY_USER_COURSE, &prefix)? {
            let Some(id) = keys::trailing_id(&key) else {
                continue;
            };
            if let Some(payment) = self.get_payment(&PaymentId::from_bytes(id))? {
                if payment.is_completed() {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn complete_payment(&self, completion: &PaymentCompletion) -> Result<CompletionOutcome> {
        let _guard = self.lock()?;

        let payment = self
            .get_payment(&completion.payment_id)?
            .ok_or_else(|| StoreError::not_found("payment", completion.payment_id))?;
        let order: Order = self
            .get(cf::ORDERS, &payment.order_id.to_bytes())?
            .ok_or_else(|| StoreError::not_found("order", payment.order_id))?;
        let course = self.load_course(&payment.course_id)?;

        let writes = match plan_completion(completion, payment, order, course)? {
            CompletionPlan::Unchanged(outcome) => return Ok(outcome),
            CompletionPlan::Write(writes) => writes,
        };

        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_payments = self.cf(cf::PAYMENTS)?;
        let cf_courses = self.cf(cf::COURSES)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_orders,
            writes.order.id.to_bytes(),
            Self::serialize(&writes.order)?,
        );
        batch.put_cf(
            &cf_payments,
            writes.payment.id.to_bytes(),
            Self::serialize(&writes.payment)?,
        );
        if let Some(course) = &writes.course {
            batch.put_cf(&cf_courses, course.id.as_bytes(), Self::serialize(course)?);
        }
        for entry in &writes.activity {
            self.batch_activity(&mut batch, entry)?;
        }

        self.write(batch)?;
        Ok(writes.outcome)
    }

    // =========================================================================
    // Activity log
    // =========================================================================

    fn append_activity(&self, entry: &ActivityLog) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_activity(&mut batch, entry)?;
        self.write(batch)
    }

    fn list_activity(&self, limit: usize, offset: usize) -> Result<Vec<ActivityLog>> {
        let cf = self.cf(cf::ACTIVITY)?;
        let mut entries = Vec::new();

        // ULID keys: iterating from the end yields newest first.
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::End)
            .skip(offset)
            .take(limit)
        {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            entries.push(Self::deserialize(&value)?);
        }

        Ok(entries)
    }

    fn list_activity_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ActivityLog>> {
        let mut index_keys = self.prefix_keys(cf::ACTIVITY_BY_USER, user_id.as_bytes())?;
        index_keys.reverse();

        let mut entries = Vec::new();
        for key in index_keys.into_iter().skip(offset).take(limit) {
            let Some(id) = keys::trailing_id(&key) else {
                continue;
            };
            if let Some(entry) = self.get(cf::ACTIVITY, &id)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    // =========================================================================
    // Availability
    // =========================================================================

    fn put_slot(&self, slot: &AvailabilitySlot) -> Result<()> {
        self.put(cf::SLOTS, &keys::user_slot_key(&slot.user_id, &slot.id), slot)
    }

    fn list_slots_by_user(&self, user_id: &UserId) -> Result<Vec<AvailabilitySlot>> {
        let cf = self.cf(cf::SLOTS)?;
        let prefix = user_id.as_bytes();
        let mut slots = Vec::new();

        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            slots.push(Self::deserialize(&value)?);
        }

        sort_slots(&mut slots);
        Ok(slots)
    }

    fn delete_slot(&self, user_id: &UserId, slot_id: &SlotId) -> Result<()> {
        let cf = self.cf(cf::SLOTS)?;
        let key = keys::user_slot_key(user_id, slot_id);

        let exists = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if !exists {
            return Err(StoreError::not_found("availability slot", slot_id));
        }

        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
