//! Data-access interface for the booking core.
//!
//! The calculators are pure functions; everything they consume arrives
//! through [`BookingStore`], so the relational store can be swapped out
//! (unit tests run against [`MemoryStore`]). Implementations own the
//! commit-time capacity re-check described on [`BookingStore::create_booking`].

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

use super::calculators;
use super::models::{BookingWindow, NewBooking, PricingSchedule, ResourceType};
use super::queries;
use super::services::BookingError;

/// Abstract store the booking services read from and admit bookings into.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Total capacity of a warehouse in the given dimension, or `None` when
    /// the warehouse is unknown.
    async fn warehouse_capacity(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<Decimal>, BookingError>;

    /// Occupancy-counting bookings whose half-open interval overlaps the
    /// query window.
    async fn overlapping_bookings(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<BookingWindow>, BookingError>;

    /// Active pricing schedule for a warehouse/resource pair, or `None`
    /// when the dimension is not sellable there.
    async fn pricing_schedule(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<PricingSchedule>, BookingError>;

    /// Membership discount percent for a customer; 0 when the customer has
    /// no active membership.
    async fn membership_discount_percent(&self, customer_id: Uuid)
        -> Result<Decimal, BookingError>;

    /// Persist a confirmed booking.
    ///
    /// An earlier availability snapshot is not a reservation, so this call
    /// re-validates capacity under a per-warehouse-per-resource lock and
    /// fails the later of two racing writers with
    /// [`BookingError::InsufficientCapacity`].
    async fn create_booking(&self, booking: &NewBooking) -> Result<Uuid, BookingError>;
}

fn data_access(err: AppError) -> BookingError {
    BookingError::DataAccess {
        message: err.to_string(),
    }
}

/// Advisory lock key for one warehouse/resource admission stream.
fn admission_lock_key(warehouse_id: Uuid, resource_type: ResourceType) -> i64 {
    let bytes = warehouse_id.as_bytes();
    let mut hi = [0u8; 8];
    let mut lo = [0u8; 8];
    hi.copy_from_slice(&bytes[..8]);
    lo.copy_from_slice(&bytes[8..]);
    i64::from_be_bytes(hi) ^ i64::from_be_bytes(lo) ^ resource_type as i64
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn warehouse_capacity(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<Decimal>, BookingError> {
        let warehouse = queries::get_warehouse(&self.pool, warehouse_id)
            .await
            .map_err(data_access)?;

        Ok(warehouse.map(|w| w.capacity_for(resource_type)))
    }

    async fn overlapping_bookings(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<BookingWindow>, BookingError> {
        queries::get_overlapping_bookings(&self.pool, warehouse_id, resource_type, start_date, end_date)
            .await
            .map_err(data_access)
    }

    async fn pricing_schedule(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<PricingSchedule>, BookingError> {
        let row = queries::get_pricing_schedule(&self.pool, warehouse_id, resource_type)
            .await
            .map_err(data_access)?;

        match row {
            Some(row) => {
                let schedule = row
                    .into_schedule()
                    .map_err(|message| BookingError::Configuration { message })?;
                Ok(Some(schedule))
            }
            None => Ok(None),
        }
    }

    async fn membership_discount_percent(
        &self,
        customer_id: Uuid,
    ) -> Result<Decimal, BookingError> {
        let percent = queries::get_membership_discount_percent(&self.pool, customer_id)
            .await
            .map_err(data_access)?;

        Ok(percent.unwrap_or(Decimal::ZERO))
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Uuid, BookingError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| data_access(AppError::Database(e)))?;

        let lock_key = admission_lock_key(booking.warehouse_id, booking.resource_type);
        queries::acquire_admission_lock(&mut *tx, lock_key)
            .await
            .map_err(data_access)?;

        // Re-validate under the lock: the pre-check snapshot may be stale.
        let warehouse = queries::get_warehouse(&mut *tx, booking.warehouse_id)
            .await
            .map_err(data_access)?
            .ok_or(BookingError::UnsupportedResource {
                warehouse_id: booking.warehouse_id,
                resource_type: booking.resource_type,
            })?;

        let total = warehouse.capacity_for(booking.resource_type);
        let occupied = queries::sum_overlapping_quantity(
            &mut *tx,
            booking.warehouse_id,
            booking.resource_type,
            booking.start_date,
            booking.end_date,
        )
        .await
        .map_err(data_access)?;

        let available = calculators::available_capacity(total, occupied);
        if booking.quantity > available {
            return Err(BookingError::InsufficientCapacity {
                requested: booking.quantity,
                available,
            });
        }

        let id = queries::insert_booking(&mut *tx, booking)
            .await
            .map_err(data_access)?;

        tx.commit()
            .await
            .map_err(|e| data_access(AppError::Database(e)))?;

        Ok(id)
    }
}

/// In-memory store used by unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<MemoryInner>,
    schedule_fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[derive(Default)]
struct MemoryInner {
    capacities: std::collections::HashMap<(Uuid, ResourceType), Decimal>,
    schedules: std::collections::HashMap<(Uuid, ResourceType), PricingSchedule>,
    memberships: std::collections::HashMap<Uuid, Decimal>,
    bookings: Vec<(Uuid, ResourceType, BookingWindow)>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn put_capacity(&self, warehouse_id: Uuid, resource_type: ResourceType, total: Decimal) {
        let mut inner = self.inner.lock().unwrap();
        inner.capacities.insert((warehouse_id, resource_type), total);
    }

    pub fn put_schedule(&self, schedule: PricingSchedule) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .schedules
            .insert((schedule.warehouse_id, schedule.resource_type), schedule);
    }

    pub fn put_membership(&self, customer_id: Uuid, percent: Decimal) {
        let mut inner = self.inner.lock().unwrap();
        inner.memberships.insert(customer_id, percent);
    }

    pub fn put_booking(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
        quantity: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.bookings.push((
            warehouse_id,
            resource_type,
            BookingWindow {
                quantity,
                start_date,
                end_date,
            },
        ));
    }

    pub fn schedule_fetches(&self) -> usize {
        self.schedule_fetches
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    fn windows_for(
        inner: &MemoryInner,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Vec<BookingWindow> {
        inner
            .bookings
            .iter()
            .filter(|(w, r, _)| *w == warehouse_id && *r == resource_type)
            .map(|(_, _, window)| window.clone())
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl BookingStore for MemoryStore {
    async fn warehouse_capacity(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<Decimal>, BookingError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.capacities.get(&(warehouse_id, resource_type)).copied())
    }

    async fn overlapping_bookings(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<BookingWindow>, BookingError> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::windows_for(&inner, warehouse_id, resource_type)
            .into_iter()
            .filter(|w| {
                calculators::intervals_overlap(w.start_date, w.end_date, start_date, end_date)
            })
            .collect())
    }

    async fn pricing_schedule(
        &self,
        warehouse_id: Uuid,
        resource_type: ResourceType,
    ) -> Result<Option<PricingSchedule>, BookingError> {
        self.schedule_fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        Ok(inner.schedules.get(&(warehouse_id, resource_type)).cloned())
    }

    async fn membership_discount_percent(
        &self,
        customer_id: Uuid,
    ) -> Result<Decimal, BookingError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .memberships
            .get(&customer_id)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Uuid, BookingError> {
        // The mutex plays the role of the advisory lock: the re-check and
        // the insert happen atomically with respect to other admissions.
        let mut inner = self.inner.lock().unwrap();

        let total = inner
            .capacities
            .get(&(booking.warehouse_id, booking.resource_type))
            .copied()
            .ok_or(BookingError::UnsupportedResource {
                warehouse_id: booking.warehouse_id,
                resource_type: booking.resource_type,
            })?;

        let windows = Self::windows_for(&inner, booking.warehouse_id, booking.resource_type);
        let occupied =
            calculators::occupied_capacity(&windows, booking.start_date, booking.end_date);
        let available = calculators::available_capacity(total, occupied);

        if booking.quantity > available {
            return Err(BookingError::InsufficientCapacity {
                requested: booking.quantity,
                available,
            });
        }

        inner.bookings.push((
            booking.warehouse_id,
            booking.resource_type,
            BookingWindow {
                quantity: booking.quantity,
                start_date: booking.start_date,
                end_date: booking.end_date,
            },
        ));

        Ok(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_lock_key_is_stable_per_pair() {
        let warehouse_id = Uuid::new_v4();
        let a = admission_lock_key(warehouse_id, ResourceType::Pallet);
        let b = admission_lock_key(warehouse_id, ResourceType::Pallet);
        assert_eq!(a, b);

        // Different dimension, different lock stream.
        let c = admission_lock_key(warehouse_id, ResourceType::Area);
        assert_ne!(a, c);
    }
}
