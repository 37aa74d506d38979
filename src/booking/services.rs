//! Booking service functions with store and cache access.
//!
//! These functions fetch booking data through the [`BookingStore`] interface
//! and delegate the math to the pure calculators. Availability answers are
//! snapshots of the booking set at query time; only the admission path
//! re-validates capacity when the booking is persisted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::AppCache;

use super::calculators::{self, AvailabilityResult, PricingBreakdown};
use super::models::{BookingStatus, NewBooking, PricingSchedule, ResourceType};
use super::store::BookingStore;

/// Result of an admitted booking.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub breakdown: PricingBreakdown,
}

/// Booking domain error types
#[derive(Debug, Clone)]
pub enum BookingError {
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    UnsupportedResource {
        warehouse_id: Uuid,
        resource_type: ResourceType,
    },
    QuantityOutOfRange {
        quantity: Decimal,
        min: Decimal,
        max: Decimal,
    },
    InsufficientCapacity {
        requested: Decimal,
        available: Decimal,
    },
    Configuration {
        message: String,
    },
    DataAccess {
        message: String,
    },
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::InvalidRange { start, end } => {
                write!(f, "Invalid date range: [{}, {})", start, end)
            }
            BookingError::UnsupportedResource {
                warehouse_id,
                resource_type,
            } => {
                write!(
                    f,
                    "Warehouse {} does not offer resource type '{}'",
                    warehouse_id, resource_type
                )
            }
            BookingError::QuantityOutOfRange { quantity, min, max } => {
                write!(
                    f,
                    "Quantity {} outside orderable range [{}, {}]",
                    quantity, min, max
                )
            }
            BookingError::InsufficientCapacity {
                requested,
                available,
            } => {
                write!(
                    f,
                    "Insufficient capacity: requested {}, available {}",
                    requested, available
                )
            }
            BookingError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BookingError::DataAccess { message } => {
                write!(f, "Data access error: {}", message)
            }
        }
    }
}

impl std::error::Error for BookingError {}

/// Load the pricing schedule for a warehouse/resource pair, cache first.
///
/// Schedule existence is what makes a resource dimension sellable, so a
/// missing schedule is an unsupported-resource error, not an empty default.
async fn load_schedule(
    store: &dyn BookingStore,
    cache: &AppCache,
    warehouse_id: Uuid,
    resource_type: ResourceType,
) -> Result<Arc<PricingSchedule>, BookingError> {
    let cache_key = AppCache::schedule_key(warehouse_id, resource_type);

    if let Some(cached) = cache.schedules.get(&cache_key).await {
        tracing::debug!("schedule cache HIT for {}", cache_key);
        return Ok(cached);
    }

    tracing::debug!("schedule cache MISS for {}", cache_key);
    let schedule = store
        .pricing_schedule(warehouse_id, resource_type)
        .await?
        .ok_or(BookingError::UnsupportedResource {
            warehouse_id,
            resource_type,
        })?;

    let schedule = Arc::new(schedule);
    cache.schedules.insert(cache_key, schedule.clone()).await;

    Ok(schedule)
}

/// Compute remaining capacity for a warehouse/resource/date-range query.
///
/// Occupied capacity is the conservative sum of every occupancy-counting
/// booking that overlaps the half-open query window. The result is advisory:
/// a snapshot, not a reservation.
pub async fn calculate_availability(
    store: &dyn BookingStore,
    cache: &AppCache,
    warehouse_id: Uuid,
    resource_type: ResourceType,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<AvailabilityResult, BookingError> {
    if start_date >= end_date {
        return Err(BookingError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }

    // The dimension must both be sellable (schedule exists) and have capacity.
    load_schedule(store, cache, warehouse_id, resource_type).await?;

    let total_capacity = store
        .warehouse_capacity(warehouse_id, resource_type)
        .await?
        .ok_or(BookingError::UnsupportedResource {
            warehouse_id,
            resource_type,
        })?;

    let windows = store
        .overlapping_bookings(warehouse_id, resource_type, start_date, end_date)
        .await?;

    calculators::calculate_availability_from(total_capacity, &windows, start_date, end_date)
}

/// Produce a deterministic price quote for a prospective booking.
///
/// The membership discount percent is resolved from the customer's tier when
/// a customer is given; anonymous quotes price at 0%.
pub async fn quote_price(
    store: &dyn BookingStore,
    cache: &AppCache,
    warehouse_id: Uuid,
    resource_type: ResourceType,
    quantity: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    customer_id: Option<Uuid>,
) -> Result<PricingBreakdown, BookingError> {
    if start_date >= end_date {
        return Err(BookingError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }

    let schedule = load_schedule(store, cache, warehouse_id, resource_type).await?;

    let membership_percent = match customer_id {
        Some(customer_id) => store.membership_discount_percent(customer_id).await?,
        None => Decimal::ZERO,
    };

    calculators::calculate_price(
        &schedule,
        quantity,
        start_date,
        end_date,
        membership_percent,
    )
}

/// Admit a booking: check availability, price it, persist it.
///
/// The availability check here can race a concurrent admission, so
/// [`BookingStore::create_booking`] re-validates capacity at commit time
/// under a per-warehouse-per-resource lock; the later writer of two
/// conflicting requests is rejected there.
pub async fn admit_booking(
    store: &dyn BookingStore,
    cache: &AppCache,
    booking: NewBooking,
) -> Result<BookingReceipt, BookingError> {
    let availability = calculate_availability(
        store,
        cache,
        booking.warehouse_id,
        booking.resource_type,
        booking.start_date,
        booking.end_date,
    )
    .await?;

    if booking.quantity > availability.available_capacity {
        return Err(BookingError::InsufficientCapacity {
            requested: booking.quantity,
            available: availability.available_capacity,
        });
    }

    let breakdown = quote_price(
        store,
        cache,
        booking.warehouse_id,
        booking.resource_type,
        booking.quantity,
        booking.start_date,
        booking.end_date,
        Some(booking.customer_id),
    )
    .await?;

    let booking_id = store.create_booking(&booking).await?;

    tracing::info!(
        booking_id = %booking_id,
        warehouse_id = %booking.warehouse_id,
        resource_type = %booking.resource_type,
        quantity = %booking.quantity,
        total = %breakdown.total,
        "booking admitted"
    );

    Ok(BookingReceipt {
        booking_id,
        status: BookingStatus::Confirmed,
        breakdown,
    })
}
