//! Database queries for the booking core.
//!
//! The schema belongs to the platform; this service reads it and performs
//! the single booking insert at admission. Query functions are generic over
//! the executor so the admission transaction can reuse them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppError;

use super::models::{BookingWindow, NewBooking, PricingScheduleRow, ResourceType, Warehouse};

/// Get a warehouse by id
pub async fn get_warehouse<'e, E>(
    executor: E,
    warehouse_id: Uuid,
) -> Result<Option<Warehouse>, AppError>
where
    E: PgExecutor<'e>,
{
    let warehouse = sqlx::query_as::<_, Warehouse>(
        r#"
        SELECT id, name, pallet_capacity, area_capacity_sqft, deleted_at
        FROM warehouses
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(warehouse_id)
    .fetch_optional(executor)
    .await?;

    Ok(warehouse)
}

/// Occupancy-counting bookings overlapping a half-open query window.
///
/// Overlap is `start_date < $4 AND end_date > $3`, so a booking ending on
/// the query start date is excluded. The status list must stay in lockstep
/// with `BookingStatus::occupies_capacity`.
pub async fn get_overlapping_bookings<'e, E>(
    executor: E,
    warehouse_id: Uuid,
    resource_type: ResourceType,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<BookingWindow>, AppError>
where
    E: PgExecutor<'e>,
{
    let windows = sqlx::query_as::<_, BookingWindow>(
        r#"
        SELECT quantity, start_date, end_date
        FROM bookings
        WHERE warehouse_id = $1
          AND resource_type = $2
          AND status IN ('confirmed', 'active')
          AND start_date < $4
          AND end_date > $3
        "#,
    )
    .bind(warehouse_id)
    .bind(resource_type.as_str())
    .bind(start_date)
    .bind(end_date)
    .fetch_all(executor)
    .await?;

    Ok(windows)
}

/// Summed quantity of occupancy-counting bookings overlapping a window.
///
/// Same overlap and status predicate as [`get_overlapping_bookings`]; used
/// inside the admission transaction where only the total matters.
pub async fn sum_overlapping_quantity<'e, E>(
    executor: E,
    warehouse_id: Uuid,
    resource_type: ResourceType,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Decimal, AppError>
where
    E: PgExecutor<'e>,
{
    let occupied = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(quantity), 0::numeric)
        FROM bookings
        WHERE warehouse_id = $1
          AND resource_type = $2
          AND status IN ('confirmed', 'active')
          AND start_date < $4
          AND end_date > $3
        "#,
    )
    .bind(warehouse_id)
    .bind(resource_type.as_str())
    .bind(start_date)
    .bind(end_date)
    .fetch_one(executor)
    .await?;

    Ok(occupied)
}

/// Get the active pricing schedule for a warehouse/resource pair
pub async fn get_pricing_schedule<'e, E>(
    executor: E,
    warehouse_id: Uuid,
    resource_type: ResourceType,
) -> Result<Option<PricingScheduleRow>, AppError>
where
    E: PgExecutor<'e>,
{
    let schedule = sqlx::query_as::<_, PricingScheduleRow>(
        r#"
        SELECT
            id, warehouse_id, resource_type, base_price, currency,
            billing_unit, min_quantity, max_quantity, volume_discounts
        FROM pricing_schedules
        WHERE warehouse_id = $1
          AND resource_type = $2
          AND active = true
        "#,
    )
    .bind(warehouse_id)
    .bind(resource_type.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(schedule)
}

/// Get all active pricing schedules (for cache warming)
pub async fn get_active_pricing_schedules<'e, E>(
    executor: E,
) -> Result<Vec<PricingScheduleRow>, AppError>
where
    E: PgExecutor<'e>,
{
    let schedules = sqlx::query_as::<_, PricingScheduleRow>(
        r#"
        SELECT
            id, warehouse_id, resource_type, base_price, currency,
            billing_unit, min_quantity, max_quantity, volume_discounts
        FROM pricing_schedules
        WHERE active = true
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(schedules)
}

/// Membership discount percent for a customer, if they have an active tier
pub async fn get_membership_discount_percent<'e, E>(
    executor: E,
    customer_id: Uuid,
) -> Result<Option<Decimal>, AppError>
where
    E: PgExecutor<'e>,
{
    let percent = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT t.discount_percent
        FROM memberships m
        JOIN membership_tiers t ON t.id = m.tier_id
        WHERE m.customer_id = $1
          AND m.active = true
        ORDER BY t.discount_percent DESC
        LIMIT 1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(executor)
    .await?;

    Ok(percent)
}

/// Take the per-warehouse-per-resource admission lock for the current
/// transaction. Released automatically at commit or rollback.
pub async fn acquire_admission_lock<'e, E>(executor: E, key: i64) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(executor)
        .await?;

    Ok(())
}

/// Insert a confirmed booking and return its id
pub async fn insert_booking<'e, E>(executor: E, booking: &NewBooking) -> Result<Uuid, AppError>
where
    E: PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO bookings
            (id, warehouse_id, customer_id, resource_type, quantity,
             start_date, end_date, status)
        VALUES
            (gen_random_uuid(), $1, $2, $3, $4, $5, $6, 'confirmed')
        RETURNING id
        "#,
    )
    .bind(booking.warehouse_id)
    .bind(booking.customer_id)
    .bind(booking.resource_type.as_str())
    .bind(booking.quantity)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .fetch_one(executor)
    .await?;

    Ok(id)
}
