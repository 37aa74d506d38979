//! Database and domain models for booking queries.
//!
//! Row types use sqlx's FromRow derive for direct database deserialization.
//! The relational schema is owned by the platform; this service only reads
//! it, apart from the booking insert performed at admission.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Sellable capacity dimension of a warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pallet,
    Area,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Pallet => "pallet",
            ResourceType::Area => "area",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pallet" => Some(ResourceType::Pallet),
            "area" => Some(ResourceType::Area),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing unit of a pricing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    PerMonth,
    PerYear,
}

impl BillingUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingUnit::PerMonth => "per_month",
            BillingUnit::PerYear => "per_year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "per_month" => Some(BillingUnit::PerMonth),
            "per_year" => Some(BillingUnit::PerYear),
            _ => None,
        }
    }
}

impl fmt::Display for BillingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking lifecycle status.
///
/// Only `confirmed` and `active` bookings consume capacity; the rest are
/// invisible to availability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a booking in this status counts toward occupied capacity.
    pub fn occupies_capacity(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Active)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warehouse from the warehouses table.
#[derive(Debug, Clone, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub pallet_capacity: i64,
    pub area_capacity_sqft: Decimal,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Warehouse {
    /// Total capacity in the given dimension.
    pub fn capacity_for(&self, resource_type: ResourceType) -> Decimal {
        match resource_type {
            ResourceType::Pallet => Decimal::from(self.pallet_capacity),
            ResourceType::Area => self.area_capacity_sqft,
        }
    }
}

/// Quantity and half-open date interval of an occupancy-counting booking.
#[derive(Debug, Clone, FromRow)]
pub struct BookingWindow {
    pub quantity: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Volume discount tier: minimum qualifying quantity and percent off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    #[serde(with = "rust_decimal::serde::str")]
    pub min_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub percent: Decimal,
}

/// Pricing schedule row from the pricing_schedules table.
///
/// `resource_type`, `billing_unit`, and the JSONB tier list are decoded into
/// typed values by [`PricingScheduleRow::into_schedule`]; unknown values are
/// an error, never defaulted.
#[derive(Debug, Clone, FromRow)]
pub struct PricingScheduleRow {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub resource_type: String,
    pub base_price: Decimal,
    pub currency: String,
    pub billing_unit: String,
    pub min_quantity: Decimal,
    pub max_quantity: Decimal,
    pub volume_discounts: Json<Vec<VolumeTier>>,
}

impl PricingScheduleRow {
    pub fn into_schedule(self) -> Result<PricingSchedule, String> {
        let resource_type = ResourceType::parse(&self.resource_type)
            .ok_or_else(|| format!("schedule {}: unknown resource type '{}'", self.id, self.resource_type))?;
        let billing_unit = BillingUnit::parse(&self.billing_unit)
            .ok_or_else(|| format!("schedule {}: unknown billing unit '{}'", self.id, self.billing_unit))?;

        Ok(PricingSchedule {
            id: self.id,
            warehouse_id: self.warehouse_id,
            resource_type,
            base_price: self.base_price,
            currency: self.currency,
            billing_unit,
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            volume_discounts: self.volume_discounts.0,
        })
    }
}

/// Validated pricing schedule for one warehouse and resource type.
#[derive(Debug, Clone)]
pub struct PricingSchedule {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub resource_type: ResourceType,
    pub base_price: Decimal,
    pub currency: String,
    pub billing_unit: BillingUnit,
    pub min_quantity: Decimal,
    pub max_quantity: Decimal,
    pub volume_discounts: Vec<VolumeTier>,
}

/// Booking to persist on admission.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
    pub resource_type: ResourceType,
    pub quantity: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
