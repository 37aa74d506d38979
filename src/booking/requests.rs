//! Request DTOs for booking API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::models::ResourceType;

/// Request to calculate remaining capacity
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub warehouse_id: Uuid,
    pub resource_type: ResourceType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Request to quote a prospective booking
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub warehouse_id: Uuid,
    pub resource_type: ResourceType,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

/// Request to admit a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub warehouse_id: Uuid,
    pub customer_id: Uuid,
    pub resource_type: ResourceType,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
