//! Response DTOs for booking API endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::calculators::{AvailabilityResult, PricingBreakdown};
use super::models::{BillingUnit, ResourceType};

/// Money value for JSON responses
#[derive(Debug, Clone, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// Response for an availability query
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub warehouse_id: Uuid,
    pub resource_type: ResourceType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_capacity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub occupied_capacity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub available_capacity: Decimal,
}

impl AvailabilityResponse {
    pub fn from_result(
        warehouse_id: Uuid,
        resource_type: ResourceType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        result: AvailabilityResult,
    ) -> Self {
        Self {
            warehouse_id,
            resource_type,
            start_date,
            end_date,
            total_capacity: result.total_capacity,
            occupied_capacity: result.occupied_capacity,
            available_capacity: result.available_capacity,
        }
    }
}

/// Line-item breakdown for a price quote
#[derive(Debug, Serialize)]
pub struct PricingBreakdownResponse {
    pub unit_price: MoneyResponse,
    pub billing_unit: BillingUnit,
    #[serde(with = "rust_decimal::serde::str")]
    pub period_count: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub base_amount: MoneyResponse,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume_discount_percent: Decimal,
    pub volume_discount_amount: MoneyResponse,
    pub amount_after_volume: MoneyResponse,
    #[serde(with = "rust_decimal::serde::str")]
    pub membership_discount_percent: Decimal,
    pub membership_discount_amount: MoneyResponse,
    pub total: MoneyResponse,
}

impl From<PricingBreakdown> for PricingBreakdownResponse {
    fn from(breakdown: PricingBreakdown) -> Self {
        let money = |amount: Decimal| MoneyResponse {
            amount,
            currency: breakdown.currency.clone(),
        };

        Self {
            unit_price: money(breakdown.unit_price),
            billing_unit: breakdown.billing_unit,
            period_count: breakdown.period_count,
            quantity: breakdown.quantity,
            base_amount: money(breakdown.base_amount),
            volume_discount_percent: breakdown.volume_discount_percent,
            volume_discount_amount: money(breakdown.volume_discount_amount),
            amount_after_volume: money(breakdown.amount_after_volume),
            membership_discount_percent: breakdown.membership_discount_percent,
            membership_discount_amount: money(breakdown.membership_discount_amount),
            total: money(breakdown.total),
        }
    }
}

/// Response for an admitted booking
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_id: Uuid,
    pub status: String,
    pub breakdown: PricingBreakdownResponse,
}

/// Generic booking error response
#[derive(Debug, Serialize)]
pub struct BookingErrorResponse {
    pub error_type: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn breakdown() -> PricingBreakdown {
        PricingBreakdown {
            unit_price: dec!(10),
            currency: "USD".to_string(),
            billing_unit: BillingUnit::PerMonth,
            period_count: dec!(1),
            quantity: dec!(75),
            base_amount: dec!(750),
            volume_discount_percent: dec!(10),
            volume_discount_amount: dec!(75),
            amount_after_volume: dec!(675),
            membership_discount_percent: dec!(5),
            membership_discount_amount: dec!(33.75),
            total: dec!(641.25),
        }
    }

    #[test]
    fn test_breakdown_serialization_is_byte_identical() {
        // Quoting twice with the same inputs must render the same receipt.
        let a = serde_json::to_string(&PricingBreakdownResponse::from(breakdown())).unwrap();
        let b = serde_json::to_string(&PricingBreakdownResponse::from(breakdown())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_breakdown_amounts_serialize_as_strings() {
        let json = serde_json::to_value(PricingBreakdownResponse::from(breakdown())).unwrap();
        assert_eq!(json["total"]["amount"], "641.25");
        assert_eq!(json["total"]["currency"], "USD");
        assert_eq!(json["billing_unit"], "per_month");
        assert_eq!(json["volume_discount_percent"], "10");
    }
}
