//! Core capacity and pricing calculation functions.
//!
//! Pure functions for availability and pricing math - no database access.
//! Everything here is a deterministic function of its arguments, so a quote
//! can be re-derived line by line from the stored inputs.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use super::models::{BillingUnit, BookingWindow, PricingSchedule, VolumeTier};
use super::services::BookingError;

/// Days per billing month. Period counts are normalized through this single
/// constant so quote-time and invoice-time math cannot drift apart.
const DAYS_PER_MONTH: i64 = 30;

/// Days per billing year.
const DAYS_PER_YEAR: i64 = 365;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use stowhouse_web::booking::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Half-open interval overlap test: `[a_start, a_end)` against `[b_start, b_end)`.
///
/// A booking ending on day D and another starting on day D do not overlap.
pub fn intervals_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Occupied capacity for a query window: the sum of quantities of every
/// booking whose interval overlaps the window at all.
///
/// This is the peak-conservative figure: a booking that only partially
/// overlaps the window counts in full, so the result can overstate occupancy
/// for a given day but never understates it. Availability derived from it
/// never promises capacity that does not exist.
pub fn occupied_capacity(windows: &[BookingWindow], start: NaiveDate, end: NaiveDate) -> Decimal {
    windows
        .iter()
        .filter(|w| intervals_overlap(w.start_date, w.end_date, start, end))
        .map(|w| w.quantity)
        .sum()
}

/// Remaining capacity, floored at zero.
pub fn available_capacity(total: Decimal, occupied: Decimal) -> Decimal {
    (total - occupied).max(Decimal::ZERO)
}

/// Result of an availability query.
///
/// A snapshot of the booking set at query time, not a reservation: a
/// concurrent admission can invalidate it. The admission path re-validates
/// capacity at commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityResult {
    pub total_capacity: Decimal,
    pub occupied_capacity: Decimal,
    pub available_capacity: Decimal,
}

/// Compute availability for a query window from a fetched booking set.
pub fn calculate_availability_from(
    total_capacity: Decimal,
    windows: &[BookingWindow],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<AvailabilityResult, BookingError> {
    if start >= end {
        return Err(BookingError::InvalidRange { start, end });
    }

    let occupied = occupied_capacity(windows, start, end);

    Ok(AvailabilityResult {
        total_capacity,
        occupied_capacity: occupied,
        available_capacity: available_capacity(total_capacity, occupied),
    })
}

/// Number of billing periods between two dates for a billing unit.
///
/// - `per_month`: whole months as `ceil(days / 30)`, minimum 1, so a partial
///   month bills as a full month.
/// - `per_year`: the year fraction `days / 365` computed directly, without
///   rounding through months first.
pub fn billing_periods(
    unit: BillingUnit,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, BookingError> {
    if start >= end {
        return Err(BookingError::InvalidRange { start, end });
    }

    let days = (end - start).num_days();

    let periods = match unit {
        BillingUnit::PerMonth => {
            let months = ((days + DAYS_PER_MONTH - 1) / DAYS_PER_MONTH).max(1);
            Decimal::from(months)
        }
        BillingUnit::PerYear => Decimal::from(days) / Decimal::from(DAYS_PER_YEAR),
    };

    Ok(periods)
}

/// Resolve the volume discount percent for a quantity.
///
/// Tiers are scanned from the highest threshold down; the first threshold
/// less than or equal to the quantity wins. Non-cumulative, and inclusive at
/// the exact boundary (quantity == threshold qualifies).
pub fn resolve_volume_discount(tiers: &[VolumeTier], quantity: Decimal) -> Decimal {
    let mut sorted: Vec<&VolumeTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| b.min_quantity.cmp(&a.min_quantity));

    sorted
        .iter()
        .find(|tier| tier.min_quantity <= quantity)
        .map(|tier| tier.percent)
        .unwrap_or(Decimal::ZERO)
}

/// Line-item price breakdown for a prospective booking.
///
/// Intermediate amounts are exact decimals; only `total` is rounded, once,
/// to currency precision. Every field is traceable to an input, so an
/// invoice can be rendered without recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingBreakdown {
    pub unit_price: Decimal,
    pub currency: String,
    pub billing_unit: BillingUnit,
    pub period_count: Decimal,
    pub quantity: Decimal,
    pub base_amount: Decimal,
    pub volume_discount_percent: Decimal,
    pub volume_discount_amount: Decimal,
    pub amount_after_volume: Decimal,
    pub membership_discount_percent: Decimal,
    pub membership_discount_amount: Decimal,
    pub total: Decimal,
}

/// Calculate the deterministic price of a booking.
///
/// The volume discount applies to the base amount; the membership discount
/// compounds on top of the volume-discounted amount, never on the raw base.
/// That ordering is a pricing-visible business rule.
pub fn calculate_price(
    schedule: &PricingSchedule,
    quantity: Decimal,
    start: NaiveDate,
    end: NaiveDate,
    membership_percent: Decimal,
) -> Result<PricingBreakdown, BookingError> {
    validate_schedule(schedule)?;

    if membership_percent < Decimal::ZERO || membership_percent > Decimal::ONE_HUNDRED {
        return Err(BookingError::Configuration {
            message: format!("membership discount percent out of range: {}", membership_percent),
        });
    }

    if quantity < schedule.min_quantity || quantity > schedule.max_quantity {
        return Err(BookingError::QuantityOutOfRange {
            quantity,
            min: schedule.min_quantity,
            max: schedule.max_quantity,
        });
    }

    let period_count = billing_periods(schedule.billing_unit, start, end)?;

    let base_amount = quantity * schedule.base_price * period_count;

    let volume_discount_percent = resolve_volume_discount(&schedule.volume_discounts, quantity);
    let volume_discount_amount = base_amount * volume_discount_percent / Decimal::ONE_HUNDRED;
    let amount_after_volume = base_amount - volume_discount_amount;

    let membership_discount_amount =
        amount_after_volume * membership_percent / Decimal::ONE_HUNDRED;

    let total = round_money(
        (amount_after_volume - membership_discount_amount).max(Decimal::ZERO),
        2,
    );

    Ok(PricingBreakdown {
        unit_price: schedule.base_price,
        currency: schedule.currency.clone(),
        billing_unit: schedule.billing_unit,
        period_count,
        quantity,
        base_amount,
        volume_discount_percent,
        volume_discount_amount,
        amount_after_volume,
        membership_discount_percent: membership_percent,
        membership_discount_amount,
        total,
    })
}

/// Reject malformed schedule data instead of pricing with it.
///
/// A missing or bad schedule must surface as a configuration error, not
/// default to zero and masquerade as a pricing bug.
fn validate_schedule(schedule: &PricingSchedule) -> Result<(), BookingError> {
    if schedule.base_price < Decimal::ZERO {
        return Err(BookingError::Configuration {
            message: format!("schedule {}: negative base price", schedule.id),
        });
    }
    if schedule.min_quantity < Decimal::ZERO || schedule.max_quantity < schedule.min_quantity {
        return Err(BookingError::Configuration {
            message: format!(
                "schedule {}: invalid quantity bounds [{}, {}]",
                schedule.id, schedule.min_quantity, schedule.max_quantity
            ),
        });
    }
    for tier in &schedule.volume_discounts {
        if tier.percent < Decimal::ZERO || tier.percent > Decimal::ONE_HUNDRED {
            return Err(BookingError::Configuration {
                message: format!(
                    "schedule {}: volume discount percent out of range: {}",
                    schedule.id, tier.percent
                ),
            });
        }
        if tier.min_quantity < Decimal::ZERO {
            return Err(BookingError::Configuration {
                message: format!(
                    "schedule {}: negative volume threshold: {}",
                    schedule.id, tier.min_quantity
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::models::ResourceType;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(quantity: Decimal, start: NaiveDate, end: NaiveDate) -> BookingWindow {
        BookingWindow {
            quantity,
            start_date: start,
            end_date: end,
        }
    }

    fn pallet_schedule() -> PricingSchedule {
        PricingSchedule {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            resource_type: ResourceType::Pallet,
            base_price: dec!(10),
            currency: "USD".to_string(),
            billing_unit: BillingUnit::PerMonth,
            min_quantity: dec!(1),
            max_quantity: dec!(500),
            volume_discounts: vec![
                VolumeTier {
                    min_quantity: dec!(50),
                    percent: dec!(10),
                },
                VolumeTier {
                    min_quantity: dec!(100),
                    percent: dec!(15),
                },
            ],
        }
    }

    // ==================== round_money tests ====================

    #[test]
    fn test_round_money_bankers_rounding_to_even() {
        assert_eq!(round_money(dec!(2.5), 0), dec!(2)); // rounds down to even
        assert_eq!(round_money(dec!(3.5), 0), dec!(4)); // rounds up to even
        assert_eq!(round_money(dec!(2.125), 2), dec!(2.12));
        assert_eq!(round_money(dec!(2.135), 2), dec!(2.14));
    }

    #[test]
    fn test_round_money_normal_rounding() {
        assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
        assert_eq!(round_money(dec!(1.236), 2), dec!(1.24));
        assert_eq!(round_money(dec!(641.249), 2), dec!(641.25));
    }

    // ==================== interval overlap tests ====================

    #[test]
    fn test_half_open_overlap() {
        let (a, b) = (date(2024, 6, 1), date(2024, 7, 1));
        // Identical intervals overlap
        assert!(intervals_overlap(a, b, a, b));
        // Contained interval overlaps
        assert!(intervals_overlap(a, b, date(2024, 6, 10), date(2024, 6, 20)));
        // Partial overlap on either edge
        assert!(intervals_overlap(a, b, date(2024, 5, 20), date(2024, 6, 2)));
        assert!(intervals_overlap(a, b, date(2024, 6, 30), date(2024, 7, 15)));
    }

    #[test]
    fn test_boundary_date_does_not_overlap() {
        // A booking ending on day D and one starting on day D are disjoint.
        let d = date(2024, 7, 1);
        assert!(!intervals_overlap(date(2024, 6, 1), d, d, date(2024, 8, 1)));
        assert!(!intervals_overlap(d, date(2024, 8, 1), date(2024, 6, 1), d));
    }

    // ==================== occupancy tests ====================

    #[test]
    fn test_occupied_capacity_mid_range_query() {
        // Existing booking of 60 pallets for all of June; query a mid-June slice.
        let windows = vec![window(dec!(60), date(2024, 6, 1), date(2024, 7, 1))];
        let occupied = occupied_capacity(&windows, date(2024, 6, 15), date(2024, 6, 20));
        assert_eq!(occupied, dec!(60));
    }

    #[test]
    fn test_occupied_capacity_query_before_all_bookings() {
        let windows = vec![window(dec!(60), date(2024, 6, 1), date(2024, 7, 1))];
        let occupied = occupied_capacity(&windows, date(2024, 4, 1), date(2024, 5, 1));
        assert_eq!(occupied, dec!(0));
    }

    #[test]
    fn test_occupied_capacity_is_conservative_sum() {
        // Two bookings that overlap the query only partially still count in full.
        let windows = vec![
            window(dec!(30), date(2024, 6, 1), date(2024, 6, 10)),
            window(dec!(40), date(2024, 6, 20), date(2024, 7, 1)),
        ];
        let occupied = occupied_capacity(&windows, date(2024, 6, 5), date(2024, 6, 25));
        assert_eq!(occupied, dec!(70));
    }

    #[test]
    fn test_availability_scenario_sixty_of_hundred() {
        let windows = vec![window(dec!(60), date(2024, 6, 1), date(2024, 7, 1))];
        let result = calculate_availability_from(
            dec!(100),
            &windows,
            date(2024, 6, 15),
            date(2024, 6, 20),
        )
        .unwrap();

        assert_eq!(result.occupied_capacity, dec!(60));
        assert_eq!(result.available_capacity, dec!(40));
        assert_eq!(result.total_capacity, dec!(100));
    }

    #[test]
    fn test_availability_never_negative() {
        let windows = vec![
            window(dec!(80), date(2024, 6, 1), date(2024, 6, 10)),
            window(dec!(80), date(2024, 6, 15), date(2024, 6, 25)),
        ];
        let result = calculate_availability_from(
            dec!(100),
            &windows,
            date(2024, 6, 1),
            date(2024, 7, 1),
        )
        .unwrap();

        assert_eq!(result.occupied_capacity, dec!(160));
        assert_eq!(result.available_capacity, dec!(0));
    }

    #[test]
    fn test_availability_rejects_inverted_range() {
        let err = calculate_availability_from(dec!(100), &[], date(2024, 6, 20), date(2024, 6, 15))
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRange { .. }));

        // Empty range (start == end) is also invalid
        let err = calculate_availability_from(dec!(100), &[], date(2024, 6, 15), date(2024, 6, 15))
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidRange { .. }));
    }

    // ==================== billing period tests ====================

    #[test]
    fn test_monthly_periods_round_up() {
        let start = date(2024, 6, 1);
        assert_eq!(
            billing_periods(BillingUnit::PerMonth, start, date(2024, 6, 2)).unwrap(),
            dec!(1)
        );
        // Exactly 30 days is one month
        assert_eq!(
            billing_periods(BillingUnit::PerMonth, start, date(2024, 7, 1)).unwrap(),
            dec!(1)
        );
        // 31 days spills into a second month
        assert_eq!(
            billing_periods(BillingUnit::PerMonth, start, date(2024, 7, 2)).unwrap(),
            dec!(2)
        );
        // 90 days is exactly three months
        assert_eq!(
            billing_periods(BillingUnit::PerMonth, start, date(2024, 8, 30)).unwrap(),
            dec!(3)
        );
    }

    #[test]
    fn test_yearly_periods_are_exact_fractions() {
        let start = date(2024, 6, 1);
        // 365 days is exactly one year
        assert_eq!(
            billing_periods(BillingUnit::PerYear, start, date(2025, 6, 1)).unwrap(),
            dec!(1)
        );
        // 73 days is exactly a fifth of a billing year
        assert_eq!(
            billing_periods(BillingUnit::PerYear, start, date(2024, 8, 13)).unwrap(),
            dec!(0.2)
        );
    }

    #[test]
    fn test_billing_periods_reject_empty_range() {
        let d = date(2024, 6, 1);
        assert!(billing_periods(BillingUnit::PerMonth, d, d).is_err());
        assert!(billing_periods(BillingUnit::PerYear, d, date(2024, 5, 1)).is_err());
    }

    // ==================== volume discount tests ====================

    #[test]
    fn test_volume_discount_highest_qualifying_tier_wins() {
        let tiers = pallet_schedule().volume_discounts;
        assert_eq!(resolve_volume_discount(&tiers, dec!(10)), dec!(0));
        assert_eq!(resolve_volume_discount(&tiers, dec!(75)), dec!(10));
        assert_eq!(resolve_volume_discount(&tiers, dec!(150)), dec!(15));
    }

    #[test]
    fn test_volume_discount_boundary_is_inclusive() {
        let tiers = pallet_schedule().volume_discounts;
        assert_eq!(resolve_volume_discount(&tiers, dec!(50)), dec!(10));
        assert_eq!(resolve_volume_discount(&tiers, dec!(100)), dec!(15));
        assert_eq!(resolve_volume_discount(&tiers, dec!(49)), dec!(0));
    }

    #[test]
    fn test_volume_discount_monotonically_non_decreasing() {
        let tiers = pallet_schedule().volume_discounts;
        let mut last = Decimal::ZERO;
        for q in 1..=200 {
            let percent = resolve_volume_discount(&tiers, Decimal::from(q));
            assert!(
                percent >= last,
                "discount decreased from {} to {} at quantity {}",
                last,
                percent,
                q
            );
            last = percent;
        }
    }

    #[test]
    fn test_volume_discount_unsorted_input() {
        // Resolution sorts internally; tier order in the schedule is irrelevant.
        let tiers = vec![
            VolumeTier {
                min_quantity: dec!(100),
                percent: dec!(15),
            },
            VolumeTier {
                min_quantity: dec!(50),
                percent: dec!(10),
            },
        ];
        assert_eq!(resolve_volume_discount(&tiers, dec!(120)), dec!(15));
        assert_eq!(resolve_volume_discount(&tiers, dec!(60)), dec!(10));
    }

    #[test]
    fn test_volume_discount_no_tiers() {
        assert_eq!(resolve_volume_discount(&[], dec!(1000)), dec!(0));
    }

    // ==================== calculate_price tests ====================

    #[test]
    fn test_price_scenario_75_pallets_one_month() {
        // $10/pallet/month, tiers {50: 10%, 100: 15%}, 75 pallets, 1 month, 5% membership
        let schedule = pallet_schedule();
        let breakdown = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(5),
        )
        .unwrap();

        assert_eq!(breakdown.period_count, dec!(1));
        assert_eq!(breakdown.base_amount, dec!(750));
        assert_eq!(breakdown.volume_discount_percent, dec!(10));
        assert_eq!(breakdown.volume_discount_amount, dec!(75));
        assert_eq!(breakdown.amount_after_volume, dec!(675));
        assert_eq!(breakdown.membership_discount_amount, dec!(33.75));
        assert_eq!(breakdown.total, dec!(641.25));
    }

    #[test]
    fn test_membership_discount_compounds_over_volume() {
        // 10% volume then 10% membership is NOT a flat 20% off the base.
        let mut schedule = pallet_schedule();
        schedule.volume_discounts = vec![VolumeTier {
            min_quantity: dec!(50),
            percent: dec!(10),
        }];

        let breakdown = calculate_price(
            &schedule,
            dec!(100),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(10),
        )
        .unwrap();

        let base = breakdown.base_amount;
        let additive = base * (Decimal::ONE - dec!(0.10) - dec!(0.10));
        let compounded = base * (Decimal::ONE - dec!(0.10)) * (Decimal::ONE - dec!(0.10));

        assert_eq!(breakdown.total, compounded);
        assert_ne!(breakdown.total, additive);
        // Membership was taken from the volume-discounted amount, not the base.
        assert_eq!(
            breakdown.membership_discount_amount,
            breakdown.amount_after_volume * dec!(10) / dec!(100)
        );
    }

    #[test]
    fn test_price_quantity_below_minimum() {
        let mut schedule = pallet_schedule();
        schedule.min_quantity = dec!(5);

        let err = calculate_price(
            &schedule,
            dec!(2),
            date(2024, 6, 1),
            date(2024, 7, 1),
            Decimal::ZERO,
        )
        .unwrap_err();

        assert!(matches!(err, BookingError::QuantityOutOfRange { .. }));
    }

    #[test]
    fn test_price_quantity_bounds_inclusive() {
        let mut schedule = pallet_schedule();
        schedule.min_quantity = dec!(5);
        schedule.max_quantity = dec!(200);

        let (start, end) = (date(2024, 6, 1), date(2024, 7, 1));
        assert!(calculate_price(&schedule, dec!(5), start, end, Decimal::ZERO).is_ok());
        assert!(calculate_price(&schedule, dec!(200), start, end, Decimal::ZERO).is_ok());
        assert!(calculate_price(&schedule, dec!(201), start, end, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_price_yearly_billing_uses_year_fraction() {
        let mut schedule = pallet_schedule();
        schedule.billing_unit = BillingUnit::PerYear;
        schedule.base_price = dec!(73);
        schedule.volume_discounts = vec![];

        // 73 days = 0.2 of a billing year; 10 pallets * $73/yr * 0.2 = $146
        let breakdown = calculate_price(
            &schedule,
            dec!(10),
            date(2024, 6, 1),
            date(2024, 8, 13),
            Decimal::ZERO,
        )
        .unwrap();

        assert_eq!(breakdown.period_count, dec!(0.2));
        assert_eq!(breakdown.base_amount, dec!(146));
        assert_eq!(breakdown.total, dec!(146.00));
    }

    #[test]
    fn test_price_total_floors_at_zero() {
        let mut schedule = pallet_schedule();
        schedule.volume_discounts = vec![VolumeTier {
            min_quantity: dec!(1),
            percent: dec!(100),
        }];

        let breakdown = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(100),
        )
        .unwrap();

        assert_eq!(breakdown.total, dec!(0.00));
    }

    #[test]
    fn test_price_is_deterministic() {
        let schedule = pallet_schedule();
        let a = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(5),
        )
        .unwrap();
        let b = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(5),
        )
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_price_rejects_malformed_schedule() {
        let mut schedule = pallet_schedule();
        schedule.volume_discounts = vec![VolumeTier {
            min_quantity: dec!(50),
            percent: dec!(140),
        }];

        let err = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, BookingError::Configuration { .. }));

        let mut schedule = pallet_schedule();
        schedule.min_quantity = dec!(100);
        schedule.max_quantity = dec!(10);
        let err = calculate_price(
            &schedule,
            dec!(50),
            date(2024, 6, 1),
            date(2024, 7, 1),
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, BookingError::Configuration { .. }));
    }

    #[test]
    fn test_price_rejects_out_of_range_membership() {
        let schedule = pallet_schedule();
        let err = calculate_price(
            &schedule,
            dec!(75),
            date(2024, 6, 1),
            date(2024, 7, 1),
            dec!(101),
        )
        .unwrap_err();
        assert!(matches!(err, BookingError::Configuration { .. }));
    }
}
