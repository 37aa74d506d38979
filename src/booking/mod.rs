//! Booking module for the Stowhouse marketplace.
//!
//! Capacity-aware admission and deterministic pricing for warehouse storage
//! bookings. The calculators are pure; data arrives through the
//! [`store::BookingStore`] interface and leaves through the JSON routes.

pub mod calculators;
pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod store;

// Re-export commonly used items
pub use calculators::{round_money, AvailabilityResult, PricingBreakdown};
pub use routes::router;
pub use services::{BookingError, BookingReceipt};
pub use store::{BookingStore, PgStore};
