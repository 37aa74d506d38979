//! Booking API route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::cache::CacheStats;
use crate::error::Result;
use crate::AppState;

use super::models::NewBooking;
use super::requests::{AvailabilityRequest, CreateBookingRequest, QuoteRequest};
use super::responses::{AvailabilityResponse, BookingResponse, PricingBreakdownResponse};
use super::services;
use super::store::PgStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability", post(availability))
        .route("/quote", post(quote))
        .route("/bookings", post(create_booking))
        .route("/cache/stats", get(cache_stats))
}

/// Remaining capacity for a warehouse/resource/date-range query
async fn availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>> {
    let store = PgStore::new(state.db.clone());

    let result = services::calculate_availability(
        &store,
        &state.cache,
        request.warehouse_id,
        request.resource_type,
        request.start_date,
        request.end_date,
    )
    .await?;

    Ok(Json(AvailabilityResponse::from_result(
        request.warehouse_id,
        request.resource_type,
        request.start_date,
        request.end_date,
        result,
    )))
}

/// Deterministic price quote for a prospective booking
async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<PricingBreakdownResponse>> {
    let store = PgStore::new(state.db.clone());

    let breakdown = services::quote_price(
        &store,
        &state.cache,
        request.warehouse_id,
        request.resource_type,
        request.quantity,
        request.start_date,
        request.end_date,
        request.customer_id,
    )
    .await?;

    Ok(Json(breakdown.into()))
}

/// Admit and persist a booking
async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>)> {
    let store = PgStore::new(state.db.clone());

    let receipt = services::admit_booking(
        &store,
        &state.cache,
        NewBooking {
            warehouse_id: request.warehouse_id,
            customer_id: request.customer_id,
            resource_type: request.resource_type,
            quantity: request.quantity,
            start_date: request.start_date,
            end_date: request.end_date,
        },
    )
    .await?;

    let response = BookingResponse {
        booking_id: receipt.booking_id,
        status: receipt.status.to_string(),
        breakdown: receipt.breakdown.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Cache statistics for monitoring
async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}
