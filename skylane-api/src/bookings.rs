use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skylane_booking::models::{Booking, BookingStatus, PaymentMethod};
use skylane_booking::service::{PurchaseOutcome, PurchaseRequest};

use crate::error::AppError;
use crate::middleware::auth::GatewayUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/my-bookings", get(my_bookings))
        .route("/bookings/{id}", delete(cancel_booking))
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub number_of_seats: i32,
    #[serde(default)]
    pub use_miles: bool,
    #[serde(default)]
    pub miles_amount: Decimal,
    #[serde(default)]
    pub become_member: bool,
}

#[derive(Debug, Serialize)]
struct BookingSummaryResponse {
    id: Uuid,
    booking_reference: String,
    flight_id: Uuid,
    flight_number: String,
    number_of_seats: i32,
    total_price: Decimal,
    status: BookingStatus,
    payment_method: PaymentMethod,
    miles_used: Decimal,
    cash_amount: Decimal,
    remaining_miles: Option<Decimal>,
}

impl From<PurchaseOutcome> for BookingSummaryResponse {
    fn from(outcome: PurchaseOutcome) -> Self {
        Self {
            id: outcome.booking.id,
            booking_reference: outcome.booking.booking_reference,
            flight_id: outcome.booking.flight_id,
            flight_number: outcome.flight_number,
            number_of_seats: outcome.booking.number_of_seats,
            total_price: outcome.booking.total_price,
            status: outcome.booking.status,
            payment_method: outcome.booking.payment_method,
            miles_used: outcome.booking.miles_used,
            cash_amount: outcome.booking.cash_amount,
            remaining_miles: outcome.remaining_miles,
        }
    }
}

/// POST /bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingSummaryResponse>), AppError> {
    if req.number_of_seats < 1 {
        return Err(AppError::Validation(
            "number_of_seats must be at least 1".to_string(),
        ));
    }

    state.sync_user(&user).await?;

    let outcome = state
        .booking
        .purchase(PurchaseRequest {
            user_id: user.id,
            flight_id: req.flight_id,
            number_of_seats: req.number_of_seats,
            use_miles: req.use_miles,
            miles_amount: req.miles_amount,
            become_member: req.become_member,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// GET /bookings/my-bookings
async fn my_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.booking.bookings_for_user(user.id).await?;
    Ok(Json(bookings))
}

#[derive(Debug, Serialize)]
struct CancellationResponse {
    booking: Booking,
    miles_refunded: Decimal,
}

/// DELETE /bookings/{id}
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationResponse>, AppError> {
    let outcome = state.booking.cancel(id, user.id).await?;
    Ok(Json(CancellationResponse {
        booking: outcome.booking,
        miles_refunded: outcome.miles_refunded,
    }))
}
