use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use skylane_booking::service::CompletionOutcome;
use skylane_catalog::flight::{Flight, FlightStatus};
use skylane_catalog::search::{FlightPage, FlightSearchQuery};
use skylane_core::airport::normalize_iata;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights/search", get(search_flights))
        .route("/flights/{id}", get(get_flight))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/flights", post(create_flight))
        .route("/admin/flights/{id}", put(update_flight).delete(delete_flight))
        .route("/admin/flights/{id}/complete", post(complete_flight))
}

/// GET /flights/search
async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<FlightSearchQuery>,
) -> Result<Json<FlightPage>, AppError> {
    let mut criteria = query.normalize();
    // Reject malformed IATA codes up front instead of searching for nothing.
    criteria.departure = normalize_iata(&criteria.departure)?;
    criteria.arrival = normalize_iata(&criteria.arrival)?;
    if let (Some(from), Some(to)) = (criteria.date_from, criteria.date_to) {
        if to < from {
            return Err(AppError::Validation(
                "date_to must not precede date_from".to_string(),
            ));
        }
    }

    let page = state
        .flights
        .search(&criteria)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(page))
}

/// GET /flights/{id}
async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Flight>, AppError> {
    let flight = state
        .flights
        .find(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("Flight not found: {}", id)))?;
    Ok(Json(flight))
}

#[derive(Debug, Deserialize)]
pub struct CreateFlightRequest {
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
}

/// POST /admin/flights
async fn create_flight(
    State(state): State<AppState>,
    Json(req): Json<CreateFlightRequest>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    if req.capacity < 1 {
        return Err(AppError::Validation("capacity must be positive".to_string()));
    }
    if req.price < Decimal::ZERO {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    if req.arrival_time <= req.departure_time {
        return Err(AppError::Validation(
            "arrival_time must be after departure_time".to_string(),
        ));
    }
    let flight_number = req.flight_number.trim().to_ascii_uppercase();
    if flight_number.is_empty() {
        return Err(AppError::Validation("flight_number is required".to_string()));
    }

    let flight = Flight::new(
        flight_number,
        normalize_iata(&req.departure_airport)?,
        normalize_iata(&req.arrival_airport)?,
        req.departure_time,
        req.arrival_time,
        req.capacity,
        req.price,
    );

    state.flights.create(&flight).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlightRequest {
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
    pub status: Option<FlightStatus>,
}

/// PUT /admin/flights/{id}
async fn update_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFlightRequest>,
) -> Result<Json<Flight>, AppError> {
    let mut flight = state
        .flights
        .find(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("Flight not found: {}", id)))?;

    if let Some(departure_airport) = req.departure_airport {
        flight.departure_airport = normalize_iata(&departure_airport)?;
    }
    if let Some(arrival_airport) = req.arrival_airport {
        flight.arrival_airport = normalize_iata(&arrival_airport)?;
    }
    if let Some(departure_time) = req.departure_time {
        flight.departure_time = departure_time;
    }
    if let Some(arrival_time) = req.arrival_time {
        flight.arrival_time = arrival_time;
    }
    if let Some(capacity) = req.capacity {
        // Shrinking below the sold seat count would break the counter bound.
        if capacity < flight.booked_seats {
            return Err(AppError::Validation(format!(
                "capacity {} is below the {} seats already booked",
                capacity, flight.booked_seats
            )));
        }
        flight.capacity = capacity;
    }
    if let Some(price) = req.price {
        if price < Decimal::ZERO {
            return Err(AppError::Validation("price must not be negative".to_string()));
        }
        flight.price = price;
    }
    if let Some(status) = req.status {
        flight.status = status;
    }
    if flight.arrival_time <= flight.departure_time {
        return Err(AppError::Validation(
            "arrival_time must be after departure_time".to_string(),
        ));
    }

    let updated = state
        .flights
        .update(&flight)
        .await
        .map_err(AppError::internal)?;
    if !updated {
        return Err(AppError::NotFound(format!("Flight not found: {}", id)));
    }
    Ok(Json(flight))
}

/// DELETE /admin/flights/{id}
async fn delete_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state
        .flights
        .delete(id)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::NotFound(format!("Flight not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/flights/{id}/complete
async fn complete_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletionOutcome>, AppError> {
    let outcome = state.booking.complete_flight(id).await?;
    Ok(Json(outcome))
}
