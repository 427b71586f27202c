use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skylane_booking::BookingError;
use skylane_catalog::InventoryError;
use skylane_core::CoreError;
use skylane_loyalty::LoyaltyError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// Business-rule rejection with machine-readable context, e.g. requested
    /// versus available seats.
    BusinessRule {
        message: String,
        details: serde_json::Value,
    },
    Internal(anyhow::Error),
}

impl AppError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        AppError::Internal(anyhow::anyhow!("{}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::BusinessRule { message, details } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "details": details }),
            ),
            AppError::Internal(err) => {
                // Logged in full; the response body stays generic.
                tracing::error!("Internal Server Error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::Validation(msg),
            CoreError::InternalError(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(_) => AppError::NotFound(err.to_string()),
            InventoryError::InsufficientCapacity {
                requested,
                available,
            } => AppError::BusinessRule {
                message: "Insufficient seats available".to_string(),
                details: json!({ "requested": requested, "available": available }),
            },
            InventoryError::DuplicateFlightNumber(_) => AppError::Conflict(err.to_string()),
            InventoryError::Storage(inner) => AppError::Internal(anyhow::anyhow!(inner)),
        }
    }
}

impl From<LoyaltyError> for AppError {
    fn from(err: LoyaltyError) -> Self {
        match err {
            LoyaltyError::AccountNotFound(_) => AppError::NotFound(err.to_string()),
            LoyaltyError::InsufficientBalance {
                requested,
                available,
            } => AppError::BusinessRule {
                message: "Insufficient miles balance".to_string(),
                details: json!({ "requested": requested, "available": available }),
            },
            LoyaltyError::AlreadyEnrolled(_) | LoyaltyError::DuplicateMemberNumber(_) => {
                AppError::Conflict(err.to_string())
            }
            LoyaltyError::InvalidAmount(_) => AppError::Validation(err.to_string()),
            LoyaltyError::Storage(inner) => AppError::Internal(anyhow::anyhow!(inner)),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::UserNotFound(_)
            | BookingError::FlightNotFound(_)
            | BookingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BookingError::NotOwner => AppError::Forbidden(err.to_string()),
            BookingError::AlreadyCancelled(_) | BookingError::FlightCancelled(_) => {
                AppError::Conflict(err.to_string())
            }
            BookingError::FlightNotBookable(_)
            | BookingError::InvalidSeatCount(_)
            | BookingError::DuplicateReference(_) => AppError::Validation(err.to_string()),
            BookingError::Inventory(inner) => inner.into(),
            BookingError::Loyalty(inner) => inner.into(),
            BookingError::Storage(inner) => AppError::Internal(anyhow::anyhow!(inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_capacity_violation_maps_to_bad_request_with_context() {
        let err: AppError = InventoryError::InsufficientCapacity {
            requested: 4,
            available: 1,
        }
        .into();
        match err {
            AppError::BusinessRule { details, .. } => {
                assert_eq!(details["requested"], 4);
                assert_eq!(details["available"], 1);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_booking_error_statuses() {
        let err: AppError = BookingError::NotOwner.into();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err: AppError = BookingError::AlreadyCancelled(Uuid::new_v4()).into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = BookingError::FlightNotFound(Uuid::new_v4()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError =
            BookingError::Loyalty(LoyaltyError::InsufficientBalance {
                requested: dec!(500),
                available: dec!(100),
            })
            .into();
        assert!(matches!(err, AppError::BusinessRule { .. }));
    }
}
