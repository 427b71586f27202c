pub mod memory;
pub mod models;
pub mod payment;
pub mod reference;
pub mod repository;
pub mod service;

pub use models::{Booking, BookingStatus, PaymentMethod};
pub use payment::{split_payment, PaymentSplit};
pub use repository::BookingRepository;
pub use service::{
    BookingService, CancellationOutcome, CompletionOutcome, PurchaseOutcome, PurchaseRequest,
};

use uuid::Uuid;

use skylane_catalog::InventoryError;
use skylane_loyalty::LoyaltyError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Booking does not belong to the caller")]
    NotOwner,

    #[error("Booking already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    #[error("Flight is not open for booking: {0}")]
    FlightNotBookable(Uuid),

    #[error("Flight is cancelled: {0}")]
    FlightCancelled(Uuid),

    #[error("Invalid seat count: {0}")]
    InvalidSeatCount(i32),

    #[error("Booking reference already exists: {0}")]
    DuplicateReference(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),

    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}
