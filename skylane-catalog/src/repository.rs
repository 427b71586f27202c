use async_trait::async_trait;
use uuid::Uuid;

use crate::flight::{Flight, FlightStatus};
use crate::search::{FlightPage, SearchCriteria};

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Flight not found: {0}")]
    NotFound(Uuid),

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },

    #[error("Flight number already exists: {0}")]
    DuplicateFlightNumber(String),

    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Flight data access. `book_seats` and `release_seats` are single atomic
/// state transitions: the capacity guard and the counter update happen
/// together, so concurrent purchases can never push `booked_seats` past
/// `capacity` and releases can never push it below zero.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Flight>, Box<dyn std::error::Error + Send + Sync>>;

    async fn create(&self, flight: &Flight) -> Result<(), InventoryError>;

    /// Returns false when no row matched the id.
    async fn update(
        &self,
        flight: &Flight,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn delete(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn set_status(
        &self,
        id: Uuid,
        status: FlightStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<FlightPage, Box<dyn std::error::Error + Send + Sync>>;

    /// Takes `count` seats or fails with `InsufficientCapacity`, leaving the
    /// counter untouched. Returns the updated flight.
    async fn book_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError>;

    /// Gives `count` seats back, clamped so `booked_seats` never drops below
    /// zero. Returns the updated flight.
    async fn release_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError>;
}
