use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Booking;
use crate::BookingError;

/// Booking data access. `mark_cancelled` is a conditional transition: only a
/// non-cancelled row moves, so exactly one of two racing cancels wins and
/// the loser sees `AlreadyCancelled`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with `DuplicateReference` on a reference-code collision.
    async fn create(&self, booking: &Booking) -> Result<Booking, BookingError>;

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Bookings for a user, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn mark_cancelled(&self, id: Uuid) -> Result<Booking, BookingError>;

    /// Confirmed bookings on a flight, for the completion sweep.
    async fn confirmed_for_flight(
        &self,
        flight_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}
