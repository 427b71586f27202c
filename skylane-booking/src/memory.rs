use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus};
use crate::repository::BookingRepository;
use crate::BookingError;

/// In-memory booking store. Insertion order doubles as chronological order.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.bookings.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingStore {
    async fn create(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.lock().unwrap();
        if bookings
            .iter()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(BookingError::DuplicateReference(
                booking.booking_reference.clone(),
            ));
        }
        bookings.push(booking.clone());
        Ok(booking.clone())
    }

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.lock().unwrap();
        let mut owned: Vec<Booking> = bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.reverse();
        Ok(owned)
    }

    async fn mark_cancelled(&self, id: Uuid) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(BookingError::NotFound(id))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(id));
        }
        booking.status = BookingStatus::Cancelled;
        Ok(booking.clone())
    }

    async fn confirmed_for_flight(
        &self,
        flight_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter()
            .filter(|b| b.flight_id == flight_id && b.status == BookingStatus::Confirmed)
            .cloned()
            .collect())
    }
}
