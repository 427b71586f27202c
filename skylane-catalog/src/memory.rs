use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::flight::{Flight, FlightStatus};
use crate::repository::{FlightRepository, InventoryError};
use crate::search::{FlightPage, SearchCriteria};

/// In-memory flight inventory backed by a HashMap. Carries the same seat
/// semantics as the Postgres repository so the orchestration tests exercise
/// the real protocol.
#[derive(Default)]
pub struct InMemoryFlightInventory {
    flights: Mutex<HashMap<Uuid, Flight>>,
}

impl InMemoryFlightInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, flight: Flight) {
        let mut flights = self.flights.lock().unwrap();
        flights.insert(flight.id, flight);
    }
}

#[async_trait]
impl FlightRepository for InMemoryFlightInventory {
    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Flight>, Box<dyn std::error::Error + Send + Sync>> {
        let flights = self.flights.lock().unwrap();
        Ok(flights.get(&id).cloned())
    }

    async fn create(&self, flight: &Flight) -> Result<(), InventoryError> {
        let mut flights = self.flights.lock().unwrap();
        if flights
            .values()
            .any(|f| f.flight_number == flight.flight_number)
        {
            return Err(InventoryError::DuplicateFlightNumber(
                flight.flight_number.clone(),
            ));
        }
        flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn update(
        &self,
        flight: &Flight,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut flights = self.flights.lock().unwrap();
        match flights.get_mut(&flight.id) {
            Some(existing) => {
                *existing = flight.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut flights = self.flights.lock().unwrap();
        Ok(flights.remove(&id).is_some())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: FlightStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut flights = self.flights.lock().unwrap();
        match flights.get_mut(&id) {
            Some(flight) => {
                flight.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<FlightPage, Box<dyn std::error::Error + Send + Sync>> {
        let flights = self.flights.lock().unwrap();
        let mut matched: Vec<Flight> = flights
            .values()
            .filter(|f| criteria.matches(f))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then(a.price.cmp(&b.price))
        });

        let total = matched.len() as u64;
        let page: Vec<Flight> = matched
            .into_iter()
            .skip(criteria.offset())
            .take(criteria.limit as usize)
            .collect();

        Ok(FlightPage {
            flights: page,
            page: criteria.page,
            limit: criteria.limit,
            total,
        })
    }

    async fn book_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError> {
        let mut flights = self.flights.lock().unwrap();
        let flight = flights.get_mut(&id).ok_or(InventoryError::NotFound(id))?;
        if flight.available_seats() < count {
            return Err(InventoryError::InsufficientCapacity {
                requested: count,
                available: flight.available_seats(),
            });
        }
        flight.booked_seats += count;
        Ok(flight.clone())
    }

    async fn release_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError> {
        let mut flights = self.flights.lock().unwrap();
        let flight = flights.get_mut(&id).ok_or(InventoryError::NotFound(id))?;
        flight.booked_seats = (flight.booked_seats - count).max(0);
        Ok(flight.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FlightSearchQuery;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn flight(number: &str, hour: u32, price: Decimal) -> Flight {
        let departure = Utc.with_ymd_and_hms(2026, 4, 2, hour, 0, 0).unwrap();
        let mut f = Flight::new(
            number.to_string(),
            "IST".to_string(),
            "AMS".to_string(),
            departure,
            departure + Duration::hours(3),
            100,
            price,
        );
        f.booked_seats = 40;
        f
    }

    fn search_query() -> FlightSearchQuery {
        FlightSearchQuery {
            departure: "ist".to_string(),
            arrival: "ams".to_string(),
            date_from: None,
            date_to: None,
            passengers: Some(2),
            flexible_dates: None,
            direct_flights_only: None,
            page: None,
            limit: None,
        }
    }

    #[tokio::test]
    async fn test_book_seats_rejects_over_capacity() {
        let inventory = InMemoryFlightInventory::new();
        let mut f = flight("SL310", 8, dec!(80.00));
        f.booked_seats = 98;
        let id = f.id;
        inventory.seed(f);

        let err = inventory.book_seats(id, 3).await.unwrap_err();
        match err {
            InventoryError::InsufficientCapacity {
                requested,
                available,
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // The failed booking must not have touched the counter.
        let unchanged = inventory.find(id).await.unwrap().unwrap();
        assert_eq!(unchanged.booked_seats, 98);
    }

    #[tokio::test]
    async fn test_release_clamps_at_zero() {
        let inventory = InMemoryFlightInventory::new();
        let mut f = flight("SL311", 9, dec!(80.00));
        f.booked_seats = 2;
        let id = f.id;
        inventory.seed(f);

        let updated = inventory.release_seats(id, 5).await.unwrap();
        assert_eq!(updated.booked_seats, 0);
        assert_eq!(updated.available_seats(), 100);
    }

    #[tokio::test]
    async fn test_search_sorts_by_departure_then_price() {
        let inventory = InMemoryFlightInventory::new();
        inventory.seed(flight("SL320", 14, dec!(120.00)));
        inventory.seed(flight("SL321", 9, dec!(150.00)));
        inventory.seed(flight("SL322", 9, dec!(90.00)));

        let page = inventory
            .search(&search_query().normalize())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let numbers: Vec<&str> = page.flights.iter().map(|f| f.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["SL322", "SL321", "SL320"]);
    }

    #[tokio::test]
    async fn test_search_pagination() {
        let inventory = InMemoryFlightInventory::new();
        for hour in 6..16 {
            inventory.seed(flight(&format!("SL4{hour:02}"), hour, dec!(100.00)));
        }

        let mut query = search_query();
        query.page = Some(2);
        query.limit = Some(4);
        let page = inventory.search(&query.normalize()).await.unwrap();

        assert_eq!(page.total, 10);
        assert_eq!(page.flights.len(), 4);
        assert_eq!(page.flights[0].flight_number, "SL410");
    }

    #[tokio::test]
    async fn test_duplicate_flight_number_rejected() {
        let inventory = InMemoryFlightInventory::new();
        inventory.seed(flight("SL330", 8, dec!(75.00)));

        let err = inventory
            .create(&flight("SL330", 11, dec!(95.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateFlightNumber(_)));
    }
}
