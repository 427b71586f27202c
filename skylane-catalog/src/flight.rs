use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FlightStatus {
    Scheduled,
    InFlight,
    Completed,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::InFlight => "in-flight",
            FlightStatus::Completed => "completed",
            FlightStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(FlightStatus::Scheduled),
            "in-flight" => Some(FlightStatus::InFlight),
            "completed" => Some(FlightStatus::Completed),
            "cancelled" => Some(FlightStatus::Cancelled),
            _ => None,
        }
    }
}

/// A scheduled flight with its seat counters. `booked_seats` never exceeds
/// `capacity` and never goes below zero; mutation goes through the
/// repository's conditional seat operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub capacity: i32,
    pub booked_seats: i32,
    pub price: Decimal,
    pub status: FlightStatus,
}

impl Flight {
    pub fn new(
        flight_number: String,
        departure_airport: String,
        arrival_airport: String,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        capacity: i32,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_number,
            departure_airport,
            arrival_airport,
            departure_time,
            arrival_time,
            capacity,
            booked_seats: 0,
            price,
            status: FlightStatus::Scheduled,
        }
    }

    pub fn available_seats(&self) -> i32 {
        (self.capacity - self.booked_seats).max(0)
    }

    pub fn scheduled_duration(&self) -> Duration {
        self.arrival_time - self.departure_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_flight() -> Flight {
        let departure = Utc::now();
        Flight::new(
            "SL101".to_string(),
            "IST".to_string(),
            "LHR".to_string(),
            departure,
            departure + Duration::hours(4),
            180,
            dec!(129.99),
        )
    }

    #[test]
    fn test_available_seats() {
        let mut flight = sample_flight();
        assert_eq!(flight.available_seats(), 180);

        flight.booked_seats = 175;
        assert_eq!(flight.available_seats(), 5);

        // A corrupted counter still reads as zero available, never negative.
        flight.booked_seats = 200;
        assert_eq!(flight.available_seats(), 0);
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(FlightStatus::parse("in-flight"), Some(FlightStatus::InFlight));
        assert_eq!(FlightStatus::InFlight.as_str(), "in-flight");
        assert_eq!(FlightStatus::parse("boarding"), None);
    }
}
