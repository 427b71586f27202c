use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::flight::{Flight, FlightStatus};

/// Trips at or under this scheduled duration are treated as direct. There is
/// no stops field on the flight record, so this is an approximation.
pub const DIRECT_FLIGHT_MAX_HOURS: i64 = 12;

/// Flexible searches widen the end of the date range by this many days.
pub const FLEXIBLE_DATE_WINDOW_DAYS: i64 = 3;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Raw query-string shape of a flight search.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightSearchQuery {
    pub departure: String,
    pub arrival: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub passengers: Option<i32>,
    pub flexible_dates: Option<bool>,
    pub direct_flights_only: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Normalized search input shared by every repository implementation.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub departure: String,
    pub arrival: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_seats: i32,
    pub direct_only: bool,
    pub page: u32,
    pub limit: u32,
}

impl FlightSearchQuery {
    pub fn normalize(self) -> SearchCriteria {
        let flexible = self.flexible_dates.unwrap_or(false);
        let date_to = match (self.date_to, self.date_from, flexible) {
            (Some(to), _, true) => Some(to + Duration::days(FLEXIBLE_DATE_WINDOW_DAYS)),
            (None, Some(from), true) => Some(from + Duration::days(FLEXIBLE_DATE_WINDOW_DAYS)),
            (to, _, false) => to,
            (None, None, true) => None,
        };

        SearchCriteria {
            departure: self.departure.trim().to_ascii_uppercase(),
            arrival: self.arrival.trim().to_ascii_uppercase(),
            date_from: self.date_from,
            date_to,
            min_seats: self.passengers.unwrap_or(1).max(1),
            direct_only: self.direct_flights_only.unwrap_or(false),
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

impl SearchCriteria {
    /// Full match predicate. The Postgres repository pushes the route/date/
    /// status filters into SQL and applies `matches_availability` to the
    /// candidates; the in-memory repository uses this directly.
    pub fn matches(&self, flight: &Flight) -> bool {
        if flight.status == FlightStatus::Cancelled {
            return false;
        }
        if !flight.departure_airport.eq_ignore_ascii_case(&self.departure)
            || !flight.arrival_airport.eq_ignore_ascii_case(&self.arrival)
        {
            return false;
        }
        let departure_date = flight.departure_time.date_naive();
        if let Some(from) = self.date_from {
            if departure_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if departure_date > to {
                return false;
            }
        }
        self.matches_availability(flight)
    }

    /// Seat-count and direct-flight filters, applied after the SQL candidates
    /// come back.
    pub fn matches_availability(&self, flight: &Flight) -> bool {
        if flight.available_seats() < self.min_seats {
            return false;
        }
        if self.direct_only
            && flight.scheduled_duration() > Duration::hours(DIRECT_FLIGHT_MAX_HOURS)
        {
            return false;
        }
        true
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.limit) as usize
    }
}

#[derive(Debug, Serialize)]
pub struct FlightPage {
    pub flights: Vec<Flight>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn query(departure: &str, arrival: &str) -> FlightSearchQuery {
        FlightSearchQuery {
            departure: departure.to_string(),
            arrival: arrival.to_string(),
            date_from: None,
            date_to: None,
            passengers: None,
            flexible_dates: None,
            direct_flights_only: None,
            page: None,
            limit: None,
        }
    }

    fn flight_on(date: NaiveDate, duration_hours: i64) -> Flight {
        let departure = Utc
            .from_utc_datetime(&date.and_hms_opt(9, 30, 0).unwrap());
        Flight {
            id: Uuid::new_v4(),
            flight_number: "SL204".to_string(),
            departure_airport: "IST".to_string(),
            arrival_airport: "JFK".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(duration_hours),
            capacity: 200,
            booked_seats: 50,
            price: dec!(499.00),
            status: FlightStatus::Scheduled,
        }
    }

    #[test]
    fn test_normalize_defaults() {
        let criteria = query(" ist", "jfk ").normalize();
        assert_eq!(criteria.departure, "IST");
        assert_eq!(criteria.arrival, "JFK");
        assert_eq!(criteria.min_seats, 1);
        assert_eq!(criteria.page, 1);
        assert_eq!(criteria.limit, DEFAULT_PAGE_LIMIT);
        assert!(!criteria.direct_only);
    }

    #[test]
    fn test_flexible_dates_widen_range_end() {
        let from = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();

        let mut q = query("IST", "JFK");
        q.date_from = Some(from);
        q.date_to = Some(to);
        q.flexible_dates = Some(true);
        let criteria = q.normalize();
        assert_eq!(criteria.date_from, Some(from));
        assert_eq!(
            criteria.date_to,
            Some(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
        );

        // No explicit end: the window opens from the start date.
        let mut q = query("IST", "JFK");
        q.date_from = Some(from);
        q.flexible_dates = Some(true);
        let criteria = q.normalize();
        assert_eq!(
            criteria.date_to,
            Some(NaiveDate::from_ymd_opt(2026, 3, 13).unwrap())
        );
    }

    #[test]
    fn test_limit_is_clamped() {
        let mut q = query("IST", "JFK");
        q.limit = Some(5000);
        q.page = Some(0);
        let criteria = q.normalize();
        assert_eq!(criteria.limit, MAX_PAGE_LIMIT);
        assert_eq!(criteria.page, 1);
    }

    #[test]
    fn test_direct_flight_heuristic_boundary() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut q = query("IST", "JFK");
        q.date_from = Some(date);
        q.direct_flights_only = Some(true);
        let criteria = q.normalize();

        // Exactly at the cutoff still counts as direct.
        assert!(criteria.matches(&flight_on(date, DIRECT_FLIGHT_MAX_HOURS)));
        assert!(!criteria.matches(&flight_on(date, DIRECT_FLIGHT_MAX_HOURS + 1)));
    }

    #[test]
    fn test_cancelled_flights_excluded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let criteria = query("IST", "JFK").normalize();

        let mut flight = flight_on(date, 10);
        assert!(criteria.matches(&flight));
        flight.status = FlightStatus::Cancelled;
        assert!(!criteria.matches(&flight));
    }

    #[test]
    fn test_min_seat_filter() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut q = query("IST", "JFK");
        q.passengers = Some(151);
        let criteria = q.normalize();

        // 200 capacity, 50 booked: 150 available.
        assert!(!criteria.matches(&flight_on(date, 10)));

        let mut q = query("IST", "JFK");
        q.passengers = Some(150);
        assert!(q.normalize().matches(&flight_on(date, 10)));
    }
}
