use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use skylane_catalog::flight::{Flight, FlightStatus};
use skylane_catalog::repository::{FlightRepository, InventoryError};
use skylane_catalog::search::{FlightPage, SearchCriteria};

const FLIGHT_COLUMNS: &str = "id, flight_number, departure_airport, arrival_airport, \
     departure_time, arrival_time, capacity, booked_seats, price, status";

pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    departure_airport: String,
    arrival_airport: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    capacity: i32,
    booked_seats: i32,
    price: Decimal,
    status: String,
}

impl FlightRow {
    fn try_into_flight(self) -> Result<Flight, Box<dyn std::error::Error + Send + Sync>> {
        let status = FlightStatus::parse(&self.status)
            .ok_or_else(|| format!("Unknown flight status: {}", self.status))?;
        Ok(Flight {
            id: self.id,
            flight_number: self.flight_number,
            departure_airport: self.departure_airport,
            arrival_airport: self.arrival_airport,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            capacity: self.capacity,
            booked_seats: self.booked_seats,
            price: self.price,
            status,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Flight>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FlightRow::try_into_flight).transpose()
    }

    async fn create(&self, flight: &Flight) -> Result<(), InventoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, departure_airport, arrival_airport,
                departure_time, arrival_time, capacity, booked_seats, price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.departure_airport)
        .bind(&flight.arrival_airport)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.capacity)
        .bind(flight.booked_seats)
        .bind(flight.price)
        .bind(flight.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(InventoryError::DuplicateFlightNumber(
                flight.flight_number.clone(),
            )),
            Err(err) => Err(InventoryError::Storage(Box::new(err))),
        }
    }

    async fn update(
        &self,
        flight: &Flight,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET departure_airport = $2, arrival_airport = $3, departure_time = $4,
                arrival_time = $5, capacity = $6, price = $7, status = $8
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.departure_airport)
        .bind(&flight.arrival_airport)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.capacity)
        .bind(flight.price)
        .bind(flight.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: FlightStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("UPDATE flights SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<FlightPage, Box<dyn std::error::Error + Send + Sync>> {
        // Route, date-range and status filters run in SQL; the seat and
        // direct-flight filters need derived values, so they run on the
        // candidate rows before pagination.
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM flights
            WHERE upper(departure_airport) = $1
              AND upper(arrival_airport) = $2
              AND status <> 'cancelled'
              AND ($3::date IS NULL OR departure_time >= $3::date)
              AND ($4::date IS NULL OR departure_time < ($4::date + 1))
            ORDER BY departure_time ASC, price ASC
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(&criteria.departure)
        .bind(&criteria.arrival)
        .bind(criteria.date_from)
        .bind(criteria.date_to)
        .fetch_all(&self.pool)
        .await?;

        let mut matched = Vec::with_capacity(rows.len());
        for row in rows {
            let flight = row.try_into_flight()?;
            if criteria.matches_availability(&flight) {
                matched.push(flight);
            }
        }

        let total = matched.len() as u64;
        let flights: Vec<Flight> = matched
            .into_iter()
            .skip(criteria.offset())
            .take(criteria.limit as usize)
            .collect();

        Ok(FlightPage {
            flights,
            page: criteria.page,
            limit: criteria.limit,
            total,
        })
    }

    async fn book_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError> {
        // Guard and decrement in one statement: two racing purchases can
        // never both squeeze past the capacity check.
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            r#"
            UPDATE flights
            SET booked_seats = booked_seats + $2
            WHERE id = $1 AND booked_seats + $2 <= capacity
            RETURNING {}
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InventoryError::Storage(Box::new(e)))?;

        match row {
            Some(row) => row.try_into_flight().map_err(InventoryError::Storage),
            None => {
                let current = self
                    .find(id)
                    .await
                    .map_err(InventoryError::Storage)?
                    .ok_or(InventoryError::NotFound(id))?;
                Err(InventoryError::InsufficientCapacity {
                    requested: count,
                    available: current.available_seats(),
                })
            }
        }
    }

    async fn release_seats(&self, id: Uuid, count: i32) -> Result<Flight, InventoryError> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            r#"
            UPDATE flights
            SET booked_seats = GREATEST(booked_seats - $2, 0)
            WHERE id = $1
            RETURNING {}
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InventoryError::Storage(Box::new(e)))?;

        match row {
            Some(row) => row.try_into_flight().map_err(InventoryError::Storage),
            None => Err(InventoryError::NotFound(id)),
        }
    }
}
