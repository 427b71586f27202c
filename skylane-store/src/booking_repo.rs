use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use skylane_booking::models::{Booking, BookingStatus, PaymentMethod};
use skylane_booking::repository::BookingRepository;
use skylane_booking::BookingError;

const BOOKING_COLUMNS: &str = "id, flight_id, user_id, number_of_seats, total_price, status, \
     booking_reference, payment_method, miles_used, cash_amount, created_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    flight_id: Uuid,
    user_id: Uuid,
    number_of_seats: i32,
    total_price: Decimal,
    status: String,
    booking_reference: String,
    payment_method: String,
    miles_used: Decimal,
    cash_amount: Decimal,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn try_into_booking(self) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("Unknown booking status: {}", self.status))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| format!("Unknown payment method: {}", self.payment_method))?;
        Ok(Booking {
            id: self.id,
            flight_id: self.flight_id,
            user_id: self.user_id,
            number_of_seats: self.number_of_seats,
            total_price: self.total_price,
            status,
            booking_reference: self.booking_reference,
            payment_method,
            miles_used: self.miles_used,
            cash_amount: self.cash_amount,
            created_at: self.created_at,
        })
    }
}

fn storage(err: sqlx::Error) -> BookingError {
    BookingError::Storage(Box::new(err))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let result = sqlx::query(
            r#"
            INSERT INTO bookings
                (id, flight_id, user_id, number_of_seats, total_price, status,
                 booking_reference, payment_method, miles_used, cash_amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(booking.flight_id)
        .bind(booking.user_id)
        .bind(booking.number_of_seats)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(&booking.booking_reference)
        .bind(booking.payment_method.as_str())
        .bind(booking.miles_used)
        .bind(booking.cash_amount)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(booking.clone()),
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    && db.constraint().is_some_and(|c| c.contains("reference")) =>
            {
                Err(BookingError::DuplicateReference(
                    booking.booking_reference.clone(),
                ))
            }
            Err(err) => Err(storage(err)),
        }
    }

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::try_into_booking).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::try_into_booking).collect()
    }

    async fn mark_cancelled(&self, id: Uuid) -> Result<Booking, BookingError> {
        // Conditional transition: a second cancel matches zero rows.
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled'
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => row.try_into_booking().map_err(BookingError::Storage),
            None => {
                let exists: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM bookings WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(storage)?;
                match exists {
                    Some(_) => Err(BookingError::AlreadyCancelled(id)),
                    None => Err(BookingError::NotFound(id)),
                }
            }
        }
    }

    async fn confirmed_for_flight(
        &self,
        flight_id: Uuid,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE flight_id = $1 AND status = 'confirmed' ORDER BY created_at ASC",
            BOOKING_COLUMNS
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::try_into_booking).collect()
    }
}
