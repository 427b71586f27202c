use async_trait::async_trait;
use sqlx::PgPool;

use skylane_core::airport::{Airport, AirportRepository};

pub struct PgAirportRepository {
    pool: PgPool,
}

impl PgAirportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    code: String,
    name: String,
    city: String,
    country: String,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Airport {
            code: row.code,
            name: row.name,
            city: row.city,
            country: row.country,
        }
    }
}

#[async_trait]
impl AirportRepository for PgAirportRepository {
    async fn find(
        &self,
        code: &str,
    ) -> Result<Option<Airport>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<AirportRow> =
            sqlx::query_as("SELECT code, name, city, country FROM airports WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Airport::from))
    }

    async fn list(&self) -> Result<Vec<Airport>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<AirportRow> =
            sqlx::query_as("SELECT code, name, city, country FROM airports ORDER BY code ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Airport::from).collect())
    }

    async fn create(
        &self,
        airport: &Airport,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            r#"
            INSERT INTO airports (code, name, city, country)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&airport.code)
        .bind(&airport.name)
        .bind(&airport.city)
        .bind(&airport.country)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update(
        &self,
        airport: &Airport,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result =
            sqlx::query("UPDATE airports SET name = $2, city = $3, country = $4 WHERE code = $1")
                .bind(&airport.code)
                .bind(&airport.name)
                .bind(&airport.city)
                .bind(&airport.country)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(
        &self,
        code: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("DELETE FROM airports WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
