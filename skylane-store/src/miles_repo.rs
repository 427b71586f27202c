use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use skylane_loyalty::account::{AccountStatus, MilesAccount};
use skylane_loyalty::repository::{LedgerUpdate, MilesRepository};
use skylane_loyalty::transaction::{MilesTransaction, TransactionType};
use skylane_loyalty::LoyaltyError;

const ACCOUNT_COLUMNS: &str = "id, member_number, user_id, miles_balance, status, created_at";

pub struct PgMilesRepository {
    pool: PgPool,
}

impl PgMilesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MilesAccountRow {
    id: Uuid,
    member_number: String,
    user_id: Uuid,
    miles_balance: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl MilesAccountRow {
    fn try_into_account(self) -> Result<MilesAccount, Box<dyn std::error::Error + Send + Sync>> {
        let status = AccountStatus::parse(&self.status)
            .ok_or_else(|| format!("Unknown account status: {}", self.status))?;
        Ok(MilesAccount {
            id: self.id,
            member_number: self.member_number,
            user_id: self.user_id,
            miles_balance: self.miles_balance,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MilesTransactionRow {
    id: Uuid,
    member_id: Uuid,
    miles_amount: Decimal,
    transaction_type: String,
    flight_id: Option<Uuid>,
    booking_id: Option<Uuid>,
    description: String,
    created_at: DateTime<Utc>,
}

impl MilesTransactionRow {
    fn try_into_transaction(
        self,
    ) -> Result<MilesTransaction, Box<dyn std::error::Error + Send + Sync>> {
        let transaction_type = TransactionType::parse(&self.transaction_type)
            .ok_or_else(|| format!("Unknown transaction type: {}", self.transaction_type))?;
        Ok(MilesTransaction {
            id: self.id,
            member_id: self.member_id,
            miles_amount: self.miles_amount,
            transaction_type,
            flight_id: self.flight_id,
            booking_id: self.booking_id,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

fn storage(err: sqlx::Error) -> LoyaltyError {
    LoyaltyError::Storage(Box::new(err))
}

#[async_trait]
impl MilesRepository for PgMilesRepository {
    async fn create_account(&self, account: &MilesAccount) -> Result<MilesAccount, LoyaltyError> {
        let result = sqlx::query(
            r#"
            INSERT INTO miles_accounts (id, member_number, user_id, miles_balance, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id)
        .bind(&account.member_number)
        .bind(account.user_id)
        .bind(account.miles_balance)
        .bind(account.status.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(account.clone()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // Two unique indexes can fire here: one account per user,
                // and the member-number index the retry loop depends on.
                if db.constraint().is_some_and(|c| c.contains("user_id")) {
                    Err(LoyaltyError::AlreadyEnrolled(account.user_id))
                } else {
                    Err(LoyaltyError::DuplicateMemberNumber(
                        account.member_number.clone(),
                    ))
                }
            }
            Err(err) => Err(storage(err)),
        }
    }

    async fn find_account(
        &self,
        id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<MilesAccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM miles_accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MilesAccountRow::try_into_account).transpose()
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<MilesAccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM miles_accounts WHERE user_id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MilesAccountRow::try_into_account).transpose()
    }

    async fn find_by_member_number(
        &self,
        member_number: &str,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<MilesAccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM miles_accounts WHERE member_number = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(member_number)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MilesAccountRow::try_into_account).transpose()
    }

    async fn apply(&self, entry: &MilesTransaction) -> Result<LedgerUpdate, LoyaltyError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Balance guard and update are one statement; the ledger append
        // commits with it or not at all.
        let updated: Option<MilesAccountRow> = sqlx::query_as(&format!(
            r#"
            UPDATE miles_accounts
            SET miles_balance = miles_balance + $2
            WHERE id = $1 AND miles_balance + $2 >= 0
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(entry.member_id)
        .bind(entry.miles_amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let account_row = match updated {
            Some(row) => row,
            None => {
                let existing: Option<MilesAccountRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM miles_accounts WHERE id = $1",
                    ACCOUNT_COLUMNS
                ))
                .bind(entry.member_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;

                return match existing {
                    Some(row) => Err(LoyaltyError::InsufficientBalance {
                        requested: -entry.miles_amount,
                        available: row.miles_balance,
                    }),
                    None => Err(LoyaltyError::AccountNotFound(entry.member_id.to_string())),
                };
            }
        };

        sqlx::query(
            r#"
            INSERT INTO miles_transactions
                (id, member_id, miles_amount, transaction_type, flight_id, booking_id, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.member_id)
        .bind(entry.miles_amount)
        .bind(entry.transaction_type.as_str())
        .bind(entry.flight_id)
        .bind(entry.booking_id)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        let account = account_row
            .try_into_account()
            .map_err(LoyaltyError::Storage)?;
        Ok(LedgerUpdate {
            account,
            transaction: entry.clone(),
        })
    }

    async fn transactions(
        &self,
        member_id: Uuid,
    ) -> Result<Vec<MilesTransaction>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<MilesTransactionRow> = sqlx::query_as(
            r#"
            SELECT id, member_id, miles_amount, transaction_type, flight_id, booking_id, description, created_at
            FROM miles_transactions
            WHERE member_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(MilesTransactionRow::try_into_transaction)
            .collect()
    }

    async fn earn_exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM miles_transactions WHERE booking_id = $1 AND transaction_type = 'earn' LIMIT 1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
