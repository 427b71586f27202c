use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Earn,
    Redeem,
    Expire,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Earn => "earn",
            TransactionType::Redeem => "redeem",
            TransactionType::Expire => "expire",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earn" => Some(TransactionType::Earn),
            "redeem" => Some(TransactionType::Redeem),
            "expire" => Some(TransactionType::Expire),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }
}

/// One immutable ledger entry. Positive amounts credit the account, negative
/// amounts debit it; entries are only ever appended, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilesTransaction {
    pub id: Uuid,
    pub member_id: Uuid,
    pub miles_amount: Decimal,
    pub transaction_type: TransactionType,
    pub flight_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl MilesTransaction {
    pub fn new(
        member_id: Uuid,
        miles_amount: Decimal,
        transaction_type: TransactionType,
        description: String,
        flight_id: Option<Uuid>,
        booking_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            miles_amount,
            transaction_type,
            flight_id,
            booking_id,
            description,
            created_at: Utc::now(),
        }
    }
}
