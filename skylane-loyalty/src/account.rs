use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MEMBER_NUMBER_PREFIX: &str = "SL";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "suspended" => Some(AccountStatus::Suspended),
            _ => None,
        }
    }
}

/// Loyalty balance record, 1:1 with a user. The balance is the denormalized
/// running sum of the account's ledger entries and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilesAccount {
    pub id: Uuid,
    pub member_number: String,
    pub user_id: Uuid,
    pub miles_balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl MilesAccount {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_number: generate_member_number(),
            user_id,
            miles_balance: Decimal::ZERO,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Prefix + epoch seconds + 4 random digits. Uniqueness is enforced by the
/// database index; callers regenerate and retry on conflict.
pub fn generate_member_number() -> String {
    let timestamp = Utc::now().timestamp();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{}{:04}", MEMBER_NUMBER_PREFIX, timestamp, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_number_format() {
        let number = generate_member_number();
        assert!(number.starts_with(MEMBER_NUMBER_PREFIX));
        assert!(number[MEMBER_NUMBER_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_digit()));
        // 2-char prefix, 10-digit epoch, 4-digit suffix.
        assert_eq!(number.len(), 16);
    }

    #[test]
    fn test_new_account_starts_empty_and_active() {
        let user_id = Uuid::new_v4();
        let account = MilesAccount::new(user_id);
        assert_eq!(account.user_id, user_id);
        assert_eq!(account.miles_balance, Decimal::ZERO);
        assert_eq!(account.status, AccountStatus::Active);
    }
}
