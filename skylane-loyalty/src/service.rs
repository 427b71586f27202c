use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::account::MilesAccount;
use crate::repository::{LedgerUpdate, MilesRepository};
use crate::transaction::{MilesTransaction, TransactionType};
use crate::LoyaltyError;

const MEMBER_NUMBER_ATTEMPTS: u32 = 3;

/// Business layer over the miles ledger: amount validation, sign
/// conventions, enrollment with member-number retry.
#[derive(Clone)]
pub struct LedgerService {
    repo: Arc<dyn MilesRepository>,
}

impl LedgerService {
    pub fn new(repo: Arc<dyn MilesRepository>) -> Self {
        Self { repo }
    }

    /// Opens an account for the user. Member numbers carry a random suffix,
    /// so a collision is retried with a fresh number before giving up.
    pub async fn enroll(&self, user_id: Uuid) -> Result<MilesAccount, LoyaltyError> {
        let mut last_err = None;
        for _ in 0..MEMBER_NUMBER_ATTEMPTS {
            let account = MilesAccount::new(user_id);
            match self.repo.create_account(&account).await {
                Err(LoyaltyError::DuplicateMemberNumber(number)) => {
                    tracing::warn!("Member number collision on {}, regenerating", number);
                    last_err = Some(LoyaltyError::DuplicateMemberNumber(number));
                }
                other => return other,
            }
        }
        Err(last_err.unwrap_or_else(|| LoyaltyError::AlreadyEnrolled(user_id)))
    }

    pub async fn account_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MilesAccount>, LoyaltyError> {
        self.repo
            .find_by_user(user_id)
            .await
            .map_err(LoyaltyError::Storage)
    }

    pub async fn account_by_member_number(
        &self,
        member_number: &str,
    ) -> Result<Option<MilesAccount>, LoyaltyError> {
        self.repo
            .find_by_member_number(member_number)
            .await
            .map_err(LoyaltyError::Storage)
    }

    pub async fn credit(
        &self,
        member_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        description: String,
        flight_id: Option<Uuid>,
        booking_id: Option<Uuid>,
    ) -> Result<LedgerUpdate, LoyaltyError> {
        if amount <= Decimal::ZERO {
            return Err(LoyaltyError::InvalidAmount(amount));
        }
        let entry = MilesTransaction::new(
            member_id,
            amount,
            transaction_type,
            description,
            flight_id,
            booking_id,
        );
        self.repo.apply(&entry).await
    }

    /// Debits always land in the ledger as a negated `redeem` entry.
    pub async fn debit(
        &self,
        member_id: Uuid,
        amount: Decimal,
        description: String,
        flight_id: Option<Uuid>,
        booking_id: Option<Uuid>,
    ) -> Result<LedgerUpdate, LoyaltyError> {
        if amount <= Decimal::ZERO {
            return Err(LoyaltyError::InvalidAmount(amount));
        }
        let entry = MilesTransaction::new(
            member_id,
            -amount,
            TransactionType::Redeem,
            description,
            flight_id,
            booking_id,
        );
        self.repo.apply(&entry).await
    }

    pub async fn balance(&self, member_id: Uuid) -> Result<Decimal, LoyaltyError> {
        let account = self
            .repo
            .find_account(member_id)
            .await
            .map_err(LoyaltyError::Storage)?
            .ok_or_else(|| LoyaltyError::AccountNotFound(member_id.to_string()))?;
        Ok(account.miles_balance)
    }

    pub async fn transactions(
        &self,
        member_id: Uuid,
    ) -> Result<Vec<MilesTransaction>, LoyaltyError> {
        self.repo
            .transactions(member_id)
            .await
            .map_err(LoyaltyError::Storage)
    }

    pub async fn earn_exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, LoyaltyError> {
        self.repo
            .earn_exists_for_booking(booking_id)
            .await
            .map_err(LoyaltyError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMilesLedger;
    use rust_decimal_macros::dec;

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(InMemoryMilesLedger::new()))
    }

    #[tokio::test]
    async fn test_balance_tracks_ledger_sum() {
        let ledger = service();
        let account = ledger.enroll(Uuid::new_v4()).await.unwrap();

        ledger
            .credit(
                account.id,
                dec!(500),
                TransactionType::Earn,
                "Flight credit".to_string(),
                None,
                None,
            )
            .await
            .unwrap();
        ledger
            .credit(
                account.id,
                dec!(250),
                TransactionType::Adjustment,
                "Goodwill".to_string(),
                None,
                None,
            )
            .await
            .unwrap();
        ledger
            .debit(account.id, dec!(100), "Redemption".to_string(), None, None)
            .await
            .unwrap();

        let entries = ledger.transactions(account.id).await.unwrap();
        let ledger_sum: Decimal = entries.iter().map(|t| t.miles_amount).sum();
        assert_eq!(ledger_sum, dec!(650));
        assert_eq!(ledger.balance(account.id).await.unwrap(), ledger_sum);
    }

    #[tokio::test]
    async fn test_debit_more_than_balance_fails_and_leaves_balance() {
        let ledger = service();
        let account = ledger.enroll(Uuid::new_v4()).await.unwrap();
        ledger
            .credit(
                account.id,
                dec!(80),
                TransactionType::Earn,
                "Credit".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let err = ledger
            .debit(account.id, dec!(81), "Too much".to_string(), None, None)
            .await
            .unwrap_err();
        match err {
            LoyaltyError::InsufficientBalance {
                requested,
                available,
            } => {
                assert_eq!(requested, dec!(81));
                assert_eq!(available, dec!(80));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(ledger.balance(account.id).await.unwrap(), dec!(80));
        // The refused debit must not have left a ledger entry behind.
        assert_eq!(ledger.transactions(account.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_debit_is_recorded_as_negated_redeem() {
        let ledger = service();
        let account = ledger.enroll(Uuid::new_v4()).await.unwrap();
        ledger
            .credit(
                account.id,
                dec!(1000),
                TransactionType::Earn,
                "Credit".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let update = ledger
            .debit(account.id, dec!(400), "Redemption".to_string(), None, None)
            .await
            .unwrap();
        assert_eq!(update.transaction.miles_amount, dec!(-400));
        assert_eq!(update.transaction.transaction_type, TransactionType::Redeem);
        assert_eq!(update.account.miles_balance, dec!(600));
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let ledger = service();
        let account = ledger.enroll(Uuid::new_v4()).await.unwrap();
        for amount in [dec!(10), dec!(20), dec!(30)] {
            ledger
                .credit(
                    account.id,
                    amount,
                    TransactionType::Earn,
                    "Credit".to_string(),
                    None,
                    None,
                )
                .await
                .unwrap();
        }

        let entries = ledger.transactions(account.id).await.unwrap();
        let amounts: Vec<Decimal> = entries.iter().map(|t| t.miles_amount).collect();
        assert_eq!(amounts, vec![dec!(30), dec!(20), dec!(10)]);
    }

    #[tokio::test]
    async fn test_double_enrollment_rejected() {
        let ledger = service();
        let user_id = Uuid::new_v4();
        ledger.enroll(user_id).await.unwrap();

        let err = ledger.enroll(user_id).await.unwrap_err();
        assert!(matches!(err, LoyaltyError::AlreadyEnrolled(id) if id == user_id));
    }

    #[tokio::test]
    async fn test_zero_and_negative_amounts_rejected() {
        let ledger = service();
        let account = ledger.enroll(Uuid::new_v4()).await.unwrap();

        let err = ledger
            .credit(
                account.id,
                Decimal::ZERO,
                TransactionType::Earn,
                "Nothing".to_string(),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::InvalidAmount(_)));

        let err = ledger
            .debit(account.id, dec!(-5), "Negative".to_string(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::InvalidAmount(_)));
    }
}
