use async_trait::async_trait;
use uuid::Uuid;

use crate::account::MilesAccount;
use crate::transaction::MilesTransaction;
use crate::LoyaltyError;

/// Result of applying one ledger entry: the entry as persisted plus the
/// account with its updated balance.
#[derive(Debug, Clone)]
pub struct LedgerUpdate {
    pub account: MilesAccount,
    pub transaction: MilesTransaction,
}

/// Miles ledger data access. `apply` is the only balance mutation: it moves
/// the denormalized balance and appends the ledger entry as one atomic unit,
/// refusing any entry that would take the balance negative.
#[async_trait]
pub trait MilesRepository: Send + Sync {
    /// Fails with `AlreadyEnrolled` for a second account on the same user and
    /// `DuplicateMemberNumber` on a member-number collision.
    async fn create_account(&self, account: &MilesAccount) -> Result<MilesAccount, LoyaltyError>;

    async fn find_account(
        &self,
        id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_member_number(
        &self,
        member_number: &str,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>>;

    async fn apply(&self, entry: &MilesTransaction) -> Result<LedgerUpdate, LoyaltyError>;

    /// Ledger entries for an account, newest first.
    async fn transactions(
        &self,
        member_id: Uuid,
    ) -> Result<Vec<MilesTransaction>, Box<dyn std::error::Error + Send + Sync>>;

    /// Whether an `earn` entry already exists for the booking. Used to keep
    /// the flight-completion sweep idempotent.
    async fn earn_exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
