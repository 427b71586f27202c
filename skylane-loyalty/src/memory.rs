use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::account::MilesAccount;
use crate::repository::{LedgerUpdate, MilesRepository};
use crate::transaction::{MilesTransaction, TransactionType};
use crate::LoyaltyError;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Uuid, MilesAccount>,
    // Append order doubles as chronological order.
    entries: Vec<MilesTransaction>,
}

/// In-memory miles ledger with the same balance guarantees as the Postgres
/// repository: the balance update and the ledger append happen under one
/// lock, and an entry that would take the balance negative is refused.
#[derive(Default)]
pub struct InMemoryMilesLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryMilesLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MilesRepository for InMemoryMilesLedger {
    async fn create_account(&self, account: &MilesAccount) -> Result<MilesAccount, LoyaltyError> {
        let mut state = self.state.lock().unwrap();
        if state.accounts.values().any(|a| a.user_id == account.user_id) {
            return Err(LoyaltyError::AlreadyEnrolled(account.user_id));
        }
        if state
            .accounts
            .values()
            .any(|a| a.member_number == account.member_number)
        {
            return Err(LoyaltyError::DuplicateMemberNumber(
                account.member_number.clone(),
            ));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn find_account(
        &self,
        id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(&id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn find_by_member_number(
        &self,
        member_number: &str,
    ) -> Result<Option<MilesAccount>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .values()
            .find(|a| a.member_number == member_number)
            .cloned())
    }

    async fn apply(&self, entry: &MilesTransaction) -> Result<LedgerUpdate, LoyaltyError> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get_mut(&entry.member_id)
            .ok_or_else(|| LoyaltyError::AccountNotFound(entry.member_id.to_string()))?;

        let new_balance = account.miles_balance + entry.miles_amount;
        if new_balance < Decimal::ZERO {
            return Err(LoyaltyError::InsufficientBalance {
                requested: -entry.miles_amount,
                available: account.miles_balance,
            });
        }

        account.miles_balance = new_balance;
        let account = account.clone();
        state.entries.push(entry.clone());

        Ok(LedgerUpdate {
            account,
            transaction: entry.clone(),
        })
    }

    async fn transactions(
        &self,
        member_id: Uuid,
    ) -> Result<Vec<MilesTransaction>, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<MilesTransaction> = state
            .entries
            .iter()
            .filter(|t| t.member_id == member_id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }

    async fn earn_exists_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let state = self.state.lock().unwrap();
        Ok(state.entries.iter().any(|t| {
            t.booking_id == Some(booking_id) && t.transaction_type == TransactionType::Earn
        }))
    }
}
