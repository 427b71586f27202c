pub mod account;
pub mod conversion;
pub mod memory;
pub mod repository;
pub mod service;
pub mod transaction;

pub use account::{AccountStatus, MilesAccount};
pub use repository::{LedgerUpdate, MilesRepository};
pub use service::LedgerService;
pub use transaction::{MilesTransaction, TransactionType};

use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LoyaltyError {
    #[error("Member account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient miles balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("User already enrolled: {0}")]
    AlreadyEnrolled(Uuid),

    #[error("Member number already exists: {0}")]
    DuplicateMemberNumber(String),

    #[error("Invalid miles amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}
