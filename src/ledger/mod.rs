//! IRT/USDT Ledger
//!
//! Moves money between a user's fiat (IRT) and crypto (USDT) balances and
//! keeps the transaction records that explain every movement.
//!
//! # Architecture
//!
//! ```text
//! Caller (HTTP handler / admin CLI)
//!     |
//!     v
//! Ledger facade
//!     |-- MoneyMovement       deposit / withdrawal / buy / sell
//!     |-- TransactionRecords  PENDING lifecycle, history
//!     |-- BalanceLedger       reads, guarded mutations
//!     |-- PricingService      latest quote, price feed
//!     `-- CapacityService     admin capacity
//!             |
//!             v
//!     Arc<dyn LedgerStore>  (PgLedgerStore | MemoryLedgerStore)
//! ```

pub mod balance;
pub mod capacity;
pub mod error;
pub mod operations;
pub mod pricing;
pub mod records;
pub mod state;
pub mod store;
pub mod types;
pub mod validation;

pub use balance::BalanceLedger;
pub use capacity::{CapacityReceipt, CapacityService};
pub use error::{Flow, LedgerError};
pub use operations::{DepositRequest, MoneyMovement, MovementRequest, WithdrawalRequest};
pub use pricing::PricingService;
pub use records::{CreateTransactionRequest, TransactionRecords};
pub use state::TransactionStatus;
pub use store::{LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore};
pub use types::{
    Attachment, AttachmentFields, Balances, Currency, Direction, TransactionFilter,
    TransactionPage, TransactionRecord, TransactionType, UserId,
};
pub use validation::{validate_amount, validate_card_number, validate_transaction_hash};

use std::sync::Arc;

use crate::config::LedgerConfig;

/// All ledger services bound to one store
pub struct Ledger {
    pub balances: BalanceLedger,
    pub movements: MoneyMovement,
    pub records: TransactionRecords,
    pub pricing: PricingService,
    pub capacity: CapacityService,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        tracing::info!(store = store.name(), "Ledger initialized");
        Self {
            balances: BalanceLedger::new(store.clone()),
            movements: MoneyMovement::new(store.clone()),
            records: TransactionRecords::new(store.clone(), config.clone()),
            pricing: PricingService::new(store.clone()),
            capacity: CapacityService::new(store, config),
        }
    }
}
