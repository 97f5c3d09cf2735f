//! IRT/USDT Ledger - back-office balance core
//!
//! Atomic money movement between a user's fiat (IRT) and crypto (USDT)
//! balances, with immutable transaction records.
//!
//! # Modules
//!
//! - [`ledger`] - Validation, balance ledger, records, money movement, pricing, capacity
//! - [`config`] - YAML application config
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and migrations

pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use config::{AppConfig, LedgerConfig};
pub use db::Database;
pub use ledger::{
    BalanceLedger, CapacityService, CreateTransactionRequest, Ledger, LedgerError, LedgerStore,
    MemoryLedgerStore, MoneyMovement, MovementRequest, PgLedgerStore, PricingService,
    TransactionRecords, TransactionStatus, validate_amount, validate_card_number,
    validate_transaction_hash,
};
