//! Ledger Store
//!
//! The datastore contract consumed by every ledger service. Two bindings:
//! - [`PgLedgerStore`]: PostgreSQL via sqlx (production)
//! - [`MemoryLedgerStore`]: isolated in-process store (tests, embedding)
//!
//! Balance mutations are only reachable through a [`LedgerTx`]. A `LedgerTx`
//! that is dropped without [`LedgerTx::commit`] rolls back.

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::state::TransactionStatus;
use super::types::{
    Balances, Currency, NewTransaction, Page, PricePage, PriceQuote, SystemCapacity,
    TransactionFilter, TransactionPage, TransactionRecord, UserId,
};

/// Store-level (autocommit) operations
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Get store name for logging
    fn name(&self) -> &'static str;

    /// Open a multi-statement transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// Point read of a user's balances; `None` if the user does not exist
    async fn balances(&self, user_id: UserId) -> Result<Option<Balances>, LedgerError>;

    /// Owner of a bank card; `None` if the card does not exist
    async fn bank_card_owner(&self, bank_card_id: Uuid) -> Result<Option<UserId>, LedgerError>;

    async fn insert_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError>;

    async fn get_transaction(&self, id: Uuid) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Filtered history, newest first. `user_id = None` lists every user.
    async fn list_transactions(
        &self,
        user_id: Option<UserId>,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<TransactionPage, LedgerError>;

    /// Atomic CAS: update status only if the current status matches `expected`
    ///
    /// `description = Some(..)` replaces the stored description. Returns the
    /// updated record, or `None` if the record is missing or its status moved.
    async fn update_status_if(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        new_status: TransactionStatus,
        description: Option<&str>,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Most recently created quote
    async fn latest_price(&self) -> Result<Option<PriceQuote>, LedgerError>;

    async fn insert_price(
        &self,
        buy_price: Decimal,
        sell_price: Decimal,
    ) -> Result<PriceQuote, LedgerError>;

    /// Quote history, newest first
    async fn list_prices(&self, page: Page) -> Result<PricePage, LedgerError>;

    /// Capacity rows ordered by currency
    async fn capacities(&self) -> Result<Vec<SystemCapacity>, LedgerError>;
}

/// One storage transaction
///
/// Every call after `commit()` or `rollback()` fails with `InvalidState`.
#[async_trait]
pub trait LedgerTx: Send {
    async fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError>;

    /// Atomic increment; `NotFound` if the user does not exist
    async fn credit(
        &mut self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances, LedgerError>;

    /// Guarded atomic decrement
    ///
    /// Applies only while `balance >= amount`; otherwise fails with
    /// `InsufficientBalance` and leaves the row untouched.
    async fn debit(
        &mut self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances, LedgerError>;

    /// Upsert the capacity row for `currency` and add `amount`
    async fn add_capacity(
        &mut self,
        currency: Currency,
        amount: Decimal,
    ) -> Result<SystemCapacity, LedgerError>;

    async fn commit(&mut self) -> Result<(), LedgerError>;

    async fn rollback(&mut self) -> Result<(), LedgerError>;
}

fn finished_error() -> LedgerError {
    LedgerError::InvalidState("ledger transaction already finished".to_string())
}
