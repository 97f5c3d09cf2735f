//! In-memory ledger store
//!
//! Each store instance owns its own state, so tests never share data.
//! A [`LedgerTx`] holds the state lock for its whole lifetime and keeps a
//! snapshot; dropping it without `commit()` restores the snapshot.
//!
//! Do not call [`LedgerStore`] methods on the same store while holding one of
//! its transactions: the lock is not reentrant.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, finished_error};
use crate::ledger::error::LedgerError;
use crate::ledger::state::TransactionStatus;
use crate::ledger::types::{
    BankCard, Balances, Currency, NewTransaction, Page, PricePage, PriceQuote, SystemCapacity,
    TransactionFilter, TransactionPage, TransactionRecord, UserId,
};
use crate::ledger::validation::validate_card_number;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, Balances>,
    bank_cards: HashMap<Uuid, BankCard>,
    /// Insertion order
    transactions: Vec<TransactionRecord>,
    /// Insertion order
    prices: Vec<PriceQuote>,
    capacities: BTreeMap<Currency, SystemCapacity>,
}

impl MemoryState {
    fn insert_transaction(&mut self, new: NewTransaction) -> TransactionRecord {
        let record = new.into_record();
        self.transactions.push(record.clone());
        record
    }

    fn balances_mut(&mut self, user_id: UserId) -> Result<&mut Balances, LedgerError> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::user_not_found(user_id))
    }
}

/// Clamp a resolved page onto a slice of `len` items
fn page_bounds(len: usize, page: Page) -> (usize, usize) {
    let start = usize::try_from(page.offset).unwrap_or(0).min(len);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    (start, start.saturating_add(limit).min(len))
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the given opening balances (replaces existing)
    pub async fn create_user(&self, user_id: UserId, balances: Balances) {
        self.state.lock().await.users.insert(user_id, balances);
    }

    /// Register a bank card for `user_id`
    ///
    /// Rejects malformed numbers and a card number the user already holds.
    /// The first card of a user becomes the default.
    pub async fn add_bank_card(
        &self,
        user_id: UserId,
        card_number: &str,
    ) -> Result<BankCard, LedgerError> {
        if !validate_card_number(card_number) {
            return Err(LedgerError::InvalidBankCard);
        }

        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user_id) {
            return Err(LedgerError::user_not_found(user_id));
        }

        let owned: Vec<&BankCard> = state
            .bank_cards
            .values()
            .filter(|card| card.user_id == user_id)
            .collect();
        if owned.iter().any(|card| card.card_number == card_number) {
            return Err(LedgerError::InvalidState(
                "bank card already registered for this user".to_string(),
            ));
        }

        let card = BankCard {
            id: Uuid::new_v4(),
            user_id,
            card_number: card_number.to_string(),
            is_default: owned.is_empty(),
            created_at: Utc::now(),
        };
        state.bank_cards.insert(card.id, card.clone());
        Ok(card)
    }

    /// Number of stored transaction records
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = MemoryState::clone(&guard);
        Ok(Box::new(MemoryLedgerTx {
            state: guard,
            snapshot: Some(snapshot),
        }))
    }

    async fn balances(&self, user_id: UserId) -> Result<Option<Balances>, LedgerError> {
        Ok(self.state.lock().await.users.get(&user_id).copied())
    }

    async fn bank_card_owner(&self, bank_card_id: Uuid) -> Result<Option<UserId>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.bank_cards.get(&bank_card_id).map(|card| card.user_id))
    }

    async fn insert_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        Ok(self.state.lock().await.insert_transaction(new))
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<TransactionRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list_transactions(
        &self,
        user_id: Option<UserId>,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<TransactionPage, LedgerError> {
        let state = self.state.lock().await;

        // Newest insert first, then a stable sort keeps that order among equal timestamps
        let mut matching: Vec<&TransactionRecord> = state
            .transactions
            .iter()
            .rev()
            .filter(|t| user_id.is_none_or(|u| t.user_id == u))
            .filter(|t| filter.matches(t))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let (start, end) = page_bounds(matching.len(), page);
        Ok(TransactionPage {
            transactions: matching[start..end].iter().map(|t| (*t).clone()).collect(),
            total_count: matching.len() as i64,
        })
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        new_status: TransactionStatus,
        description: Option<&str>,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let mut state = self.state.lock().await;
        let Some(record) = state
            .transactions
            .iter_mut()
            .find(|t| t.id == id && t.status == expected)
        else {
            return Ok(None);
        };

        record.status = new_status;
        if let Some(description) = description {
            record.description = Some(description.to_string());
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn latest_price(&self) -> Result<Option<PriceQuote>, LedgerError> {
        let state = self.state.lock().await;
        // max_by_key returns the last maximum, i.e. the latest insert on ties
        Ok(state.prices.iter().max_by_key(|p| p.created_at).cloned())
    }

    async fn insert_price(
        &self,
        buy_price: Decimal,
        sell_price: Decimal,
    ) -> Result<PriceQuote, LedgerError> {
        let quote = PriceQuote {
            id: Uuid::new_v4(),
            buy_price,
            sell_price,
            created_at: Utc::now(),
        };
        self.state.lock().await.prices.push(quote.clone());
        Ok(quote)
    }

    async fn list_prices(&self, page: Page) -> Result<PricePage, LedgerError> {
        let state = self.state.lock().await;
        let mut prices: Vec<&PriceQuote> = state.prices.iter().rev().collect();
        prices.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let (start, end) = page_bounds(prices.len(), page);
        Ok(PricePage {
            prices: prices[start..end].iter().map(|p| (*p).clone()).collect(),
            total_count: prices.len() as i64,
        })
    }

    async fn capacities(&self) -> Result<Vec<SystemCapacity>, LedgerError> {
        Ok(self.state.lock().await.capacities.values().cloned().collect())
    }
}

pub struct MemoryLedgerTx {
    state: OwnedMutexGuard<MemoryState>,
    /// State at `begin()`; `None` once finished
    snapshot: Option<MemoryState>,
}

impl MemoryLedgerTx {
    fn active(&mut self) -> Result<&mut MemoryState, LedgerError> {
        if self.snapshot.is_none() {
            return Err(finished_error());
        }
        Ok(&mut *self.state)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn insert_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        Ok(self.active()?.insert_transaction(new))
    }

    async fn credit(
        &mut self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances, LedgerError> {
        let balances = self.active()?.balances_mut(user_id)?;
        let balance = balances.get_mut(currency);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        Ok(*balances)
    }

    async fn debit(
        &mut self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Balances, LedgerError> {
        let balances = self.active()?.balances_mut(user_id)?;
        let balance = balances.get_mut(currency);
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance(currency));
        }
        *balance -= amount;
        Ok(*balances)
    }

    async fn add_capacity(
        &mut self,
        currency: Currency,
        amount: Decimal,
    ) -> Result<SystemCapacity, LedgerError> {
        let state = self.active()?;
        let row = state
            .capacities
            .entry(currency)
            .or_insert_with(|| SystemCapacity {
                currency,
                amount: Decimal::ZERO,
                updated_at: Utc::now(),
            });
        row.amount = row
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount)?;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn commit(&mut self) -> Result<(), LedgerError> {
        self.snapshot.take().map(|_| ()).ok_or_else(finished_error)
    }

    async fn rollback(&mut self) -> Result<(), LedgerError> {
        let snapshot = self.snapshot.take().ok_or_else(finished_error)?;
        *self.state = snapshot;
        Ok(())
    }
}

impl Drop for MemoryLedgerTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}
