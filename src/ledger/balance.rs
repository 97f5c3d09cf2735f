//! Balance Ledger
//!
//! Reads a user's balance pair and mutates it inside a caller-provided
//! [`LedgerTx`]. There is no autocommit mutation path.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Balances, Currency, Direction, UserId};
use super::validation::ensure_amount;

pub struct BalanceLedger {
    store: Arc<dyn LedgerStore>,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Point read; `NotFound` if the user does not exist
    pub async fn get_balances(&self, user_id: UserId) -> Result<Balances, LedgerError> {
        self.store
            .balances(user_id)
            .await?
            .ok_or_else(|| LedgerError::user_not_found(user_id))
    }

    /// Apply one balance leg inside `tx` and return the post-mutation balances
    ///
    /// `Subtract` is a guarded decrement: it fails with `InsufficientBalance`
    /// instead of driving the balance negative.
    pub async fn update_balance(
        tx: &mut dyn LedgerTx,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        direction: Direction,
    ) -> Result<Balances, LedgerError> {
        ensure_amount(amount, Some(currency))?;

        let result = match direction {
            Direction::Add => tx.credit(user_id, currency, amount).await,
            Direction::Subtract => tx.debit(user_id, currency, amount).await,
        };

        match &result {
            Ok(balances) => tracing::debug!(
                user_id,
                currency = %currency,
                amount = %amount,
                direction = %direction,
                balance = %balances.get(currency),
                "Balance updated"
            ),
            Err(e) => tracing::debug!(
                user_id,
                currency = %currency,
                amount = %amount,
                direction = %direction,
                error = %e,
                "Balance update rejected"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::store::MemoryLedgerStore;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_get_balances() {
        let store = MemoryLedgerStore::new();
        store.create_user(1001, Balances::new(d("250"), d("1.25"))).await;
        let ledger = BalanceLedger::new(Arc::new(store));

        let balances = ledger.get_balances(1001).await.unwrap();
        assert_eq!(balances, Balances::new(d("250"), d("1.25")));
        assert!(matches!(
            ledger.get_balances(404).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_balance_directions() {
        let store = MemoryLedgerStore::new();
        store.create_user(1001, Balances::new(d("100"), d("0"))).await;

        let mut tx = store.begin().await.unwrap();
        let after_add = BalanceLedger::update_balance(
            tx.as_mut(),
            1001,
            Currency::Crypto,
            d("0.000001"),
            Direction::Add,
        )
        .await
        .unwrap();
        assert_eq!(after_add.crypto, d("0.000001"));

        let after_sub = BalanceLedger::update_balance(
            tx.as_mut(),
            1001,
            Currency::Fiat,
            d("100"),
            Direction::Subtract,
        )
        .await
        .unwrap();
        assert_eq!(after_sub.fiat, Decimal::ZERO);

        let rejected = BalanceLedger::update_balance(
            tx.as_mut(),
            1001,
            Currency::Fiat,
            d("1"),
            Direction::Subtract,
        )
        .await;
        assert_eq!(rejected, Err(LedgerError::InsufficientBalance(Currency::Fiat)));
    }

    #[tokio::test]
    async fn test_update_balance_revalidates_amount() {
        let store = MemoryLedgerStore::new();
        store.create_user(1001, Balances::default()).await;

        let mut tx = store.begin().await.unwrap();
        for (currency, amount) in [(Currency::Fiat, "0.5"), (Currency::Crypto, "-1")] {
            let result = BalanceLedger::update_balance(
                tx.as_mut(),
                1001,
                currency,
                d(amount),
                Direction::Add,
            )
            .await;
            assert_eq!(result, Err(LedgerError::InvalidAmount));
        }
    }
}
