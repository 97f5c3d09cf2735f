//! System Capacity
//!
//! Admin CAPACITY transactions raise the issued capacity of a currency. The
//! record and the capacity row are written in one storage transaction.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use super::error::LedgerError;
use super::state::TransactionStatus;
use super::store::LedgerStore;
use super::types::{
    Currency, NewTransaction, SystemCapacity, TransactionFilter, TransactionPage,
    TransactionRecord, TransactionType, UserId,
};
use super::validation::ensure_amount;
use crate::config::LedgerConfig;

/// Result of a capacity increase
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReceipt {
    pub record: TransactionRecord,
    pub capacity: SystemCapacity,
}

pub struct CapacityService {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl CapacityService {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub async fn create_capacity_transaction(
        &self,
        admin_user_id: UserId,
        currency: Currency,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<CapacityReceipt, LedgerError> {
        ensure_amount(amount, Some(currency))?;

        let description = description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Admin capacity increase for {}", currency));
        let new = NewTransaction::new(
            admin_user_id,
            TransactionType::Capacity,
            currency,
            amount,
            TransactionStatus::Completed,
            Some(description),
            None,
        )?;

        let mut tx = self.store.begin().await?;
        let record = tx.insert_transaction(new).await?;
        let capacity = tx.add_capacity(currency, amount).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %record.id,
            admin_user_id,
            currency = %currency,
            amount = %amount,
            total = %capacity.amount,
            "Capacity increased"
        );

        Ok(CapacityReceipt { record, capacity })
    }

    /// Capacity rows ordered by currency
    pub async fn capacity_stats(&self) -> Result<Vec<SystemCapacity>, LedgerError> {
        self.store.capacities().await
    }

    /// CAPACITY records of every admin, newest first
    pub async fn capacity_transactions(
        &self,
        currency: Option<Currency>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<TransactionPage, LedgerError> {
        let filter = TransactionFilter {
            tx_type: Some(TransactionType::Capacity),
            currency,
            ..Default::default()
        };
        self.store
            .list_transactions(None, &filter, self.config.page(limit, offset))
            .await
    }
}
