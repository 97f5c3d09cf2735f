//! Transaction Record Store
//!
//! PENDING records and their lifecycle. Lookups are ownership-scoped: a
//! record of another user is reported as `NotFound`.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{Flow, LedgerError};
use super::state::TransactionStatus;
use super::store::LedgerStore;
use super::types::{
    Attachment, AttachmentFields, Currency, NewTransaction, TransactionFilter, TransactionPage,
    TransactionRecord, TransactionType, UserId,
};
use super::validation::{ensure_amount, ensure_transaction_hash};
use crate::config::LedgerConfig;

/// Input of [`TransactionRecords::create_transaction`]
#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    pub user_id: UserId,
    pub tx_type: TransactionType,
    pub currency: Currency,
    pub amount: Decimal,
    pub description: Option<String>,
    pub attachment: AttachmentFields,
}

impl CreateTransactionRequest {
    pub fn new(
        user_id: UserId,
        tx_type: TransactionType,
        currency: Currency,
        amount: Decimal,
    ) -> Self {
        Self {
            user_id,
            tx_type,
            currency,
            amount,
            description: None,
            attachment: AttachmentFields::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_bank_card(mut self, bank_card_id: Uuid) -> Self {
        self.attachment.bank_card_id = Some(bank_card_id);
        self
    }

    pub fn with_chain(
        mut self,
        tx_hash: impl Into<String>,
        from_address: Option<String>,
        to_address: Option<String>,
    ) -> Self {
        self.attachment.tx_hash = Some(tx_hash.into());
        self.attachment.from_address = from_address;
        self.attachment.to_address = to_address;
        self
    }
}

/// `"{description} {notes}"`, or just the notes when there is no description
fn append_notes(description: Option<&str>, notes: &str) -> String {
    match description {
        Some(existing) if !existing.is_empty() => format!("{} {}", existing, notes),
        _ => notes.to_string(),
    }
}

pub struct TransactionRecords {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl TransactionRecords {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Record a PENDING transaction; balances are not touched
    ///
    /// FIAT requires a bank card owned by the user, CRYPTO requires a
    /// well-formed transaction hash.
    pub async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
    ) -> Result<TransactionRecord, LedgerError> {
        ensure_amount(req.amount, Some(req.currency))?;

        let attachment = req.attachment.require(req.currency, Flow::Transaction)?;
        match &attachment {
            Attachment::BankCard { bank_card_id } => {
                let owner = self.store.bank_card_owner(*bank_card_id).await?;
                if owner != Some(req.user_id) {
                    return Err(LedgerError::InvalidBankCard);
                }
            }
            Attachment::Chain { tx_hash, .. } => ensure_transaction_hash(tx_hash)?,
        }

        let new = NewTransaction::new(
            req.user_id,
            req.tx_type,
            req.currency,
            req.amount,
            TransactionStatus::Pending,
            req.description,
            Some(attachment),
        )?;
        let record = self.store.insert_transaction(new).await?;

        tracing::info!(
            transaction_id = %record.id,
            user_id = record.user_id,
            tx_type = %record.tx_type,
            currency = %record.currency,
            amount = %record.amount,
            "Pending transaction created"
        );

        Ok(record)
    }

    /// Ownership-scoped lookup
    pub async fn get_transaction_by_id(
        &self,
        id: Uuid,
        user_id: UserId,
    ) -> Result<TransactionRecord, LedgerError> {
        match self.store.get_transaction(id).await? {
            Some(record) if record.user_id == user_id => Ok(record),
            _ => Err(LedgerError::transaction_not_found()),
        }
    }

    /// A user's history, newest first
    ///
    /// `limit` defaults to the configured page size and is clamped to
    /// `1..=max_page_limit`; a negative `offset` is treated as 0.
    pub async fn get_transactions(
        &self,
        user_id: UserId,
        filter: &TransactionFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<TransactionPage, LedgerError> {
        self.store
            .list_transactions(Some(user_id), filter, self.config.page(limit, offset))
            .await
    }

    /// Move a transaction along a legal edge and append `notes`
    pub async fn update_transaction_status(
        &self,
        id: Uuid,
        user_id: UserId,
        new_status: TransactionStatus,
        notes: Option<&str>,
    ) -> Result<TransactionRecord, LedgerError> {
        let current = self.get_transaction_by_id(id, user_id).await?;
        current.status.transition(new_status)?;

        let description = notes
            .filter(|n| !n.is_empty())
            .map(|n| append_notes(current.description.as_deref(), n));

        self.apply_status(&current, new_status, description.as_deref())
            .await
    }

    /// Cancel a PENDING transaction; balances are untouched
    pub async fn cancel_transaction(
        &self,
        id: Uuid,
        user_id: UserId,
    ) -> Result<TransactionRecord, LedgerError> {
        let current = self.get_transaction_by_id(id, user_id).await?;
        if current.status != TransactionStatus::Pending {
            return Err(LedgerError::InvalidState(
                "only pending transactions can be cancelled".to_string(),
            ));
        }

        self.apply_status(&current, TransactionStatus::Cancelled, None)
            .await
    }

    async fn apply_status(
        &self,
        current: &TransactionRecord,
        new_status: TransactionStatus,
        description: Option<&str>,
    ) -> Result<TransactionRecord, LedgerError> {
        let updated = self
            .store
            .update_status_if(current.id, current.status, new_status, description)
            .await?;

        match updated {
            Some(record) => {
                tracing::info!(
                    transaction_id = %record.id,
                    from = %current.status,
                    to = %record.status,
                    "Transaction status updated"
                );
                Ok(record)
            }
            None => {
                tracing::warn!(
                    transaction_id = %current.id,
                    expected = %current.status,
                    to = %new_status,
                    "Status CAS lost, transaction changed concurrently"
                );
                Err(LedgerError::InvalidState(format!(
                    "transaction is no longer {}",
                    current.status
                )))
            }
        }
    }
}
