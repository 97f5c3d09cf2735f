//! Money-Movement Operations
//!
//! Deposit, withdrawal, buy and sell. Each call validates its input, then
//! applies every balance leg and the COMPLETED record in one storage
//! transaction. Any failure drops the transaction, leaving no record and no
//! balance change.

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::balance::BalanceLedger;
use super::error::{Flow, LedgerError};
use super::pricing::PricingService;
use super::state::TransactionStatus;
use super::store::LedgerStore;
use super::types::{
    Attachment, AttachmentFields, Currency, Direction, NewTransaction, TransactionRecord,
    TransactionType, UserId,
};
use super::validation::ensure_amount;

/// Input of a deposit or withdrawal
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub user_id: UserId,
    pub currency: Currency,
    pub amount: Decimal,
    pub description: Option<String>,
    pub attachment: AttachmentFields,
}

pub type DepositRequest = MovementRequest;
pub type WithdrawalRequest = MovementRequest;

impl MovementRequest {
    pub fn new(user_id: UserId, currency: Currency, amount: Decimal) -> Self {
        Self {
            user_id,
            currency,
            amount,
            description: None,
            attachment: AttachmentFields::default(),
        }
    }

    /// IRT movement through a bank card
    pub fn fiat(user_id: UserId, amount: Decimal, bank_card_id: Uuid) -> Self {
        Self::new(user_id, Currency::Fiat, amount).with_bank_card(bank_card_id)
    }

    /// USDT movement referencing an on-chain transfer
    pub fn crypto(user_id: UserId, amount: Decimal, tx_hash: impl Into<String>) -> Self {
        Self::new(user_id, Currency::Crypto, amount).with_chain(tx_hash, None, None)
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

type Leg = (Currency, Decimal, Direction);

pub struct MoneyMovement {
    store: Arc<dyn LedgerStore>,
    pricing: PricingService,
}

impl MoneyMovement {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            store,
        }
    }

    /// Credit an external deposit
    ///
    /// FIAT requires a bank card of the user, CRYPTO a transaction hash.
    pub async fn process_deposit(
        &self,
        req: DepositRequest,
    ) -> Result<TransactionRecord, LedgerError> {
        self.process_movement(req, TransactionType::Deposit, Flow::Deposit, Direction::Add)
            .await
    }

    /// Debit an external withdrawal
    ///
    /// Fails with `InsufficientBalance` if the balance is below `amount` at
    /// the moment of the guarded decrement.
    pub async fn process_withdrawal(
        &self,
        req: WithdrawalRequest,
    ) -> Result<TransactionRecord, LedgerError> {
        self.process_movement(
            req,
            TransactionType::Withdrawal,
            Flow::Withdrawal,
            Direction::Subtract,
        )
        .await
    }

    /// Buy `amount_crypto` USDT at the latest buy price
    ///
    /// The IRT cost is `amount_crypto * buy_price` unrounded; a cost that is
    /// not a whole toman fails the IRT leg with `InvalidAmount`.
    pub async fn process_buy_crypto(
        &self,
        user_id: UserId,
        amount_crypto: Decimal,
        description: Option<String>,
    ) -> Result<TransactionRecord, LedgerError> {
        ensure_amount(amount_crypto, Some(Currency::Crypto))?;

        let quote = self.pricing.require_latest_price().await?;
        let amount_fiat = amount_crypto
            .checked_mul(quote.buy_price)
            .ok_or(LedgerError::InvalidAmount)?;

        let description = description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Buy {} USDT at {} IRT", amount_crypto, quote.buy_price));
        let new = NewTransaction::new(
            user_id,
            TransactionType::BuyCrypto,
            Currency::Crypto,
            amount_crypto,
            TransactionStatus::Completed,
            Some(description),
            None,
        )?;

        let record = self
            .execute(
                new,
                &[
                    (Currency::Fiat, amount_fiat, Direction::Subtract),
                    (Currency::Crypto, amount_crypto, Direction::Add),
                ],
            )
            .await?;

        tracing::info!(
            transaction_id = %record.id,
            user_id,
            amount_crypto = %amount_crypto,
            amount_fiat = %amount_fiat,
            price_id = %quote.id,
            "USDT bought"
        );
        Ok(record)
    }

    /// Sell `amount_crypto` USDT at the latest sell price
    ///
    /// Proceeds are not rounded: a fractional IRT leg fails with
    /// `InvalidAmount` and the crypto debit is rolled back.
    pub async fn process_sell_crypto(
        &self,
        user_id: UserId,
        amount_crypto: Decimal,
        description: Option<String>,
    ) -> Result<TransactionRecord, LedgerError> {
        ensure_amount(amount_crypto, Some(Currency::Crypto))?;

        let quote = self.pricing.require_latest_price().await?;
        let amount_fiat = amount_crypto
            .checked_mul(quote.sell_price)
            .ok_or(LedgerError::InvalidAmount)?;

        let description = description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Sell {} USDT at {} IRT", amount_crypto, quote.sell_price));
        let new = NewTransaction::new(
            user_id,
            TransactionType::SellCrypto,
            Currency::Crypto,
            amount_crypto,
            TransactionStatus::Completed,
            Some(description),
            None,
        )?;

        let record = self
            .execute(
                new,
                &[
                    (Currency::Crypto, amount_crypto, Direction::Subtract),
                    (Currency::Fiat, amount_fiat, Direction::Add),
                ],
            )
            .await?;

        tracing::info!(
            transaction_id = %record.id,
            user_id,
            amount_crypto = %amount_crypto,
            amount_fiat = %amount_fiat,
            price_id = %quote.id,
            "USDT sold"
        );
        Ok(record)
    }

    async fn process_movement(
        &self,
        req: MovementRequest,
        tx_type: TransactionType,
        flow: Flow,
        direction: Direction,
    ) -> Result<TransactionRecord, LedgerError> {
        ensure_amount(req.amount, Some(req.currency))?;

        let attachment = req.attachment.require(req.currency, flow)?;
        if let Attachment::BankCard { bank_card_id } = &attachment {
            let owner = self.store.bank_card_owner(*bank_card_id).await?;
            if owner != Some(req.user_id) {
                return Err(LedgerError::InvalidBankCard);
            }
        }

        let new = NewTransaction::new(
            req.user_id,
            tx_type,
            req.currency,
            req.amount,
            TransactionStatus::Completed,
            req.description,
            Some(attachment),
        )?;

        let record = self
            .execute(new, &[(req.currency, req.amount, direction)])
            .await?;

        tracing::info!(
            transaction_id = %record.id,
            user_id = record.user_id,
            tx_type = %tx_type,
            currency = %record.currency,
            amount = %record.amount,
            "Money movement committed"
        );
        Ok(record)
    }

    /// Apply `legs` and insert the record in one storage transaction
    async fn execute(
        &self,
        new: NewTransaction,
        legs: &[Leg],
    ) -> Result<TransactionRecord, LedgerError> {
        let user_id = new.user_id();
        let mut tx = self.store.begin().await?;

        for &(currency, amount, direction) in legs {
            BalanceLedger::update_balance(tx.as_mut(), user_id, currency, amount, direction)
                .await?;
        }
        let record = tx.insert_transaction(new).await?;
        tx.commit().await?;

        Ok(record)
    }
}
