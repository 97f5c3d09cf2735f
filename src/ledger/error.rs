//! Ledger Error Types
//!
//! Every failure path of the ledger returns one of these. The HTTP layer maps
//! them with [`LedgerError::code`] and [`LedgerError::http_status`].

use std::fmt;
use thiserror::Error;

use super::types::{Currency, UserId};

/// Which entry point required a missing attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Deposit,
    Withdrawal,
    Transaction,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Deposit => write!(f, "deposits"),
            Flow::Withdrawal => write!(f, "withdrawals"),
            Flow::Transaction => write!(f, "transactions"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Bank card is required for IRT {0}")]
    MissingBankCard(Flow),

    #[error("Transaction hash is required for USDT {0}")]
    MissingTransactionHash(Flow),

    #[error("Invalid bank card for this user")]
    InvalidBankCard,

    #[error("Invalid USDT transaction hash format")]
    InvalidTransactionHashFormat,

    #[error("{currency} transaction cannot carry a {attachment} attachment")]
    AttachmentMismatch {
        currency: Currency,
        attachment: &'static str,
    },

    #[error("Invalid price: buy and sell prices must be positive")]
    InvalidPrice,

    // === Balance / Pricing Errors ===
    #[error("Insufficient {0} balance")]
    InsufficientBalance(Currency),

    #[error("USDT price not found")]
    PriceUnavailable,

    // === Lookup / Lifecycle Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // === System Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal system error: {0}")]
    SystemError(String),
}

impl LedgerError {
    pub fn user_not_found(user_id: UserId) -> Self {
        LedgerError::NotFound(format!("user {}", user_id))
    }

    /// Missing and foreign transactions look the same to the caller
    pub fn transaction_not_found() -> Self {
        LedgerError::NotFound("transaction".to_string())
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::MissingBankCard(_) => "MISSING_BANK_CARD",
            LedgerError::MissingTransactionHash(_) => "MISSING_TRANSACTION_HASH",
            LedgerError::InvalidBankCard => "INVALID_BANK_CARD",
            LedgerError::InvalidTransactionHashFormat => "INVALID_TRANSACTION_HASH_FORMAT",
            LedgerError::AttachmentMismatch { .. } => "ATTACHMENT_MISMATCH",
            LedgerError::InvalidPrice => "INVALID_PRICE",
            LedgerError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            LedgerError::PriceUnavailable => "PRICE_UNAVAILABLE",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::InvalidState(_) => "INVALID_STATE",
            LedgerError::DatabaseError(_) => "DATABASE_ERROR",
            LedgerError::SystemError(_) => "SYSTEM_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::MissingBankCard(_)
            | LedgerError::MissingTransactionHash(_)
            | LedgerError::InvalidBankCard
            | LedgerError::InvalidTransactionHashFormat
            | LedgerError::AttachmentMismatch { .. }
            | LedgerError::InvalidPrice => 400,
            LedgerError::NotFound(_) => 404,
            LedgerError::InvalidState(_) => 409,
            LedgerError::InsufficientBalance(_) => 422,
            LedgerError::PriceUnavailable => 503,
            LedgerError::DatabaseError(_) | LedgerError::SystemError(_) => 500,
        }
    }

    /// True for failures raised before any storage work
    pub fn is_validation(&self) -> bool {
        self.http_status() == 400
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        LedgerError::SystemError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InvalidAmount.code(), "INVALID_AMOUNT");
        assert_eq!(
            LedgerError::InsufficientBalance(Currency::Fiat).code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(LedgerError::PriceUnavailable.code(), "PRICE_UNAVAILABLE");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(LedgerError::InvalidBankCard.http_status(), 400);
        assert_eq!(LedgerError::transaction_not_found().http_status(), 404);
        assert_eq!(LedgerError::InvalidState("x".into()).http_status(), 409);
        assert_eq!(
            LedgerError::InsufficientBalance(Currency::Crypto).http_status(),
            422
        );
        assert_eq!(LedgerError::SystemError("x".into()).http_status(), 500);
    }

    #[test]
    fn test_flow_specific_messages() {
        assert_eq!(
            LedgerError::MissingBankCard(Flow::Deposit).to_string(),
            "Bank card is required for IRT deposits"
        );
        assert_eq!(
            LedgerError::MissingTransactionHash(Flow::Withdrawal).to_string(),
            "Transaction hash is required for USDT withdrawals"
        );
        assert_eq!(
            LedgerError::InsufficientBalance(Currency::Fiat).to_string(),
            "Insufficient IRT balance"
        );
    }

    #[test]
    fn test_sqlx_conversion() {
        let err: LedgerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, LedgerError::DatabaseError(_)));
        assert!(!err.is_validation());
    }
}
