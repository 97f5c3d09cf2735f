//! Ledger Core Types
//!
//! Records, balances, quotes and the query shapes shared by every store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::{Flow, LedgerError};
use super::state::TransactionStatus;

/// External user identifier (owner of the balance pair)
pub type UserId = i64;

/// Ledger currency
///
/// FIAT is the Iranian toman (IRT, whole units only), CRYPTO is USDT
/// (up to 6 fractional digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i16)]
pub enum Currency {
    Fiat = 1,
    Crypto = 2,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Fiat, Currency::Crypto];

    /// Get numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Currency::Fiat),
            2 => Some(Currency::Crypto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Fiat => "FIAT",
            Currency::Crypto => "CRYPTO",
        }
    }

    /// Concrete asset symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Fiat => "IRT",
            Currency::Crypto => "USDT",
        }
    }

    /// Maximum number of significant fractional digits
    pub fn max_decimals(&self) -> u32 {
        match self {
            Currency::Fiat => 0,
            Currency::Crypto => 6,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIAT" | "IRT" | "1" => Ok(Currency::Fiat),
            "CRYPTO" | "USDT" | "2" => Ok(Currency::Crypto),
            _ => Err(format!("Invalid currency: {}", s)),
        }
    }
}

/// Kind of ledger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TransactionType {
    Deposit = 1,
    Withdrawal = 2,
    Transfer = 3,
    BuyCrypto = 4,
    SellCrypto = 5,
    Capacity = 6,
}

impl TransactionType {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TransactionType::Deposit),
            2 => Some(TransactionType::Withdrawal),
            3 => Some(TransactionType::Transfer),
            4 => Some(TransactionType::BuyCrypto),
            5 => Some(TransactionType::SellCrypto),
            6 => Some(TransactionType::Capacity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::BuyCrypto => "BUY_CRYPTO",
            TransactionType::SellCrypto => "SELL_CRYPTO",
            TransactionType::Capacity => "CAPACITY",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "BUY_CRYPTO" | "BUY_USDT" => Ok(TransactionType::BuyCrypto),
            "SELL_CRYPTO" | "SELL_USDT" => Ok(TransactionType::SellCrypto),
            "CAPACITY" => Ok(TransactionType::Capacity),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Currency-specific reference carried by a record
///
/// A FIAT record may only point at a bank card, a CRYPTO record only at an
/// on-chain transfer. [`NewTransaction::new`] enforces the pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    BankCard {
        bank_card_id: Uuid,
    },
    Chain {
        tx_hash: String,
        from_address: Option<String>,
        to_address: Option<String>,
    },
}

impl Attachment {
    /// Currency this attachment belongs to
    pub fn currency(&self) -> Currency {
        match self {
            Attachment::BankCard { .. } => Currency::Fiat,
            Attachment::Chain { .. } => Currency::Crypto,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Attachment::BankCard { .. } => "bank card",
            Attachment::Chain { .. } => "chain",
        }
    }

    /// Keep only the fields relevant to `currency`
    ///
    /// Used both for caller input and for rebuilding rows, where the columns
    /// are nullable.
    pub fn from_parts(
        currency: Currency,
        bank_card_id: Option<Uuid>,
        tx_hash: Option<String>,
        from_address: Option<String>,
        to_address: Option<String>,
    ) -> Option<Self> {
        match currency {
            Currency::Fiat => bank_card_id.map(|bank_card_id| Attachment::BankCard { bank_card_id }),
            Currency::Crypto => tx_hash.map(|tx_hash| Attachment::Chain {
                tx_hash,
                from_address,
                to_address,
            }),
        }
    }

    pub fn bank_card_id(&self) -> Option<Uuid> {
        match self {
            Attachment::BankCard { bank_card_id } => Some(*bank_card_id),
            Attachment::Chain { .. } => None,
        }
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Attachment::Chain { tx_hash, .. } => Some(tx_hash),
            Attachment::BankCard { .. } => None,
        }
    }

    pub fn from_address(&self) -> Option<&str> {
        match self {
            Attachment::Chain { from_address, .. } => from_address.as_deref(),
            Attachment::BankCard { .. } => None,
        }
    }

    pub fn to_address(&self) -> Option<&str> {
        match self {
            Attachment::Chain { to_address, .. } => to_address.as_deref(),
            Attachment::BankCard { .. } => None,
        }
    }
}

/// Raw, possibly incomplete attachment input of a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFields {
    pub bank_card_id: Option<Uuid>,
    pub tx_hash: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
}

impl AttachmentFields {
    /// Build the attachment required by `currency`
    ///
    /// Fields of the other currency are dropped. An empty hash counts as
    /// missing.
    pub fn require(self, currency: Currency, flow: Flow) -> Result<Attachment, LedgerError> {
        let tx_hash = self.tx_hash.filter(|h| !h.is_empty());
        Attachment::from_parts(
            currency,
            self.bank_card_id,
            tx_hash,
            self.from_address,
            self.to_address,
        )
        .ok_or(match currency {
            Currency::Fiat => LedgerError::MissingBankCard(flow),
            Currency::Crypto => LedgerError::MissingTransactionHash(flow),
        })
    }
}

/// A record about to be inserted
///
/// Fields are private so the attachment/currency pairing can only be
/// established through `new()`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    user_id: UserId,
    tx_type: TransactionType,
    currency: Currency,
    amount: Decimal,
    status: TransactionStatus,
    description: Option<String>,
    attachment: Option<Attachment>,
}

impl NewTransaction {
    pub fn new(
        user_id: UserId,
        tx_type: TransactionType,
        currency: Currency,
        amount: Decimal,
        status: TransactionStatus,
        description: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Self, LedgerError> {
        if let Some(attachment) = &attachment {
            if attachment.currency() != currency {
                return Err(LedgerError::AttachmentMismatch {
                    currency,
                    attachment: attachment.kind(),
                });
            }
        }

        Ok(Self {
            user_id,
            tx_type,
            currency,
            amount,
            status,
            description,
            attachment,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Materialize with a fresh id and timestamps (stores without `RETURNING`)
    pub fn into_record(self) -> TransactionRecord {
        let now = Utc::now();
        TransactionRecord {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            tx_type: self.tx_type,
            currency: self.currency,
            amount: self.amount,
            status: self.status,
            description: self.description,
            attachment: self.attachment,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored ledger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub tx_type: TransactionType,
    pub currency: Currency,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction[{}] {} user={} amount={} {} status={}",
            self.id, self.tx_type, self.user_id, self.amount, self.currency, self.status
        )
    }
}

/// A user's balance pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    pub fiat: Decimal,
    pub crypto: Decimal,
}

impl Balances {
    pub fn new(fiat: Decimal, crypto: Decimal) -> Self {
        Self { fiat, crypto }
    }

    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Fiat => self.fiat,
            Currency::Crypto => self.crypto,
        }
    }

    pub(crate) fn get_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::Fiat => &mut self.fiat,
            Currency::Crypto => &mut self.crypto,
        }
    }
}

/// Balance mutation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Add,
    Subtract,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Add => write!(f, "add"),
            Direction::Subtract => write!(f, "subtract"),
        }
    }
}

/// History filters; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub tx_type: Option<TransactionType>,
    pub currency: Option<Currency>,
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub created_to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.tx_type.is_none_or(|t| record.tx_type == t)
            && self.currency.is_none_or(|c| record.currency == c)
            && self.status.is_none_or(|s| record.status == s)
            && self.created_from.is_none_or(|from| record.created_at >= from)
            && self.created_to.is_none_or(|to| record.created_at <= to)
    }
}

/// Resolved `LIMIT` / `OFFSET`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// One page of history plus the unpaginated count
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionRecord>,
    pub total_count: i64,
}

/// USDT quote in IRT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub id: Uuid,
    /// IRT paid per USDT when the user buys
    pub buy_price: Decimal,
    /// IRT received per USDT when the user sells
    pub sell_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PricePage {
    pub prices: Vec<PriceQuote>,
    pub total_count: i64,
}

/// Issued capacity for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCapacity {
    pub currency: Currency,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Bank card as seen by the ledger (ownership only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankCard {
    pub id: Uuid,
    pub user_id: UserId,
    pub card_number: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}
