//! Input validation for amounts, chain references and card numbers
//!
//! All checks are pure and deterministic. Services call the `ensure_*`
//! wrappers, which turn a failed check into the matching [`LedgerError`].

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::Currency;

// ============================================================================
// Amounts
// ============================================================================

/// Check that an amount is positive and fits the currency precision
///
/// # Rules
/// - `amount <= 0` always fails
/// - FIAT (IRT): whole units only, `1000.00` counts as whole
/// - CRYPTO (USDT): at most 6 significant fractional digits
/// - unspecified currency: any positive amount passes
///
/// # Examples
/// ```
/// use irt_ledger::ledger::types::Currency;
/// use irt_ledger::ledger::validation::validate_amount;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let usdt = Decimal::from_str("5.123456").unwrap();
/// assert!(validate_amount(usdt, Some(Currency::Crypto)));
///
/// let too_precise = Decimal::from_str("5.1234567").unwrap();
/// assert!(!validate_amount(too_precise, Some(Currency::Crypto)));
/// ```
pub fn validate_amount(amount: Decimal, currency: Option<Currency>) -> bool {
    if amount <= Decimal::ZERO {
        return false;
    }

    match currency {
        // normalize() strips trailing zeros, so scale() is the significant digit count
        Some(currency) => amount.normalize().scale() <= currency.max_decimals(),
        None => true,
    }
}

pub fn ensure_amount(amount: Decimal, currency: Option<Currency>) -> Result<(), LedgerError> {
    if validate_amount(amount, currency) {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount)
    }
}

// ============================================================================
// Chain references
// ============================================================================

const TX_HASH_LEN: usize = 66;

/// Check a USDT transfer hash: `0x` followed by 64 hex digits
pub fn validate_transaction_hash(hash: &str) -> bool {
    if hash.len() != TX_HASH_LEN {
        return false;
    }

    match hash.strip_prefix("0x") {
        Some(digits) => digits.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn ensure_transaction_hash(hash: &str) -> Result<(), LedgerError> {
    if validate_transaction_hash(hash) {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransactionHashFormat)
    }
}

// ============================================================================
// Bank cards
// ============================================================================

const CARD_NUMBER_LEN: usize = 16;

/// Check a bank card number: exactly 16 ASCII digits
pub fn validate_card_number(card_number: &str) -> bool {
    card_number.len() == CARD_NUMBER_LEN && card_number.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_amount_must_be_positive() {
        for currency in [None, Some(Currency::Fiat), Some(Currency::Crypto)] {
            assert!(!validate_amount(Decimal::ZERO, currency));
            assert!(!validate_amount(d("-1"), currency));
        }
        assert!(validate_amount(d("0.000000001"), None));
    }

    #[test]
    fn test_fiat_whole_units() {
        assert!(validate_amount(d("1000"), Some(Currency::Fiat)));
        assert!(validate_amount(d("1000.00"), Some(Currency::Fiat)));
        assert!(!validate_amount(d("1000.5"), Some(Currency::Fiat)));
    }

    #[test]
    fn test_crypto_six_decimals() {
        assert!(validate_amount(d("5.123456"), Some(Currency::Crypto)));
        assert!(validate_amount(d("5.1234560"), Some(Currency::Crypto)));
        assert!(!validate_amount(d("5.1234567"), Some(Currency::Crypto)));
    }

    #[test]
    fn test_ensure_amount() {
        assert_eq!(
            ensure_amount(d("0.5"), Some(Currency::Fiat)),
            Err(LedgerError::InvalidAmount)
        );
        assert!(ensure_amount(d("0.5"), Some(Currency::Crypto)).is_ok());
    }

    #[test]
    fn test_transaction_hash() {
        assert!(validate_transaction_hash(&format!("0x{}", "a".repeat(64))));
        assert!(validate_transaction_hash(&format!("0x{}", "AbC019".repeat(10) + "dEf0")));
        assert!(!validate_transaction_hash(&format!("0x{}", "a".repeat(63))));
        assert!(!validate_transaction_hash(&format!("ab{}", "0".repeat(64))));
        assert!(!validate_transaction_hash(&format!("0x{}", "g".repeat(64))));
        assert!(!validate_transaction_hash(""));
        assert_eq!(
            ensure_transaction_hash("0x1"),
            Err(LedgerError::InvalidTransactionHashFormat)
        );
    }

    #[test]
    fn test_card_number() {
        assert!(validate_card_number("6037991234567890"));
        assert!(!validate_card_number("603799123456789"));
        assert!(!validate_card_number("6037-9912-3456-78"));
    }
}
