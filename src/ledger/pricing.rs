//! USDT Pricing
//!
//! The most recently published quote is authoritative. No caching and no
//! staleness window.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{Page, PricePage, PriceQuote};

/// Quotes are stored as `NUMERIC(30, 6)`
pub const PRICE_MAX_DECIMALS: u32 = 6;

fn valid_price(price: Decimal) -> bool {
    price > Decimal::ZERO && price.normalize().scale() <= PRICE_MAX_DECIMALS
}

pub struct PricingService {
    store: Arc<dyn LedgerStore>,
}

impl PricingService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn latest_price(&self) -> Result<Option<PriceQuote>, LedgerError> {
        self.store.latest_price().await
    }

    /// Latest quote or `PriceUnavailable`
    pub async fn require_latest_price(&self) -> Result<PriceQuote, LedgerError> {
        self.latest_price()
            .await?
            .ok_or(LedgerError::PriceUnavailable)
    }

    /// Publish a new quote (admin price feed)
    ///
    /// Both prices must be positive with at most six decimals.
    pub async fn publish_price(
        &self,
        buy_price: Decimal,
        sell_price: Decimal,
    ) -> Result<PriceQuote, LedgerError> {
        if !valid_price(buy_price) || !valid_price(sell_price) {
            return Err(LedgerError::InvalidPrice);
        }

        let quote = self.store.insert_price(buy_price, sell_price).await?;
        tracing::info!(
            price_id = %quote.id,
            buy_price = %quote.buy_price,
            sell_price = %quote.sell_price,
            "USDT price published"
        );
        Ok(quote)
    }

    /// Quote history, newest first
    pub async fn price_history(&self, page: Page) -> Result<PricePage, LedgerError> {
        self.store.list_prices(page).await
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
    async fn test_price_unavailable_until_published() {
        let pricing = PricingService::new(Arc::new(MemoryLedgerStore::new()));
        assert_eq!(
            pricing.require_latest_price().await,
            Err(LedgerError::PriceUnavailable)
        );

        pricing.publish_price(d("60000"), d("59000")).await.unwrap();
        let quote = pricing.publish_price(d("61000"), d("59500")).await.unwrap();

        assert_eq!(pricing.require_latest_price().await.unwrap(), quote);
        let history = pricing
            .price_history(Page { limit: 10, offset: 0 })
            .await
            .unwrap();
        assert_eq!(history.total_count, 2);
        assert_eq!(history.prices[0], quote);
    }

    #[tokio::test]
    async fn test_publish_rejects_non_positive() {
        let pricing = PricingService::new(Arc::new(MemoryLedgerStore::new()));
        assert_eq!(
            pricing.publish_price(Decimal::ZERO, d("1")).await,
            Err(LedgerError::InvalidPrice)
        );
        assert_eq!(
            pricing.publish_price(d("1"), d("-1")).await,
            Err(LedgerError::InvalidPrice)
        );
        assert!(pricing.latest_price().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_rejects_excess_precision() {
        let pricing = PricingService::new(Arc::new(MemoryLedgerStore::new()));
        assert_eq!(
            pricing.publish_price(d("60000.1234567"), d("59000")).await,
            Err(LedgerError::InvalidPrice)
        );
        assert!(pricing.latest_price().await.unwrap().is_none());

        let quote = pricing
            .publish_price(d("60000.123456"), d("59000.500000"))
            .await
            .unwrap();
        assert_eq!(quote.sell_price, d("59000.5"));
    }
}
