use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account funds keyed by upper-case currency code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub available: HashMap<String, Decimal>,
    /// Available plus amounts locked in open orders, when the venue reports it.
    pub including_orders: Option<HashMap<String, Decimal>>,
}

impl Balance {
    pub fn new(available: HashMap<String, Decimal>) -> Self {
        Self {
            available: normalize_codes(available),
            including_orders: None,
        }
    }

    pub fn with_orders(mut self, including_orders: HashMap<String, Decimal>) -> Self {
        self.including_orders = Some(normalize_codes(including_orders));
        self
    }

    pub fn available(&self, currency: &str) -> Decimal {
        self.available
            .get(&currency.to_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self, currency: &str) -> Option<Decimal> {
        self.including_orders
            .as_ref()
            .map(|funds| funds.get(&currency.to_uppercase()).copied().unwrap_or(Decimal::ZERO))
    }
}

/// Codes differing only in case are merged; their sum saturates at the
/// `Decimal` bounds.
fn normalize_codes(funds: HashMap<String, Decimal>) -> HashMap<String, Decimal> {
    let mut normalized: HashMap<String, Decimal> = HashMap::with_capacity(funds.len());
    for (currency, amount) in funds {
        let entry = normalized.entry(currency.to_uppercase()).or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(amount);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_codes_are_uppercased() {
        let balance = Balance::new(HashMap::from([("ltc".to_string(), dec!(22))]))
            .with_orders(HashMap::from([("ltc".to_string(), dec!(25))]));

        assert_eq!(balance.available("LTC"), dec!(22));
        assert_eq!(balance.available("ltc"), dec!(22));
        assert_eq!(balance.total("LTC"), Some(dec!(25)));
        assert_eq!(balance.available("BTC"), Decimal::ZERO);
    }

    #[test]
    fn test_merged_codes_saturate() {
        let balance = Balance::new(HashMap::from([
            ("btc".to_string(), Decimal::MAX),
            ("BTC".to_string(), dec!(1)),
        ]));
        assert_eq!(balance.available("BTC"), Decimal::MAX);
    }

    #[test]
    fn test_total_absent_without_order_funds() {
        let balance = Balance::new(HashMap::new());
        assert_eq!(balance.total("BTC"), None);
    }
}
