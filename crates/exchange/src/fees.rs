use exlink_core::utils::parse_decimal;
use exlink_core::{ExLinkError, MarketInfo, Result, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable withdrawal-fee schedule keyed by upper-case currency code.
#[derive(Debug, Clone, Default)]
pub struct FeeTable {
    withdrawal: Arc<HashMap<String, Decimal>>,
}

impl FeeTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map<K: AsRef<str>>(fees: impl IntoIterator<Item = (K, Decimal)>) -> Self {
        let withdrawal = fees
            .into_iter()
            .map(|(currency, fee)| (currency.as_ref().to_uppercase(), fee))
            .collect();
        Self {
            withdrawal: Arc::new(withdrawal),
        }
    }

    /// Parses a document with a `[withdrawal_fees]` table of
    /// `CURRENCY = fee` entries. Fees may be numbers or numeric strings.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let document: toml::Table = contents
            .parse()
            .map_err(|e: toml::de::Error| ExLinkError::InvalidRequest(format!("Invalid fee table: {}", e)))?;

        let Some(table) = document.get("withdrawal_fees") else {
            return Ok(Self::empty());
        };
        let table = table.as_table().ok_or_else(|| {
            ExLinkError::InvalidRequest("`withdrawal_fees` must be a table".to_string())
        })?;

        let mut fees = HashMap::with_capacity(table.len());
        for (currency, raw) in table {
            let fee = match raw {
                toml::Value::Integer(i) => Some(Decimal::from(*i)),
                toml::Value::Float(f) => parse_decimal(&f.to_string()),
                toml::Value::String(s) => parse_decimal(s.trim()),
                _ => None,
            }
            .ok_or_else(|| {
                ExLinkError::InvalidRequest(format!("Invalid withdrawal fee for {}: {}", currency, raw))
            })?;
            fees.insert(currency.clone(), fee);
        }

        debug!("Loaded {} withdrawal fees", fees.len());
        Ok(Self::from_map(fees))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn withdrawal_fee(&self, currency: &str) -> Option<Decimal> {
        self.withdrawal.get(&currency.to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.withdrawal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.withdrawal.is_empty()
    }
}

/// Trading and withdrawal fee estimates. Results are never negative.
#[derive(Debug, Clone, Default)]
pub struct FeeEstimator {
    table: FeeTable,
}

impl FeeEstimator {
    pub fn new(table: FeeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &FeeTable {
        &self.table
    }

    /// `fee_percent / 100 * price * amount` using the symbol's market entry.
    pub fn estimate_trade_fee(
        &self,
        market_info: &MarketInfo,
        symbol: &Symbol,
        price: Decimal,
        amount: Decimal,
    ) -> Result<Decimal> {
        let entry = market_info.get(symbol).ok_or_else(|| ExLinkError::FeeLookup {
            symbol: symbol.to_string(),
        })?;

        let fee = (entry.fee_percent / Decimal::ONE_HUNDRED)
            .checked_mul(price)
            .and_then(|fee| fee.checked_mul(amount))
            .ok_or_else(|| {
                ExLinkError::InvalidRequest(format!(
                    "Trade fee for {} at {} x {} is out of range",
                    symbol, price, amount
                ))
            })?;
        Ok(clamp_fee(fee, symbol.to_pair().as_str()))
    }

    /// Unknown currencies cost nothing to withdraw.
    pub fn estimate_withdrawal_fee(&self, currency: &str) -> Decimal {
        let fee = self.table.withdrawal_fee(currency).unwrap_or(Decimal::ZERO);
        clamp_fee(fee, currency)
    }
}

fn clamp_fee(fee: Decimal, subject: &str) -> Decimal {
    if fee.is_sign_negative() && !fee.is_zero() {
        warn!("Negative fee {} for {} clamped to zero", fee, subject);
        Decimal::ZERO
    } else {
        fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exlink_core::MarketInfoEntry;
    use rust_decimal_macros::dec;

    fn market_info(fee_percent: Decimal) -> MarketInfo {
        vec![(
            Symbol::new("ltc", "btc"),
            MarketInfoEntry {
                decimal_places: 6,
                min_amount: dec!(0.001),
                fee_percent,
                min_price: None,
                max_price: None,
                hidden: false,
            },
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_trade_fee() {
        let estimator = FeeEstimator::default();
        let fee = estimator
            .estimate_trade_fee(&market_info(dec!(0.2)), &Symbol::new("LTC", "BTC"), dec!(100), dec!(2))
            .unwrap();
        assert_eq!(fee, dec!(0.4));
    }

    #[test]
    fn test_trade_fee_lookup_is_case_insensitive() {
        let estimator = FeeEstimator::default();
        let symbol = Symbol::parse("Ltc_bTc").unwrap();
        let fee = estimator
            .estimate_trade_fee(&market_info(dec!(0.2)), &symbol, dec!(50), dec!(1))
            .unwrap();
        assert_eq!(fee, dec!(0.1));
    }

    #[test]
    fn test_trade_fee_out_of_range() {
        let estimator = FeeEstimator::default();
        let err = estimator
            .estimate_trade_fee(
                &market_info(dec!(0.2)),
                &Symbol::new("LTC", "BTC"),
                dec!(100000000000000000),
                dec!(100000000000000000),
            )
            .unwrap_err();
        assert!(matches!(err, ExLinkError::InvalidRequest(_)));
    }

    #[test]
    fn test_unknown_symbol_is_fee_lookup_error() {
        let estimator = FeeEstimator::default();
        let err = estimator
            .estimate_trade_fee(&market_info(dec!(0.2)), &Symbol::new("ETH", "BTC"), dec!(1), dec!(1))
            .unwrap_err();
        assert!(matches!(err, ExLinkError::FeeLookup { ref symbol } if symbol == "ETH/BTC"));
    }

    #[test]
    fn test_negative_fee_clamped() {
        let estimator = FeeEstimator::new(FeeTable::from_map([("XYZ", dec!(-1))]));
        assert_eq!(estimator.estimate_withdrawal_fee("xyz"), Decimal::ZERO);

        let fee = estimator
            .estimate_trade_fee(&market_info(dec!(-0.1)), &Symbol::new("LTC", "BTC"), dec!(10), dec!(1))
            .unwrap();
        assert_eq!(fee, Decimal::ZERO);
    }

    #[test]
    fn test_withdrawal_fee_from_toml() {
        let table = FeeTable::from_toml_str(
            r#"
            [withdrawal_fees]
            BTC = 0.0012
            eth = "0.01"
            AE = 10
            "#,
        )
        .unwrap();
        let estimator = FeeEstimator::new(table);

        assert_eq!(estimator.estimate_withdrawal_fee("btc"), dec!(0.0012));
        assert_eq!(estimator.estimate_withdrawal_fee("ETH"), dec!(0.01));
        assert_eq!(estimator.estimate_withdrawal_fee("AE"), dec!(10));
        assert_eq!(estimator.estimate_withdrawal_fee("DOGE"), Decimal::ZERO);
    }

    #[test]
    fn test_invalid_fee_table() {
        assert!(FeeTable::from_toml_str("[withdrawal_fees]\nBTC = true").is_err());
        assert!(FeeTable::from_toml_str("withdrawal_fees = 3").is_err());
        assert!(FeeTable::from_toml_str("").unwrap().is_empty());
    }
}
