use chrono::Utc;
use exlink_core::prelude::*;
use exlink_core::utils::{unix_decimal_to_datetime, NumericField, PolymorphicMap};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct MarketInfoResponse {
    /// A list of single-key objects: `[{"eth_btc": {...}}, ...]`.
    #[serde(default)]
    pub pairs: Vec<HashMap<String, MarketInfoRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct MarketInfoRecord {
    pub decimal_places: NumericField,
    pub min_amount: NumericField,
    pub fee: NumericField,
}

impl MarketInfoRecord {
    pub fn into_entry(self) -> std::result::Result<MarketInfoEntry, DecodeError> {
        Ok(MarketInfoEntry {
            decimal_places: self.decimal_places.to_u32("decimal_places")?,
            min_amount: self.min_amount.to_decimal("min_amount")?,
            fee_percent: self.fee.to_decimal("fee")?,
            min_price: None,
            max_price: None,
            hidden: false,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerRecord {
    pub last: NumericField,
    pub lowest_ask: NumericField,
    pub highest_bid: NumericField,
    pub percent_change: Option<NumericField>,
    pub base_volume: NumericField,
    pub quote_volume: NumericField,
    pub high24hr: NumericField,
    pub low24hr: NumericField,
}

impl TickerRecord {
    /// Gate reports no average or timestamp; the average is the 24h midpoint
    /// and the ticker is stamped with the local receive time.
    pub fn into_ticker(self, symbol: Symbol) -> std::result::Result<Ticker, DecodeError> {
        let high = self.high24hr.to_decimal("high24hr")?;
        let low = self.low24hr.to_decimal("low24hr")?;
        let average = high
            .checked_add(low)
            .and_then(|sum| sum.checked_div(Decimal::TWO))
            .ok_or_else(|| DecodeError::InvalidNumber {
                field: "high24hr+low24hr".to_string(),
                value: format!("{} + {}", high, low),
            })?;

        Ok(Ticker {
            symbol,
            last: self.last.to_decimal("last")?,
            high,
            low,
            average,
            buy: self.highest_bid.to_decimal("highestBid")?,
            sell: self.lowest_ask.to_decimal("lowestAsk")?,
            base_volume: self.base_volume.to_decimal("baseVolume")?,
            quote_volume: self.quote_volume.to_decimal("quoteVolume")?,
            updated_at: Utc::now(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderbookResponse {
    #[serde(default)]
    pub asks: Vec<Value>,
    #[serde(default)]
    pub bids: Vec<Value>,
    pub elapsed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BalancesResponse {
    #[serde(default)]
    pub available: PolymorphicMap,
    #[serde(default)]
    pub locked: PolymorphicMap,
}

impl BalancesResponse {
    pub fn into_balance(self) -> std::result::Result<Balance, DecodeError> {
        let available = self.available.to_decimal_map("available")?;
        let locked = self.locked.to_decimal_map("locked")?;

        let mut including_orders = available.clone();
        for (currency, amount) in locked {
            let total = including_orders.entry(currency.clone()).or_insert(Decimal::ZERO);
            *total = total
                .checked_add(amount)
                .ok_or_else(|| DecodeError::InvalidNumber {
                    field: format!("locked.{}", currency),
                    value: amount.to_string(),
                })?;
        }

        Ok(Balance::new(available).with_orders(including_orders))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_number: NumericField,
    pub filled_amount: Option<NumericField>,
    pub left_amount: Option<NumericField>,
}

impl PlaceOrderResponse {
    pub fn into_result(self) -> std::result::Result<OrderResult, DecodeError> {
        Ok(OrderResult {
            order_id: self.order_number.as_text(),
            filled_amount: self
                .filled_amount
                .map(|v| v.to_decimal("filledAmount"))
                .transpose()?,
            remaining_amount: self
                .left_amount
                .map(|v| v.to_decimal("leftAmount"))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenOrdersResponse {
    #[serde(default)]
    pub orders: Vec<OpenOrderRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderRecord {
    pub order_number: NumericField,
    pub currency_pair: String,
    #[serde(rename = "type")]
    pub side: String,
    pub rate: NumericField,
    pub amount: NumericField,
    pub filled_amount: Option<NumericField>,
    pub timestamp: Option<NumericField>,
}

impl OpenOrderRecord {
    pub fn into_order(self) -> std::result::Result<OpenOrder, DecodeError> {
        let symbol = Symbol::parse(&self.currency_pair).ok_or_else(|| {
            DecodeError::UnexpectedShape(format!("invalid currencyPair: {}", self.currency_pair))
        })?;
        let side = OrderSide::parse(&self.side).ok_or_else(|| DecodeError::InvalidFlag {
            field: "type".to_string(),
            value: self.side.clone(),
        })?;
        let created_at = match &self.timestamp {
            Some(raw) => unix_decimal_to_datetime(raw.to_decimal("timestamp")?),
            None => None,
        };

        Ok(OpenOrder {
            order_id: self.order_number.as_text(),
            symbol,
            side,
            price: self.rate.to_decimal("rate")?,
            amount: self.amount.to_decimal("amount")?,
            filled_amount: self
                .filled_amount
                .map(|v| v.to_decimal("filledAmount"))
                .transpose()?,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_ticker_average_is_midpoint() {
        let record: TickerRecord = serde_json::from_value(json!({
            "result": "true",
            "last": "0.0125",
            "lowestAsk": 0.0126,
            "highestBid": "0.0124",
            "percentChange": "-1.5",
            "baseVolume": "12.5",
            "quoteVolume": 1000,
            "high24hr": "0.013",
            "low24hr": "0.012"
        }))
        .unwrap();

        let ticker = record.into_ticker(Symbol::new("LTC", "BTC")).unwrap();
        assert_eq!(ticker.last, dec!(0.0125));
        assert_eq!(ticker.sell, dec!(0.0126));
        assert_eq!(ticker.buy, dec!(0.0124));
        assert_eq!(ticker.average, dec!(0.0125));
        assert_eq!(ticker.quote_volume, dec!(1000));
    }

    #[test]
    fn test_ticker_average_out_of_range() {
        let record: TickerRecord = serde_json::from_value(json!({
            "result": "true",
            "last": "1",
            "lowestAsk": "1",
            "highestBid": "1",
            "percentChange": "0",
            "baseVolume": "0",
            "quoteVolume": "0",
            "high24hr": "79228162514264337593543950335",
            "low24hr": "79228162514264337593543950335"
        }))
        .unwrap();

        let err = record.into_ticker(Symbol::new("LTC", "BTC")).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { ref field, .. } if field.contains("high24hr")));
    }

    #[test]
    fn test_balances_with_empty_lists() {
        let response: BalancesResponse =
            serde_json::from_value(json!({"result": "true", "available": [], "locked": []}))
                .unwrap();
        let balance = response.into_balance().unwrap();

        assert!(balance.available.is_empty());
        assert_eq!(balance.total("BTC"), Some(Decimal::ZERO));
    }

    #[test]
    fn test_balances_sum_locked() {
        let response: BalancesResponse = serde_json::from_value(json!({
            "result": "true",
            "available": {"BTC": "1.5", "LTC": 3},
            "locked": {"BTC": "0.5", "ETH": "2"}
        }))
        .unwrap();
        let balance = response.into_balance().unwrap();

        assert_eq!(balance.available("BTC"), dec!(1.5));
        assert_eq!(balance.total("BTC"), Some(dec!(2.0)));
        assert_eq!(balance.total("ETH"), Some(dec!(2)));
        assert_eq!(balance.available("ETH"), Decimal::ZERO);
    }

    #[test]
    fn test_balances_total_out_of_range() {
        let response: BalancesResponse = serde_json::from_value(json!({
            "result": "true",
            "available": {"BTC": "79228162514264337593543950335"},
            "locked": {"BTC": "1"}
        }))
        .unwrap();

        let err = response.into_balance().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { ref field, .. } if field == "locked.BTC"));
    }

    #[test]
    fn test_open_order_record() {
        let record: OpenOrderRecord = serde_json::from_value(json!({
            "orderNumber": "123456",
            "type": "sell",
            "rate": "0.0125",
            "amount": "1.5",
            "filledAmount": 0,
            "currencyPair": "ltc_btc",
            "timestamp": "1506086183",
            "status": "open"
        }))
        .unwrap();

        let order = record.into_order().unwrap();
        assert_eq!(order.order_id, "123456");
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.symbol, Symbol::new("LTC", "BTC"));
        assert_eq!(order.created_at.unwrap().timestamp(), 1_506_086_183);
    }
}
