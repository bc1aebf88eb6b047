use exlink_core::prelude::*;
use exlink_core::utils::{unix_decimal_to_datetime, BoolFlag, NumericField, PolymorphicMap};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct InfoResponse {
    pub server_time: Option<i64>,
    #[serde(default)]
    pub pairs: HashMap<String, PairRecord>,
}

#[derive(Debug, Deserialize)]
pub struct PairRecord {
    pub decimal_places: NumericField,
    pub min_price: Option<NumericField>,
    pub max_price: Option<NumericField>,
    pub min_amount: NumericField,
    pub hidden: Option<BoolFlag>,
    pub fee: NumericField,
}

impl PairRecord {
    pub fn into_entry(self) -> std::result::Result<MarketInfoEntry, DecodeError> {
        Ok(MarketInfoEntry {
            decimal_places: self.decimal_places.to_u32("decimal_places")?,
            min_amount: self.min_amount.to_decimal("min_amount")?,
            fee_percent: self.fee.to_decimal("fee")?,
            min_price: self
                .min_price
                .map(|v| v.to_decimal("min_price"))
                .transpose()?,
            max_price: self
                .max_price
                .map(|v| v.to_decimal("max_price"))
                .transpose()?,
            hidden: match &self.hidden {
                Some(flag) => flag.to_bool("hidden")?,
                None => false,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TickerRecord {
    pub high: NumericField,
    pub low: NumericField,
    pub avg: NumericField,
    /// Traded volume in the quote currency.
    pub vol: NumericField,
    /// Traded volume in the base currency.
    pub vol_cur: NumericField,
    pub last: NumericField,
    pub buy: NumericField,
    pub sell: NumericField,
    pub updated: NumericField,
}

impl TickerRecord {
    pub fn into_ticker(self, symbol: Symbol) -> std::result::Result<Ticker, DecodeError> {
        let updated = self.updated.to_decimal("updated")?;
        let updated_at = unix_decimal_to_datetime(updated).ok_or_else(|| {
            DecodeError::InvalidNumber {
                field: "updated".to_string(),
                value: updated.to_string(),
            }
        })?;

        Ok(Ticker {
            symbol,
            last: self.last.to_decimal("last")?,
            high: self.high.to_decimal("high")?,
            low: self.low.to_decimal("low")?,
            average: self.avg.to_decimal("avg")?,
            buy: self.buy.to_decimal("buy")?,
            sell: self.sell.to_decimal("sell")?,
            base_volume: self.vol_cur.to_decimal("vol_cur")?,
            quote_volume: self.vol.to_decimal("vol")?,
            updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DepthRecord {
    #[serde(default)]
    pub asks: Vec<Value>,
    #[serde(default)]
    pub bids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AccountInfoRecord {
    #[serde(default)]
    pub funds: PolymorphicMap,
    pub funds_incl_orders: Option<PolymorphicMap>,
}

impl AccountInfoRecord {
    pub fn into_balance(self) -> std::result::Result<Balance, DecodeError> {
        let balance = Balance::new(self.funds.to_decimal_map("funds")?);
        match self.funds_incl_orders {
            Some(total) => Ok(balance.with_orders(total.to_decimal_map("funds_incl_orders")?)),
            None => Ok(balance),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TradeRecord {
    pub received: Option<NumericField>,
    pub remains: Option<NumericField>,
    pub order_id: NumericField,
}

impl TradeRecord {
    pub fn into_result(self) -> std::result::Result<OrderResult, DecodeError> {
        Ok(OrderResult {
            order_id: self.order_id.as_text(),
            filled_amount: self
                .received
                .map(|v| v.to_decimal("received"))
                .transpose()?,
            remaining_amount: self
                .remains
                .map(|v| v.to_decimal("remains"))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ActiveOrderRecord {
    pub pair: String,
    #[serde(rename = "type")]
    pub side: String,
    pub amount: NumericField,
    pub rate: NumericField,
    pub timestamp_created: Option<NumericField>,
}

impl ActiveOrderRecord {
    pub fn into_order(self, order_id: String) -> std::result::Result<OpenOrder, DecodeError> {
        let symbol = Symbol::parse(&self.pair).ok_or_else(|| {
            DecodeError::UnexpectedShape(format!("invalid pair: {}", self.pair))
        })?;
        let side = OrderSide::parse(&self.side).ok_or_else(|| DecodeError::InvalidFlag {
            field: "type".to_string(),
            value: self.side.clone(),
        })?;
        let created_at = match &self.timestamp_created {
            Some(raw) => unix_decimal_to_datetime(raw.to_decimal("timestamp_created")?),
            None => None,
        };

        Ok(OpenOrder {
            order_id,
            symbol,
            side,
            price: self.rate.to_decimal("rate")?,
            amount: self.amount.to_decimal("amount")?,
            filled_amount: None,
            created_at,
        })
    }
}
