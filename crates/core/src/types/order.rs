use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn parse(side: &str) -> Option<Self> {
        match side.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(OrderSide::Buy),
            "sell" | "ask" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A limit order. Price and amount are sent exactly as given; rounding them
/// to the symbol's precision is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
}

impl OrderRequest {
    pub fn new(symbol: Symbol, side: OrderSide, price: Decimal, amount: Decimal) -> Self {
        Self {
            symbol,
            side,
            price,
            amount,
        }
    }

    pub fn buy(symbol: Symbol, price: Decimal, amount: Decimal) -> Self {
        Self::new(symbol, OrderSide::Buy, price, amount)
    }

    pub fn sell(symbol: Symbol, price: Decimal, amount: Decimal) -> Self {
        Self::new(symbol, OrderSide::Sell, price, amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub filled_amount: Option<Decimal>,
    pub remaining_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price: Decimal,
    pub amount: Decimal,
    pub filled_amount: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Which resting orders a cancel-all request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelAllKind {
    Sell,
    Buy,
    All,
}

impl CancelAllKind {
    /// Wire code: 0 = sell, 1 = buy, -1 = unlimited.
    pub fn code(&self) -> i8 {
        match self {
            CancelAllKind::Sell => 0,
            CancelAllKind::Buy => 1,
            CancelAllKind::All => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CancelAllKind::Sell),
            1 => Some(CancelAllKind::Buy),
            -1 => Some(CancelAllKind::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeeRequest {
    Trade {
        symbol: Symbol,
        price: Decimal,
        amount: Decimal,
    },
    Withdrawal {
        currency: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_all_codes() {
        assert_eq!(CancelAllKind::Sell.code(), 0);
        assert_eq!(CancelAllKind::Buy.code(), 1);
        assert_eq!(CancelAllKind::All.code(), -1);
        assert_eq!(CancelAllKind::from_code(1), Some(CancelAllKind::Buy));
        assert_eq!(CancelAllKind::from_code(7), None);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!(OrderSide::parse("SELL"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::parse("bid"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::parse("hold"), None);
        assert_eq!(OrderSide::Buy.to_string(), "buy");
    }
}
