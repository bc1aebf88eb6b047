use serde::{Deserialize, Serialize};
use std::fmt;

/// Rate-limit and signing path a request travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Public,
    Authenticated,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Public => write!(f, "public"),
            Channel::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Every call a connector can make. Errors carry the operation so callers
/// can decide on retries without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Symbols,
    MarketInfo,
    Ticker,
    Tickers,
    Orderbook,
    Klines,
    Balances,
    PlaceOrder,
    CancelOrder,
    CancelAllOrders,
    OpenOrders,
}

impl Operation {
    pub fn channel(&self) -> Channel {
        match self {
            Operation::Symbols
            | Operation::MarketInfo
            | Operation::Ticker
            | Operation::Tickers
            | Operation::Orderbook
            | Operation::Klines => Channel::Public,
            Operation::Balances
            | Operation::PlaceOrder
            | Operation::CancelOrder
            | Operation::CancelAllOrders
            | Operation::OpenOrders => Channel::Authenticated,
        }
    }

    /// Order placement and cancellation change venue state; re-sending them
    /// may duplicate the effect.
    pub fn is_idempotent(&self) -> bool {
        !matches!(
            self,
            Operation::PlaceOrder | Operation::CancelOrder | Operation::CancelAllOrders
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Symbols => "symbols",
            Operation::MarketInfo => "market_info",
            Operation::Ticker => "ticker",
            Operation::Tickers => "tickers",
            Operation::Orderbook => "orderbook",
            Operation::Klines => "klines",
            Operation::Balances => "balances",
            Operation::PlaceOrder => "place_order",
            Operation::CancelOrder => "cancel_order",
            Operation::CancelAllOrders => "cancel_all_orders",
            Operation::OpenOrders => "open_orders",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_not_idempotent() {
        assert!(!Operation::PlaceOrder.is_idempotent());
        assert!(!Operation::CancelOrder.is_idempotent());
        assert!(!Operation::CancelAllOrders.is_idempotent());
        assert!(Operation::Balances.is_idempotent());
        assert!(Operation::Orderbook.is_idempotent());
    }

    #[test]
    fn test_channel_split() {
        assert_eq!(Operation::Klines.channel(), Channel::Public);
        assert_eq!(Operation::Tickers.channel(), Channel::Public);
        assert_eq!(Operation::OpenOrders.channel(), Channel::Authenticated);
        assert_eq!(Operation::Balances.channel(), Channel::Authenticated);
    }
}
