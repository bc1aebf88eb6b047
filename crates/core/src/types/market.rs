use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ExLinkError;

const PAIR_DELIMITERS: [char; 3] = ['_', '/', '-'];

/// A tradeable base/quote pair.
///
/// Both legs are stored trimmed and upper-cased, so `ltc_btc`, `LTC/BTC` and
/// `Ltc-Btc` compare (and hash) equal. Serialized as `"BASE/QUOTE"` so it
/// can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Symbol {
    base: String,
    quote: String,
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_pair()
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(pair: String) -> Result<Self, Self::Error> {
        Symbol::parse(&pair).ok_or_else(|| format!("invalid symbol: {}", pair))
    }
}

impl Symbol {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_uppercase(),
            quote: quote.as_ref().trim().to_uppercase(),
        }
    }

    pub fn parse(pair: &str) -> Option<Self> {
        let idx = pair.find(|c: char| PAIR_DELIMITERS.contains(&c))?;
        let (base, quote) = (&pair[..idx], &pair[idx + 1..]);
        if base.trim().is_empty() || quote.trim().is_empty() {
            return None;
        }
        Some(Self::new(base, quote))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn to_pair(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Renders the pair the way a venue expects it in paths and form bodies.
    pub fn format(&self, delimiter: &str, uppercase: bool) -> String {
        let pair = format!("{}{}{}", self.base, delimiter, self.quote);
        if uppercase {
            pair
        } else {
            pair.to_lowercase()
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = ExLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::parse(s)
            .ok_or_else(|| ExLinkError::InvalidRequest(format!("Unable to parse symbol: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookItem {
    pub price: Decimal,
    pub amount: Decimal,
}

impl OrderbookItem {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// A full depth snapshot. `asks` run from the lowest price up, `bids` from
/// the highest price down; neither side is ever empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub symbol: Symbol,
    pub asks: Vec<OrderbookItem>,
    pub bids: Vec<OrderbookItem>,
    pub elapsed: Option<String>,
    pub status: bool,
}

impl Orderbook {
    pub fn best_bid(&self) -> Option<&OrderbookItem> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderbookItem> {
        self.asks.first()
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.price.checked_sub(bid.price),
            _ => None,
        }
    }

    /// `None` when a side is empty or the midpoint is out of range.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid
                .price
                .checked_add(ask.price)
                .and_then(|sum| sum.checked_div(Decimal::TWO)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub last: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub average: Decimal,
    pub buy: Decimal,
    pub sell: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Open time exactly as the venue sent it; it doubles as the row id.
    pub id: i64,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineRequest {
    pub symbol: Symbol,
    /// Bucket size in seconds.
    pub group_sec: u32,
    /// Lookback window in hours.
    pub range_hour: u32,
}

impl KlineRequest {
    pub fn new(symbol: Symbol, group_sec: u32, range_hour: u32) -> Self {
        Self {
            symbol,
            group_sec,
            range_hour,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfoEntry {
    pub decimal_places: u32,
    pub min_amount: Decimal,
    /// Trading fee in percent, e.g. `0.2` for 0.2%.
    pub fee_percent: Decimal,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub hidden: bool,
}

/// Per-symbol trading constraints, rebuilt from scratch on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pairs: HashMap<Symbol, MarketInfoEntry>,
}

impl MarketInfo {
    pub fn new(pairs: HashMap<Symbol, MarketInfoEntry>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&MarketInfoEntry> {
        self.pairs.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.pairs.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &MarketInfoEntry)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(Symbol, MarketInfoEntry)> for MarketInfo {
    fn from_iter<I: IntoIterator<Item = (Symbol, MarketInfoEntry)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}
