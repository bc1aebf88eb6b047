use async_trait::async_trait;
use exlink_core::config::{RateLimitConfig, VenueConfig};
use exlink_core::{
    Balance, CancelAllKind, FeeRequest, Kline, KlineRequest, MarketInfo, OpenOrder, OrderRequest,
    OrderResult, Orderbook, Result, Symbol, Ticker, VenueCredentials, VenueId,
};
use rust_decimal::Decimal;

/// Uniform REST surface over a single trading venue.
///
/// Every call is independent: implementations keep no per-request state, so
/// one connector can be shared across tasks. Writes are never retried.
#[async_trait]
pub trait VenueConnector: Send + Sync {
    fn venue_id(&self) -> VenueId;

    async fn get_symbols(&self) -> Result<Vec<Symbol>>;
    async fn get_market_info(&self) -> Result<MarketInfo>;

    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker>;
    /// Tickers for the requested symbols; an empty slice asks for every
    /// symbol the venue reports, where the venue supports that.
    async fn get_tickers(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>>;
    async fn get_orderbook(&self, symbol: &Symbol) -> Result<Orderbook>;
    async fn get_klines(&self, request: &KlineRequest) -> Result<Vec<Kline>>;

    async fn get_balances(&self) -> Result<Balance>;
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult>;
    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> Result<()>;
    async fn cancel_all_orders(&self, kind: CancelAllKind, symbol: &Symbol) -> Result<()>;
    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OpenOrder>>;

    async fn estimate_fee(&self, request: &FeeRequest) -> Result<Decimal>;
}

pub trait ExchangeConfig {
    /// Host for authenticated (trading) endpoints.
    fn trade_url(&self) -> &str;
    /// Host for public market-data endpoints.
    fn market_url(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn secret_key(&self) -> Option<&str>;
    fn request_timeout_ms(&self) -> u64;
    fn rate_limit(&self) -> RateLimitConfig;

    fn credentials(&self) -> Option<VenueCredentials> {
        match (self.api_key(), self.secret_key()) {
            (Some(key), Some(secret)) => Some(VenueCredentials::new(key, secret)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefaultExchangeConfig {
    pub trade_url: String,
    pub market_url: String,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub request_timeout_ms: u64,
    pub rate_limit: RateLimitConfig,
}

impl DefaultExchangeConfig {
    /// Layers user settings over a venue's built-in defaults.
    pub fn with_overrides(mut self, venue: &VenueConfig) -> Self {
        if let Some(url) = &venue.trade_url {
            self.trade_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &venue.market_url {
            self.market_url = url.trim_end_matches('/').to_string();
        }
        if let Some(credentials) = &venue.credentials {
            self.api_key = Some(credentials.api_key.clone());
            self.secret_key = Some(credentials.api_secret.clone());
        }
        if let Some(timeout) = venue.request_timeout_ms {
            self.request_timeout_ms = timeout;
        }
        if let Some(rate_limit) = venue.rate_limit {
            self.rate_limit = rate_limit;
        }
        self
    }
}

impl ExchangeConfig for DefaultExchangeConfig {
    fn trade_url(&self) -> &str { &self.trade_url }
    fn market_url(&self) -> &str { &self.market_url }
    fn api_key(&self) -> Option<&str> { self.api_key.as_deref() }
    fn secret_key(&self) -> Option<&str> { self.secret_key.as_deref() }
    fn request_timeout_ms(&self) -> u64 { self.request_timeout_ms }
    fn rate_limit(&self) -> RateLimitConfig { self.rate_limit }
}

impl Default for DefaultExchangeConfig {
    fn default() -> Self {
        Self {
            trade_url: String::new(),
            market_url: String::new(),
            api_key: None,
            secret_key: None,
            request_timeout_ms: 10000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}
