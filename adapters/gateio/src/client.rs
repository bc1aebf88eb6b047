use async_trait::async_trait;
use exlink_core::config::{RateLimitConfig, VenueConfig};
use exlink_exchange::normalizer::{
    check_optional_flag, decode_book_side, decode_envelope, decode_klines, parse_json,
};
use exlink_exchange::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::*;

pub const GATEIO_TRADE_URL: &str = "https://api.gateio.io";
pub const GATEIO_MARKET_URL: &str = "https://data.gateio.io";
pub const GATEIO_API_VERSION: &str = "api2/1";

const SYMBOLS: &str = "pairs";
const MARKET_INFO: &str = "marketinfo";
const TICKER: &str = "ticker";
const TICKERS: &str = "tickers";
const ORDERBOOK: &str = "orderBook";
const KLINE: &str = "candlestick2";
const ORDER: &str = "private";
const BALANCES: &str = "private/balances";
const CANCEL_ORDER: &str = "private/cancelOrder";
const CANCEL_ALL_ORDERS: &str = "private/cancelAllOrders";
const OPEN_ORDERS: &str = "private/openOrders";

/// `{"result": "true"|"false", "code": n, "message": "..."}` with the payload
/// alongside.
pub const GATEIO_ENVELOPE: EnvelopeSpec =
    EnvelopeSpec::new("result", "message").with_code("code");

/// Gate.io API v2 connector.
///
/// Public data comes from the market host, signed POSTs go to the trade
/// host. Pairs travel as lower-case `base_quote`.
#[derive(Debug, Clone)]
pub struct GateioConnector {
    config: Arc<DefaultExchangeConfig>,
    dispatcher: HttpDispatcher,
    signer: Option<Arc<HmacSigner>>,
    fees: FeeEstimator,
}

impl GateioConnector {
    pub fn default_config() -> DefaultExchangeConfig {
        DefaultExchangeConfig {
            trade_url: GATEIO_TRADE_URL.to_string(),
            market_url: GATEIO_MARKET_URL.to_string(),
            rate_limit: RateLimitConfig {
                public_requests: 100,
                authenticated_requests: 100,
                window_ms: 10_000,
            },
            ..Default::default()
        }
    }

    pub fn new(config: DefaultExchangeConfig, fees: FeeTable) -> Result<Self> {
        let dispatcher = HttpDispatcher::from_config(&config)?;
        let signer = config
            .credentials()
            .map(|credentials| HmacSigner::sha512(credentials, "key", "sign"))
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            signer,
            fees: FeeEstimator::new(fees),
        })
    }

    /// Builds a connector from user settings. Without a configured fee file
    /// every withdrawal fee estimate is zero.
    pub fn from_venue_config(venue: &VenueConfig) -> Result<Self> {
        let fees = match &venue.withdrawal_fees {
            Some(path) => FeeTable::from_file(path)?,
            None => FeeTable::empty(),
        };
        Self::new(Self::default_config().with_overrides(venue), fees)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.dispatcher = self.dispatcher.with_cancellation(token);
        self
    }

    fn pair(symbol: &Symbol) -> String {
        symbol.format("_", false)
    }

    fn signer(&self) -> Result<&HmacSigner> {
        self.signer.as_deref().ok_or_else(|| {
            ExLinkError::Authentication("Gate.io API key and secret are not configured".to_string())
        })
    }

    async fn get_public(
        &self,
        operation: Operation,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value> {
        let mut path = vec![GATEIO_API_VERSION];
        path.extend_from_slice(segments);
        let url = build_url(self.config.market_url(), &path, query)?;

        let body = self.dispatcher.send(HttpRequest::get(operation, url)).await?;
        let value = parse_json(&body).map_err(|e| ExLinkError::response(operation, e))?;
        check_optional_flag(&value, &GATEIO_ENVELOPE)
            .map_err(|e| ExLinkError::response(operation, e))?;
        Ok(value)
    }

    async fn post_private<T: DeserializeOwned>(
        &self,
        operation: Operation,
        endpoint: &str,
        form: FormBody,
    ) -> Result<T> {
        let signer = self.signer()?;
        let url = build_url(self.config.trade_url(), &[GATEIO_API_VERSION, endpoint], &[])?;

        let body = self
            .dispatcher
            .send_signed(HttpRequest::post(operation, url), signer, &form)
            .await?;
        decode_envelope(&body, &GATEIO_ENVELOPE).map_err(|e| ExLinkError::response(operation, e))
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ExLinkError::response(operation, e.into()))
}

fn converted<T>(operation: Operation, result: std::result::Result<T, DecodeError>) -> Result<T> {
    result.map_err(|e| ExLinkError::response(operation, e.into()))
}

fn parse_pair(pair: &str) -> Option<Symbol> {
    let symbol = Symbol::parse(pair);
    if symbol.is_none() {
        warn!("Skipping unparseable Gate.io pair: {}", pair);
    }
    symbol
}

#[async_trait]
impl VenueConnector for GateioConnector {
    fn venue_id(&self) -> VenueId {
        VenueId::Gateio
    }

    async fn get_symbols(&self) -> Result<Vec<Symbol>> {
        let value = self.get_public(Operation::Symbols, &[SYMBOLS], &[]).await?;
        let pairs: Vec<String> = decode(Operation::Symbols, value)?;

        Ok(pairs.iter().filter_map(|pair| parse_pair(pair)).collect())
    }

    async fn get_market_info(&self) -> Result<MarketInfo> {
        let operation = Operation::MarketInfo;
        let value = self.get_public(operation, &[MARKET_INFO], &[]).await?;
        let response: MarketInfoResponse = decode(operation, value)?;

        let mut info = HashMap::new();
        for (pair, record) in response.pairs.into_iter().flatten() {
            if let Some(symbol) = parse_pair(&pair) {
                info.insert(symbol, converted(operation, record.into_entry())?);
            }
        }

        debug!("Gate.io market info for {} pairs", info.len());
        Ok(MarketInfo::new(info))
    }

    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker> {
        let operation = Operation::Ticker;
        let pair = Self::pair(symbol);
        let value = self.get_public(operation, &[TICKER, pair.as_str()], &[]).await?;
        let record: TickerRecord = decode(operation, value)?;

        converted(operation, record.into_ticker(symbol.clone()))
    }

    async fn get_tickers(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>> {
        let operation = Operation::Tickers;
        let value = self.get_public(operation, &[TICKERS], &[]).await?;
        let records: HashMap<String, TickerRecord> = decode(operation, value)?;

        let mut tickers = Vec::with_capacity(records.len());
        for (pair, record) in records {
            let Some(symbol) = parse_pair(&pair) else {
                continue;
            };
            if symbols.is_empty() || symbols.contains(&symbol) {
                tickers.push(converted(operation, record.into_ticker(symbol))?);
            }
        }

        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(tickers)
    }

    async fn get_orderbook(&self, symbol: &Symbol) -> Result<Orderbook> {
        let operation = Operation::Orderbook;
        let pair = Self::pair(symbol);
        let value = self.get_public(operation, &[ORDERBOOK, pair.as_str()], &[]).await?;
        let response: OrderbookResponse = decode(operation, value)?;

        // Gate lists asks highest price first.
        let asks = decode_book_side(&response.asks, Side::Ask, WireOrder::WorstFirst)
            .map_err(|e| ExLinkError::response(operation, e))?;
        let bids = decode_book_side(&response.bids, Side::Bid, WireOrder::BestFirst)
            .map_err(|e| ExLinkError::response(operation, e))?;

        Ok(Orderbook {
            symbol: symbol.clone(),
            asks,
            bids,
            elapsed: response.elapsed,
            status: true,
        })
    }

    async fn get_klines(&self, request: &KlineRequest) -> Result<Vec<Kline>> {
        let operation = Operation::Klines;
        let pair = Self::pair(&request.symbol);
        let query = [
            ("group_sec", request.group_sec.to_string()),
            ("range_hour", request.range_hour.to_string()),
        ];
        let value = self.get_public(operation, &[KLINE, pair.as_str()], &query).await?;

        decode_klines(&value).map_err(|e| ExLinkError::response(operation, e))
    }

    async fn get_balances(&self) -> Result<Balance> {
        let operation = Operation::Balances;
        let response: BalancesResponse = self
            .post_private(operation, BALANCES, FormBody::new())
            .await?;

        converted(operation, response.into_balance())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let operation = Operation::PlaceOrder;
        let endpoint = format!("{}/{}", ORDER, request.side.as_str());
        let form = FormBody::new()
            .field("currencyPair", Self::pair(&request.symbol))
            .field("rate", request.price.normalize())
            .field("amount", request.amount.normalize());

        let response: PlaceOrderResponse = self.post_private(operation, &endpoint, form).await?;
        converted(operation, response.into_result())
    }

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> Result<()> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ExLinkError::InvalidRequest("Order id must not be empty".to_string()));
        }

        let form = FormBody::new()
            .field("orderNumber", order_id)
            .field("currencyPair", Self::pair(symbol));

        let _: Value = self
            .post_private(Operation::CancelOrder, CANCEL_ORDER, form)
            .await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, kind: CancelAllKind, symbol: &Symbol) -> Result<()> {
        let form = FormBody::new()
            .field("type", kind.code())
            .field("currencyPair", Self::pair(symbol));

        let _: Value = self
            .post_private(Operation::CancelAllOrders, CANCEL_ALL_ORDERS, form)
            .await?;
        Ok(())
    }

    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OpenOrder>> {
        let operation = Operation::OpenOrders;
        let mut form = FormBody::new();
        if let Some(symbol) = symbol {
            form.push("currencyPair", Self::pair(symbol));
        }

        let response: OpenOrdersResponse = self.post_private(operation, OPEN_ORDERS, form).await?;
        response
            .orders
            .into_iter()
            .map(|record| converted(operation, record.into_order()))
            .collect()
    }

    async fn estimate_fee(&self, request: &FeeRequest) -> Result<Decimal> {
        match request {
            FeeRequest::Trade {
                symbol,
                price,
                amount,
            } => {
                let market_info = self.get_market_info().await?;
                self.fees
                    .estimate_trade_fee(&market_info, symbol, *price, *amount)
            }
            FeeRequest::Withdrawal { currency } => {
                Ok(self.fees.estimate_withdrawal_fee(currency))
            }
        }
    }
}
