use async_trait::async_trait;
use exlink_core::config::{RateLimitConfig, VenueConfig};
use exlink_core::utils::now_timestamp_s;
use exlink_exchange::normalizer::{
    check_envelope, check_optional_flag, decode_book_side, decode_envelope, parse_json,
};
use exlink_exchange::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::*;

pub const YOBIT_API_URL: &str = "https://yobit.net";
pub const YOBIT_PUBLIC_PATH: &str = "api/3";
pub const YOBIT_PRIVATE_PATH: &str = "tapi";

const INFO: &str = "info";
const TICKER: &str = "ticker";
const DEPTH: &str = "depth";

const GET_INFO: &str = "getInfo";
const TRADE: &str = "Trade";
const CANCEL_ORDER: &str = "CancelOrder";
const ACTIVE_ORDERS: &str = "ActiveOrders";

/// `{"success": 0|1, "return": {...}, "error": "..."}`.
pub const YOBIT_ENVELOPE: EnvelopeSpec =
    EnvelopeSpec::new("success", "error").with_payload("return");

/// YoBit accepts nonces in `1..=2147483646`.
pub const YOBIT_MAX_NONCE: u32 = 2_147_483_646;

const WITHDRAWAL_FEES: &str = include_str!("../data/withdrawal_fees.toml");

/// The withdrawal fees YoBit published, shipped with the crate.
pub fn default_fee_table() -> Result<FeeTable> {
    FeeTable::from_toml_str(WITHDRAWAL_FEES)
}

/// YoBit API v3 connector.
///
/// Public calls address pairs by path (`ltc_btc-eth_btc` for batches);
/// private calls are signed POSTs to a single endpoint with a `method`
/// field and a strictly increasing nonce.
#[derive(Debug, Clone)]
pub struct YobitConnector {
    config: Arc<DefaultExchangeConfig>,
    dispatcher: HttpDispatcher,
    signer: Option<Arc<HmacSigner>>,
    nonce: Arc<AtomicU32>,
    fees: FeeEstimator,
}

impl YobitConnector {
    pub fn default_config() -> DefaultExchangeConfig {
        DefaultExchangeConfig {
            trade_url: YOBIT_API_URL.to_string(),
            market_url: YOBIT_API_URL.to_string(),
            rate_limit: RateLimitConfig {
                public_requests: 100,
                authenticated_requests: 100,
                window_ms: 60_000,
            },
            ..Default::default()
        }
    }

    pub fn new(config: DefaultExchangeConfig, fees: FeeTable) -> Result<Self> {
        let dispatcher = HttpDispatcher::from_config(&config)?;
        let signer = config
            .credentials()
            .map(|credentials| HmacSigner::sha512(credentials, "Key", "Sign"))
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            signer,
            nonce: Arc::new(AtomicU32::new(now_timestamp_s() as u32)),
            fees: FeeEstimator::new(fees),
        })
    }

    /// Builds a connector from user settings, falling back to the bundled
    /// withdrawal fee table when no fee file is configured.
    pub fn from_venue_config(venue: &VenueConfig) -> Result<Self> {
        let fees = match &venue.withdrawal_fees {
            Some(path) => FeeTable::from_file(path)?,
            None => default_fee_table()?,
        };
        Self::new(Self::default_config().with_overrides(venue), fees)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.dispatcher = self.dispatcher.with_cancellation(token);
        self
    }

    /// Starts the nonce sequence at `start`; YoBit rejects any nonce not
    /// above the last one it saw for the key.
    pub fn with_nonce_start(self, start: u32) -> Self {
        self.nonce.store(start, Ordering::SeqCst);
        self
    }

    fn pair(symbol: &Symbol) -> String {
        symbol.format("_", false)
    }

    fn next_nonce(&self) -> Result<u32> {
        self.nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                last.checked_add(1).filter(|next| *next <= YOBIT_MAX_NONCE)
            })
            .map(|last| last + 1)
            .map_err(|last| {
                ExLinkError::InvalidRequest(format!(
                    "YoBit nonce exhausted at {}, a new API key is required",
                    last
                ))
            })
    }

    fn signer(&self) -> Result<&HmacSigner> {
        self.signer.as_deref().ok_or_else(|| {
            ExLinkError::Authentication("YoBit API key and secret are not configured".to_string())
        })
    }

    async fn get_public(&self, operation: Operation, segments: &[&str]) -> Result<Value> {
        let mut path = vec![YOBIT_PUBLIC_PATH];
        path.extend_from_slice(segments);
        let url = build_url(self.config.market_url(), &path, &[])?;

        let body = self.dispatcher.send(HttpRequest::get(operation, url)).await?;
        let value = parse_json(&body).map_err(|e| ExLinkError::response(operation, e))?;
        check_optional_flag(&value, &YOBIT_ENVELOPE)
            .map_err(|e| ExLinkError::response(operation, e))?;
        Ok(value)
    }

    /// Pair-keyed public data for exactly one symbol.
    async fn get_pair_record<T: DeserializeOwned>(
        &self,
        operation: Operation,
        resource: &str,
        symbol: &Symbol,
    ) -> Result<T> {
        let pair = Self::pair(symbol);
        let value = self.get_public(operation, &[resource, pair.as_str()]).await?;
        let mut records: HashMap<String, T> = decode(operation, value)?;

        records.remove(&pair).ok_or_else(|| {
            ExLinkError::response(operation, DecodeError::MissingField(pair).into())
        })
    }

    async fn post_private(
        &self,
        operation: Operation,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        let signer = self.signer()?;
        let url = build_url(self.config.trade_url(), &[YOBIT_PRIVATE_PATH], &[])?;

        let mut form = FormBody::new().field("method", method);
        for (key, value) in params {
            form.push(*key, value);
        }
        form.push("nonce", self.next_nonce()?);

        self.dispatcher
            .send_signed(HttpRequest::post(operation, url), signer, &form)
            .await
    }

    fn unsupported(operation: Operation) -> ExLinkError {
        ExLinkError::Unsupported {
            venue: VenueId::Yobit,
            operation,
        }
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ExLinkError::response(operation, e.into()))
}

fn converted<T>(operation: Operation, result: std::result::Result<T, DecodeError>) -> Result<T> {
    result.map_err(|e| ExLinkError::response(operation, e.into()))
}

#[async_trait]
impl VenueConnector for YobitConnector {
    fn venue_id(&self) -> VenueId {
        VenueId::Yobit
    }

    async fn get_symbols(&self) -> Result<Vec<Symbol>> {
        let info = self.get_market_info().await?;
        let mut symbols: Vec<Symbol> = info.symbols().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn get_market_info(&self) -> Result<MarketInfo> {
        let operation = Operation::MarketInfo;
        let value = self.get_public(operation, &[INFO]).await?;
        let response: InfoResponse = decode(operation, value)?;

        let mut info = HashMap::with_capacity(response.pairs.len());
        for (pair, record) in response.pairs {
            match Symbol::parse(&pair) {
                Some(symbol) => {
                    info.insert(symbol, converted(operation, record.into_entry())?);
                }
                None => warn!("Skipping unparseable YoBit pair: {}", pair),
            }
        }

        debug!("YoBit market info for {} pairs", info.len());
        Ok(MarketInfo::new(info))
    }

    async fn get_ticker(&self, symbol: &Symbol) -> Result<Ticker> {
        let operation = Operation::Ticker;
        let record: TickerRecord = self.get_pair_record(operation, TICKER, symbol).await?;
        converted(operation, record.into_ticker(symbol.clone()))
    }

    async fn get_tickers(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>> {
        let operation = Operation::Tickers;
        if symbols.is_empty() {
            return Err(ExLinkError::InvalidRequest(
                "YoBit tickers need at least one symbol".to_string(),
            ));
        }

        let pairs = symbols
            .iter()
            .map(Self::pair)
            .collect::<Vec<_>>()
            .join("-");
        let value = self.get_public(operation, &[TICKER, pairs.as_str()]).await?;
        let mut records: HashMap<String, TickerRecord> = decode(operation, value)?;

        symbols
            .iter()
            .map(|symbol| {
                let pair = Self::pair(symbol);
                let record = records.remove(&pair).ok_or_else(|| {
                    ExLinkError::response(operation, DecodeError::MissingField(pair).into())
                })?;
                converted(operation, record.into_ticker(symbol.clone()))
            })
            .collect()
    }

    async fn get_orderbook(&self, symbol: &Symbol) -> Result<Orderbook> {
        let operation = Operation::Orderbook;
        let depth: DepthRecord = self.get_pair_record(operation, DEPTH, symbol).await?;

        let asks = decode_book_side(&depth.asks, Side::Ask, WireOrder::BestFirst)
            .map_err(|e| ExLinkError::response(operation, e))?;
        let bids = decode_book_side(&depth.bids, Side::Bid, WireOrder::BestFirst)
            .map_err(|e| ExLinkError::response(operation, e))?;

        Ok(Orderbook {
            symbol: symbol.clone(),
            asks,
            bids,
            elapsed: None,
            status: true,
        })
    }

    async fn get_klines(&self, _request: &KlineRequest) -> Result<Vec<Kline>> {
        Err(Self::unsupported(Operation::Klines))
    }

    async fn get_balances(&self) -> Result<Balance> {
        let operation = Operation::Balances;
        let body = self.post_private(operation, GET_INFO, &[]).await?;
        let record: AccountInfoRecord = decode_envelope(&body, &YOBIT_ENVELOPE)
            .map_err(|e| ExLinkError::response(operation, e))?;

        converted(operation, record.into_balance())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let operation = Operation::PlaceOrder;
        let params = [
            ("pair", Self::pair(&request.symbol)),
            ("type", request.side.as_str().to_string()),
            ("rate", request.price.normalize().to_string()),
            ("amount", request.amount.normalize().to_string()),
        ];
        let body = self.post_private(operation, TRADE, &params).await?;
        let record: TradeRecord = decode_envelope(&body, &YOBIT_ENVELOPE)
            .map_err(|e| ExLinkError::response(operation, e))?;

        converted(operation, record.into_result())
    }

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> Result<()> {
        let operation = Operation::CancelOrder;
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ExLinkError::InvalidRequest("Order id must not be empty".to_string()));
        }

        debug!("Cancelling YoBit order {} on {}", order_id, symbol);
        let body = self
            .post_private(operation, CANCEL_ORDER, &[("order_id", order_id.to_string())])
            .await?;
        check_envelope(&body, &YOBIT_ENVELOPE).map_err(|e| ExLinkError::response(operation, e))?;
        Ok(())
    }

    async fn cancel_all_orders(&self, _kind: CancelAllKind, _symbol: &Symbol) -> Result<()> {
        Err(Self::unsupported(Operation::CancelAllOrders))
    }

    async fn get_open_orders(&self, symbol: Option<&Symbol>) -> Result<Vec<OpenOrder>> {
        let operation = Operation::OpenOrders;
        let params: Vec<(&str, String)> = symbol
            .map(|symbol| vec![("pair", Self::pair(symbol))])
            .unwrap_or_default();
        let body = self.post_private(operation, ACTIVE_ORDERS, &params).await?;

        // With no open orders YoBit omits `return` entirely.
        let envelope = EnvelopeSpec {
            payload_field: None,
            ..YOBIT_ENVELOPE
        };
        let value = check_envelope(&body, &envelope)
            .map_err(|e| ExLinkError::response(operation, e))?;
        let records: HashMap<String, ActiveOrderRecord> = match value.get("return") {
            Some(payload) if !payload.is_null() => decode(operation, payload.clone())?,
            _ => HashMap::new(),
        };

        let mut orders = records
            .into_iter()
            .map(|(order_id, record)| converted(operation, record.into_order(order_id)))
            .collect::<Result<Vec<_>>>()?;
        orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        Ok(orders)
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bundled_fee_table() {
        let table = default_fee_table().unwrap();
        assert!(table.len() > 1000);
        assert_eq!(table.withdrawal_fee("BTC"), Some(dec!(0.0012)));
        assert_eq!(table.withdrawal_fee("eth"), Some(dec!(0.005)));
        assert_eq!(table.withdrawal_fee("2GIVE"), Some(dec!(0.01)));
    }

    #[test]
    fn test_nonce_strictly_increases() {
        let connector = YobitConnector::new(YobitConnector::default_config(), FeeTable::empty())
            .unwrap()
            .with_nonce_start(10);

        assert_eq!(connector.next_nonce().unwrap(), 11);
        assert_eq!(connector.next_nonce().unwrap(), 12);

        let clone = connector.clone();
        assert_eq!(clone.next_nonce().unwrap(), 13);
    }

    #[test]
    fn test_nonce_stops_at_venue_limit() {
        let connector = YobitConnector::new(YobitConnector::default_config(), FeeTable::empty())
            .unwrap()
            .with_nonce_start(YOBIT_MAX_NONCE - 1);

        assert_eq!(connector.next_nonce().unwrap(), YOBIT_MAX_NONCE);
        assert!(matches!(connector.next_nonce(), Err(ExLinkError::InvalidRequest(_))));
        assert!(matches!(connector.next_nonce(), Err(ExLinkError::InvalidRequest(_))));

        let wrapped = connector.with_nonce_start(u32::MAX);
        assert!(matches!(wrapped.next_nonce(), Err(ExLinkError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let connector =
            YobitConnector::new(YobitConnector::default_config(), FeeTable::empty()).unwrap();
        let symbol = Symbol::new("LTC", "BTC");

        let err = connector
            .get_klines(&KlineRequest::new(symbol.clone(), 60, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExLinkError::Unsupported {
                venue: VenueId::Yobit,
                operation: Operation::Klines
            }
        ));

        let err = connector
            .cancel_all_orders(CancelAllKind::All, &symbol)
            .await
            .unwrap_err();
        assert!(matches!(err, ExLinkError::Unsupported { .. }));

        let err = connector.get_tickers(&[]).await.unwrap_err();
        assert!(matches!(err, ExLinkError::InvalidRequest(_)));
    }
}
