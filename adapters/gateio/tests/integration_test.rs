use exlink_exchange::prelude::*;
use exlink_gateio::GateioConnector;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector(server: &MockServer) -> GateioConnector {
    let config = DefaultExchangeConfig {
        trade_url: server.uri(),
        market_url: server.uri(),
        api_key: Some("test-key".to_string()),
        secret_key: Some("test-secret".to_string()),
        ..GateioConnector::default_config()
    };
    GateioConnector::new(config, FeeTable::from_map([("BTC", dec!(0.002))])).unwrap()
}

async fn mount_market_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api2/1/marketinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "pairs": [
                {"ltc_btc": {"decimal_places": 6, "min_amount": 0.001, "fee": 0.2}},
                {"eth_btc": {"decimal_places": "8", "min_amount": "0.0001", "fee": "0.15"}}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_symbols() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/pairs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ltc_btc", "eth_usdt"])))
        .mount(&server)
        .await;

    let symbols = connector(&server).get_symbols().await.unwrap();
    assert_eq!(
        symbols,
        vec![Symbol::new("LTC", "BTC"), Symbol::new("ETH", "USDT")]
    );
}

#[tokio::test]
async fn test_get_market_info() {
    let server = MockServer::start().await;
    mount_market_info(&server).await;

    let info = connector(&server).get_market_info().await.unwrap();
    assert_eq!(info.len(), 2);

    let ltc = info.get(&Symbol::new("LTC", "BTC")).unwrap();
    assert_eq!(ltc.decimal_places, 6);
    assert_eq!(ltc.fee_percent, dec!(0.2));

    let eth = info.get(&Symbol::new("ETH", "BTC")).unwrap();
    assert_eq!(eth.min_amount, dec!(0.0001));
}

#[tokio::test]
async fn test_get_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/ticker/ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "last": 1.23,
            "lowestAsk": "1.24",
            "highestBid": "1.22",
            "percentChange": "0.5",
            "baseVolume": "100",
            "quoteVolume": "81.3",
            "high24hr": "1.3",
            "low24hr": "1.1"
        })))
        .mount(&server)
        .await;

    let ticker = connector(&server)
        .get_ticker(&Symbol::new("LTC", "BTC"))
        .await
        .unwrap();

    assert_eq!(ticker.last, dec!(1.23));
    assert_eq!(ticker.sell, dec!(1.24));
    assert_eq!(ticker.buy, dec!(1.22));
    assert_eq!(ticker.average, dec!(1.2));
}

#[tokio::test]
async fn test_get_tickers_filters_requested() {
    let server = MockServer::start().await;
    let record = json!({
        "last": "1", "lowestAsk": "1", "highestBid": "1", "percentChange": "0",
        "baseVolume": "1", "quoteVolume": "1", "high24hr": "1", "low24hr": "1"
    });
    Mock::given(method("GET"))
        .and(path("/api2/1/tickers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ltc_btc": record.clone(),
            "eth_btc": record.clone(),
            "doge_usdt": record
        })))
        .mount(&server)
        .await;

    let connector = connector(&server);

    let all = connector.get_tickers(&[]).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].symbol, Symbol::new("DOGE", "USDT"));

    let some = connector
        .get_tickers(&[Symbol::new("ETH", "BTC")])
        .await
        .unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].symbol, Symbol::new("ETH", "BTC"));
}

#[tokio::test]
async fn test_get_orderbook_reverses_asks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/orderBook/ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "asks": [["3", "1"], ["2", "1"], ["1", "1"]],
            "bids": [["0.9", "5"], ["0.8", "6"]],
            "elapsed": "0.5ms"
        })))
        .mount(&server)
        .await;

    let book = connector(&server)
        .get_orderbook(&Symbol::new("LTC", "BTC"))
        .await
        .unwrap();

    let ask_prices: Vec<Decimal> = book.asks.iter().map(|item| item.price).collect();
    assert_eq!(ask_prices, vec![dec!(1), dec!(2), dec!(3)]);
    assert_eq!(book.best_bid().unwrap().price, dec!(0.9));
    assert_eq!(book.elapsed.as_deref(), Some("0.5ms"));
}

#[tokio::test]
async fn test_get_orderbook_empty_asks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/orderBook/ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "asks": [],
            "bids": [["0.9", "5"]]
        })))
        .mount(&server)
        .await;

    let err = connector(&server)
        .get_orderbook(&Symbol::new("LTC", "BTC"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExLinkError::EmptySide {
            operation: Operation::Orderbook,
            side: Side::Ask
        }
    ));
}

#[tokio::test]
async fn test_get_orderbook_result_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/orderBook/ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "false",
            "message": "Error: invalid currency pair"
        })))
        .mount(&server)
        .await;

    let err = connector(&server)
        .get_orderbook(&Symbol::new("LTC", "BTC"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExLinkError::Api { ref message, .. } if message.contains("invalid")));
}

#[tokio::test]
async fn test_get_klines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/candlestick2/btc_usdt"))
        .and(query_param("group_sec", "60"))
        .and(query_param("range_hour", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "data": [
                ["1609459260000", "2", "101", "102", "100", "100.5"],
                ["1609459200000", "1.5", "100.5", "101", "99", "100"]
            ]
        })))
        .mount(&server)
        .await;

    let request = KlineRequest::new(Symbol::new("BTC", "USDT"), 60, 1);
    let klines = connector(&server).get_klines(&request).await.unwrap();

    assert_eq!(klines.len(), 2);
    assert_eq!(klines[0].open_time.timestamp(), 1_609_459_200);
    assert_eq!(klines[0].open, dec!(100));
    assert_eq!(klines[1].volume, dec!(2));
}

#[tokio::test]
async fn test_get_klines_bad_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/1/candlestick2/btc_usdt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [["1609459200", "oops", "1", "1", "1", "1"]]
        })))
        .mount(&server)
        .await;

    let request = KlineRequest::new(Symbol::new("BTC", "USDT"), 60, 1);
    let err = connector(&server).get_klines(&request).await.unwrap_err();

    match err {
        ExLinkError::Decode {
            operation: Operation::Klines,
            source: DecodeError::KlineField { field, .. },
        } => assert_eq!(field, "volume"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_balances_with_empty_lists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/balances"))
        .and(header("key", "test-key"))
        .and(header_exists("sign"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "available": [],
            "locked": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = connector(&server).get_balances().await.unwrap();
    assert!(balance.available.is_empty());
}

#[tokio::test]
async fn test_place_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/buy"))
        .and(body_string("currencyPair=ltc_btc&rate=0.0125&amount=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "orderNumber": 123456,
            "rate": "0.0125",
            "leftAmount": "2",
            "filledAmount": "0",
            "message": "Success",
            "code": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = OrderRequest::buy(Symbol::new("LTC", "BTC"), dec!(0.01250), dec!(2.0));
    let result = connector(&server).place_order(&request).await.unwrap();

    assert_eq!(result.order_id, "123456");
    assert_eq!(result.remaining_amount, Some(dec!(2)));
}

#[tokio::test]
async fn test_cancel_all_orders_body_and_string_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/cancelAllOrders"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("type=1&currencyPair=ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "true"})))
        .expect(1)
        .mount(&server)
        .await;

    connector(&server)
        .cancel_all_orders(CancelAllKind::Buy, &Symbol::new("LTC", "BTC"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_order_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/cancelOrder"))
        .and(body_string("orderNumber=42&currencyPair=ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "false",
            "code": 4,
            "message": "bad sig"
        })))
        .mount(&server)
        .await;

    let err = connector(&server)
        .cancel_order("42", &Symbol::new("LTC", "BTC"))
        .await
        .unwrap_err();

    match err {
        ExLinkError::Api {
            operation,
            code,
            message,
        } => {
            assert_eq!(operation, Operation::CancelOrder);
            assert_eq!(code, Some(4));
            assert_eq!(message, "bad sig");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_order_bool_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/cancelOrder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "code": 0,
            "message": "Success"
        })))
        .mount(&server)
        .await;

    connector(&server)
        .cancel_order("42", &Symbol::new("LTC", "BTC"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_open_orders() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/1/private/openOrders"))
        .and(body_string("currencyPair=ltc_btc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "true",
            "orders": [{
                "orderNumber": "11",
                "type": "buy",
                "rate": "0.01",
                "amount": "3",
                "filledAmount": "1",
                "currencyPair": "ltc_btc",
                "timestamp": "1506086183",
                "status": "open"
            }],
            "code": 0,
            "message": "Success"
        })))
        .mount(&server)
        .await;

    let orders = connector(&server)
        .get_open_orders(Some(&Symbol::new("LTC", "BTC")))
        .await
        .unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].filled_amount, Some(dec!(1)));
}

#[tokio::test]
async fn test_estimate_trade_fee() {
    let server = MockServer::start().await;
    mount_market_info(&server).await;
    let connector = connector(&server);

    let fee = connector
        .estimate_fee(&FeeRequest::Trade {
            symbol: Symbol::parse("ltc_btc").unwrap(),
            price: dec!(100),
            amount: dec!(2),
        })
        .await
        .unwrap();
    assert_eq!(fee, dec!(0.4));

    let err = connector
        .estimate_fee(&FeeRequest::Trade {
            symbol: Symbol::new("XRP", "BTC"),
            price: dec!(1),
            amount: dec!(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ExLinkError::FeeLookup { .. }));
}

#[tokio::test]
async fn test_estimate_withdrawal_fee() {
    let server = MockServer::start().await;
    let connector = connector(&server);

    let known = connector
        .estimate_fee(&FeeRequest::Withdrawal {
            currency: "btc".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(known, dec!(0.002));

    let unknown = connector
        .estimate_fee(&FeeRequest::Withdrawal {
            currency: "NOPE".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(unknown, Decimal::ZERO);
}

#[tokio::test]
async fn test_server_error_is_retryable_for_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = connector(&server).get_symbols().await.unwrap_err();
    assert!(matches!(err, ExLinkError::HttpStatus { status: 502, .. }));
    assert!(err.is_retryable());
}
