//! Turns raw venue response bodies into domain values.
//!
//! Everything here is a pure function over bytes or [`serde_json::Value`];
//! adapters describe their wire quirks (envelope field names, book ordering)
//! and the shared decoding lives in one place.

use exlink_core::utils::{decimal_from_value, unix_to_datetime, BoolFlag, NumericField};
use exlink_core::{DecodeError, Kline, OrderbookItem, ResponseError, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

/// Where a venue puts its success flag, error details and payload in an
/// authenticated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSpec {
    pub success_field: &'static str,
    pub code_field: Option<&'static str>,
    pub message_field: &'static str,
    /// `None` means the payload fields sit next to the flag.
    pub payload_field: Option<&'static str>,
}

impl EnvelopeSpec {
    pub const fn new(success_field: &'static str, message_field: &'static str) -> Self {
        Self {
            success_field,
            code_field: None,
            message_field,
            payload_field: None,
        }
    }

    pub const fn with_code(mut self, field: &'static str) -> Self {
        self.code_field = Some(field);
        self
    }

    pub const fn with_payload(mut self, field: &'static str) -> Self {
        self.payload_field = Some(field);
        self
    }
}

/// Order in which a venue lists one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOrder {
    BestFirst,
    WorstFirst,
}

pub fn parse_json(body: &[u8]) -> Result<Value, ResponseError> {
    Ok(serde_json::from_slice(body)?)
}

pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ResponseError> {
    Ok(serde_json::from_slice(body)?)
}

/// Validates the success flag and returns the payload. The flag is checked
/// before anything else in the body is looked at.
pub fn check_envelope(body: &[u8], spec: &EnvelopeSpec) -> Result<Value, ResponseError> {
    let value = parse_json(body)?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::UnexpectedShape("response is not a JSON object".to_string()).into());
    };

    let flag = object
        .get(spec.success_field)
        .ok_or_else(|| DecodeError::MissingField(spec.success_field.to_string()))?;
    ensure_success(flag, &object, spec)?;

    match spec.payload_field {
        Some(field) => object
            .remove(field)
            .ok_or_else(|| DecodeError::MissingField(field.to_string()).into()),
        None => Ok(Value::Object(object)),
    }
}

pub fn decode_envelope<T: DeserializeOwned>(
    body: &[u8],
    spec: &EnvelopeSpec,
) -> Result<T, ResponseError> {
    let payload = check_envelope(body, spec)?;
    Ok(serde_json::from_value(payload)?)
}

/// Public endpoints only sometimes carry a success flag; when they do it
/// must hold.
pub fn check_optional_flag(value: &Value, spec: &EnvelopeSpec) -> Result<(), ResponseError> {
    if let Value::Object(object) = value {
        if let Some(flag) = object.get(spec.success_field) {
            ensure_success(flag, object, spec)?;
        }
    }
    Ok(())
}

fn ensure_success(
    flag: &Value,
    object: &Map<String, Value>,
    spec: &EnvelopeSpec,
) -> Result<(), ResponseError> {
    if BoolFlag::from_value(flag, spec.success_field)? {
        return Ok(());
    }

    let code = spec
        .code_field
        .and_then(|field| object.get(field))
        .and_then(|raw| serde_json::from_value::<NumericField>(raw.clone()).ok())
        .and_then(|raw| raw.to_i64("code").ok());

    let message = match object.get(spec.message_field) {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Err(ResponseError::Rejected { code, message })
}

/// Decodes one side of a depth snapshot into best-first order.
///
/// Rows that are too short, unparseable or negative are dropped; a side with
/// nothing left is an error.
pub fn decode_book_side(
    rows: &[Value],
    side: Side,
    order: WireOrder,
) -> Result<Vec<OrderbookItem>, ResponseError> {
    let mut items: Vec<OrderbookItem> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| match decode_book_row(row) {
            Ok(item) => Some(item),
            Err(reason) => {
                warn!("Skipping {} row {}: {} ({})", side, index, reason, row);
                None
            }
        })
        .collect();

    if order == WireOrder::WorstFirst {
        items.reverse();
    }

    if items.is_empty() {
        return Err(ResponseError::EmptySide(side));
    }
    Ok(items)
}

fn decode_book_row(row: &Value) -> Result<OrderbookItem, DecodeError> {
    let fields = row
        .as_array()
        .filter(|fields| fields.len() >= 2)
        .ok_or_else(|| DecodeError::UnexpectedShape("expected [price, amount]".to_string()))?;

    let price = decimal_from_value(&fields[0], "price")?;
    let amount = decimal_from_value(&fields[1], "amount")?;

    if price.is_sign_negative() || amount.is_sign_negative() {
        return Err(DecodeError::UnexpectedShape("negative price or amount".to_string()));
    }
    Ok(OrderbookItem::new(price, amount))
}

const KLINE_FIELDS: [&str; 6] = ["time", "volume", "close", "high", "low", "open"];

/// Decodes `{"data": [[time, volume, close, high, low, open], ...]}` into
/// candles sorted oldest first. One bad field fails the whole series.
pub fn decode_klines(value: &Value) -> Result<Vec<Kline>, ResponseError> {
    let rows = value
        .get("data")
        .ok_or_else(|| DecodeError::MissingField("data".to_string()))?
        .as_array()
        .ok_or_else(|| DecodeError::UnexpectedShape("`data` is not an array".to_string()))?;

    let mut klines = rows
        .iter()
        .enumerate()
        .map(|(index, row)| decode_kline_row(index, row))
        .collect::<Result<Vec<_>, DecodeError>>()?;

    klines.sort_by_key(|kline| kline.id);
    Ok(klines)
}

fn decode_kline_row(index: usize, row: &Value) -> Result<Kline, DecodeError> {
    let fields = row.as_array().ok_or_else(|| {
        DecodeError::UnexpectedShape(format!("kline row {} is not an array", index))
    })?;

    let field = |position: usize| -> Result<Decimal, DecodeError> {
        let name = KLINE_FIELDS[position];
        let raw = fields.get(position).ok_or_else(|| DecodeError::KlineField {
            row: index,
            field: name,
            value: "<missing>".to_string(),
        })?;
        decimal_from_value(raw, name).map_err(|_| DecodeError::KlineField {
            row: index,
            field: name,
            value: raw.to_string(),
        })
    };

    let time = field(0)?;
    let invalid_time = || DecodeError::KlineField {
        row: index,
        field: KLINE_FIELDS[0],
        value: time.to_string(),
    };
    let id = time.trunc().to_i64().ok_or_else(invalid_time)?;
    let open_time = unix_to_datetime(id).ok_or_else(invalid_time)?;

    Ok(Kline {
        id,
        open_time,
        volume: field(1)?,
        close: field(2)?,
        high: field(3)?,
        low: field(4)?,
        open: field(5)?,
    })
}
