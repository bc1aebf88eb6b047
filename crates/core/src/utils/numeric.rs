//! Wire unions for loosely-typed venue JSON.
//!
//! Venues freely mix `1.23` and `"1.23"`, `true` and `"true"`, `{}` and `[]`
//! for the same field. Each union here is decoded once by serde and then
//! converted to a strict value at a single point, naming the field on failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::DecodeError;

/// A number that may arrive as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(serde_json::Number),
    Text(String),
}

impl NumericField {
    pub fn to_decimal(&self, field: &str) -> Result<Decimal, DecodeError> {
        let raw = match self {
            NumericField::Number(n) => n.to_string(),
            NumericField::Text(s) => s.trim().to_string(),
        };
        parse_decimal(&raw).ok_or_else(|| DecodeError::InvalidNumber {
            field: field.to_string(),
            value: raw,
        })
    }

    /// The raw text, for identifiers that are numeric on some venues and
    /// opaque strings on others.
    pub fn as_text(&self) -> String {
        match self {
            NumericField::Number(n) => n.to_string(),
            NumericField::Text(s) => s.trim().to_string(),
        }
    }

    pub fn to_i64(&self, field: &str) -> Result<i64, DecodeError> {
        let value = self.to_decimal(field)?;
        if !value.fract().is_zero() {
            return Err(DecodeError::InvalidNumber {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        i64::try_from(value).map_err(|_| DecodeError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    pub fn to_u32(&self, field: &str) -> Result<u32, DecodeError> {
        let value = self.to_i64(field)?;
        u32::try_from(value).map_err(|_| DecodeError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Parses plain (`"0.0125"`) and scientific (`"1e-5"`) notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Converts an arbitrary JSON value, accepting numbers and numeric strings
/// only.
pub fn decimal_from_value(value: &Value, field: &str) -> Result<Decimal, DecodeError> {
    match value {
        Value::Number(n) => NumericField::Number(n.clone()).to_decimal(field),
        Value::String(s) => NumericField::Text(s.clone()).to_decimal(field),
        other => Err(DecodeError::InvalidNumber {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// A success indicator sent as a literal boolean, a `"true"`/`"false"`
/// string, or a `1`/`0` integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl BoolFlag {
    pub fn to_bool(&self, field: &str) -> Result<bool, DecodeError> {
        match self {
            BoolFlag::Bool(b) => Ok(*b),
            BoolFlag::Int(1) => Ok(true),
            BoolFlag::Int(0) => Ok(false),
            BoolFlag::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            BoolFlag::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(DecodeError::InvalidFlag {
                field: field.to_string(),
                value: match other {
                    BoolFlag::Int(i) => i.to_string(),
                    BoolFlag::Text(s) => s.clone(),
                    BoolFlag::Bool(b) => b.to_string(),
                },
            }),
        }
    }

    pub fn from_value(value: &Value, field: &str) -> Result<bool, DecodeError> {
        let flag: BoolFlag =
            serde_json::from_value(value.clone()).map_err(|_| DecodeError::InvalidFlag {
                field: field.to_string(),
                value: value.to_string(),
            })?;
        flag.to_bool(field)
    }
}

/// A currency-keyed map that collapses to `[]` when it has no entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolymorphicMap {
    Map(HashMap<String, NumericField>),
    List(Vec<Value>),
}

impl PolymorphicMap {
    pub fn to_decimal_map(&self, field: &str) -> Result<HashMap<String, Decimal>, DecodeError> {
        match self {
            PolymorphicMap::Map(entries) => entries
                .iter()
                .map(|(currency, amount)| {
                    let amount = amount.to_decimal(&format!("{}.{}", field, currency))?;
                    Ok((currency.clone(), amount))
                })
                .collect(),
            PolymorphicMap::List(items) if items.is_empty() => Ok(HashMap::new()),
            PolymorphicMap::List(_) => Err(DecodeError::UnexpectedShape(format!(
                "`{}` is a non-empty list, expected an object",
                field
            ))),
        }
    }
}

impl Default for PolymorphicMap {
    fn default() -> Self {
        PolymorphicMap::List(Vec::new())
    }
}
