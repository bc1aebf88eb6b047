//! Prelude module - re-exports commonly used types for convenience

pub use crate::error::{DecodeError, ExLinkError, ResponseError, Result};
pub use crate::types::{
    account::*,
    market::*,
    operation::*,
    order::*,
    venue::*,
};

// Re-export commonly used external types
pub use rust_decimal::Decimal;
pub use chrono::{DateTime, Utc};
