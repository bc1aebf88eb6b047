//! Prelude module for exlink-exchange
//!
//! Re-exports commonly used types and traits

pub use crate::traits::{DefaultExchangeConfig, ExchangeConfig, VenueConnector};

pub use crate::fees::{FeeEstimator, FeeTable};
pub use crate::normalizer::{EnvelopeSpec, WireOrder};
pub use crate::rate_limiter::RateLimiter;
pub use crate::rest::{build_url, HttpDispatcher, HttpRequest};
pub use crate::signer::{FormBody, HmacAlgorithm, HmacSigner, RequestSigner};

// Re-export common types from core
pub use exlink_core::prelude::*;
