//! Gate.io Exchange Adapter
//!
//! Implementation of the VenueConnector trait for the Gate.io v2 REST API

pub mod client;
pub mod model;

pub use client::{
    GateioConnector, GATEIO_API_VERSION, GATEIO_ENVELOPE, GATEIO_MARKET_URL, GATEIO_TRADE_URL,
};
