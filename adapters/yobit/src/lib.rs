//! YoBit Exchange Adapter
//!
//! Implementation of the VenueConnector trait for the YoBit v3 public API
//! and its trade API

pub mod client;
pub mod model;

pub use client::{default_fee_table, YobitConnector, YOBIT_API_URL, YOBIT_ENVELOPE};
