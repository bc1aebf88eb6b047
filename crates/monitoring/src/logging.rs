use rust_decimal::Decimal;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use exlink_core::config::LoggingConfig;
use exlink_core::prelude::*;

/// Keeps the background file writer alive; logs written after this is
/// dropped may be lost.
#[must_use]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// `RUST_LOG` wins over the configured level when it is set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

pub fn setup_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_filter(&config.level);

    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    if config.json {
        layers.push(console_layer.json().boxed());
    } else {
        layers.push(console_layer.boxed());
    }

    let mut file_guard = None;
    if let Some(log_file) = &config.file {
        let directory = log_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = log_file
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("exlink.log"));
        let (writer, guard) = non_blocking(rolling::daily(directory, file_name));
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        if config.json {
            layers.push(file_layer.json().boxed());
        } else {
            layers.push(file_layer.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| ExLinkError::Logging(e.to_string()))?;

    info!("Logging initialized with level: {}", config.level);

    Ok(LoggingGuard { _file: file_guard })
}

/// Structured events for venue-side effects, tagged with the venue.
pub struct StructuredLogger {
    venue: VenueId,
}

impl StructuredLogger {
    pub fn new(venue: VenueId) -> Self {
        Self { venue }
    }

    pub fn log_order_placed(&self, request: &OrderRequest, order_id: &str) {
        info!(
            venue = %self.venue,
            event = "order_placed",
            symbol = %request.symbol,
            side = %request.side,
            price = %request.price,
            amount = %request.amount,
            order_id = %order_id,
            "Order placed"
        );
    }

    pub fn log_order_cancelled(&self, symbol: &Symbol, order_id: Option<&str>) {
        info!(
            venue = %self.venue,
            event = "order_cancelled",
            symbol = %symbol,
            order_id = ?order_id,
            "Order cancelled"
        );
    }

    pub fn log_fee_estimate(&self, request: &FeeRequest, fee: Decimal) {
        info!(
            venue = %self.venue,
            event = "fee_estimate",
            request = ?request,
            fee = %fee,
            "Fee estimated"
        );
    }

    pub fn log_error(&self, err: &ExLinkError) {
        match err {
            ExLinkError::OutcomeUnknown { operation } => warn!(
                venue = %self.venue,
                event = "outcome_unknown",
                operation = %operation,
                "Write cancelled in flight; reconcile with the venue"
            ),
            _ => error!(
                venue = %self.venue,
                event = "error",
                operation = ?err.operation(),
                retryable = err.is_retryable(),
                error = %err,
                "Request failed"
            ),
        }
    }
}
