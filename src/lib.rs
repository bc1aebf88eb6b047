pub use exlink_core::config::{ExLinkConfig, LoggingConfig, RateLimitConfig, VenueConfig};
pub use exlink_exchange::prelude::*;
pub use exlink_monitoring::prelude::*;

// Re-export venue adapters
pub use exlink_gateio::GateioConnector;
pub use exlink_yobit::YobitConnector;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builds the connector for `venue` from its settings.
pub fn build_connector(venue: VenueId, config: &VenueConfig) -> Result<Arc<dyn VenueConnector>> {
    build_connector_inner(venue, config, None)
}

/// Like [`build_connector`], with every request observing `token`.
pub fn build_cancellable_connector(
    venue: VenueId,
    config: &VenueConfig,
    token: CancellationToken,
) -> Result<Arc<dyn VenueConnector>> {
    build_connector_inner(venue, config, Some(token))
}

fn build_connector_inner(
    venue: VenueId,
    config: &VenueConfig,
    token: Option<CancellationToken>,
) -> Result<Arc<dyn VenueConnector>> {
    if !config.enabled {
        return Err(ExLinkError::InvalidRequest(format!(
            "Venue {} is disabled in the configuration",
            venue
        )));
    }

    let connector: Arc<dyn VenueConnector> = match (venue, token) {
        (VenueId::Gateio, None) => Arc::new(GateioConnector::from_venue_config(config)?),
        (VenueId::Gateio, Some(token)) => {
            Arc::new(GateioConnector::from_venue_config(config)?.with_cancellation(token))
        }
        (VenueId::Yobit, None) => Arc::new(YobitConnector::from_venue_config(config)?),
        (VenueId::Yobit, Some(token)) => {
            Arc::new(YobitConnector::from_venue_config(config)?.with_cancellation(token))
        }
    };
    Ok(connector)
}

/// Connectors for every enabled venue in the configuration.
pub fn build_enabled_connectors(config: &ExLinkConfig) -> Result<Vec<Arc<dyn VenueConnector>>> {
    let mut venues: Vec<_> = config
        .venues
        .iter()
        .filter(|(_, venue)| venue.enabled)
        .collect();
    venues.sort_by_key(|(id, _)| id.to_string());

    venues
        .into_iter()
        .map(|(id, venue)| build_connector(*id, venue))
        .collect()
}
