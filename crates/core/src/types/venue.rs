use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExLinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Gateio,
    Yobit,
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueId::Gateio => write!(f, "gateio"),
            VenueId::Yobit => write!(f, "yobit"),
        }
    }
}

impl FromStr for VenueId {
    type Err = ExLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gateio" | "gate.io" | "gate" => Ok(VenueId::Gateio),
            "yobit" => Ok(VenueId::Yobit),
            other => Err(ExLinkError::InvalidRequest(format!("Unknown venue: {}", other))),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl VenueCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for VenueCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_parsing() {
        assert_eq!("GateIO".parse::<VenueId>().unwrap(), VenueId::Gateio);
        assert_eq!("yobit".parse::<VenueId>().unwrap(), VenueId::Yobit);
        assert!("binance".parse::<VenueId>().is_err());
    }

    #[test]
    fn test_secret_is_redacted() {
        let creds = VenueCredentials::new("key", "super-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("key"));
        assert!(!debug.contains("super-secret"));
    }
}
