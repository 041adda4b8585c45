//! OpenStreetMap Nominatim reverse geocoder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use frunch_core::defaults::{
    GEOCODE_TIMEOUT_SECS, NOMINATIM_URL, NOMINATIM_USER_AGENT, NOMINATIM_ZOOM,
};
use frunch_core::{Address, Error, GeoPoint, GeocodeClient, Result};

/// Connection settings for [`NominatimClient`].
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Full URL of the `reverse` endpoint.
    pub url: String,
    /// Nominatim rejects requests without an identifying user agent.
    pub user_agent: String,
    pub zoom: u8,
    pub timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            url: NOMINATIM_URL.to_string(),
            user_agent: NOMINATIM_USER_AGENT.to_string(),
            zoom: NOMINATIM_ZOOM,
            timeout: Duration::from_secs(GEOCODE_TIMEOUT_SECS),
        }
    }
}

impl NominatimConfig {
    /// Create from environment variables (`NOMINATIM_URL`, `NOMINATIM_USER_AGENT`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("NOMINATIM_URL") {
            config.url = url;
        }
        if let Ok(agent) = std::env::var("NOMINATIM_USER_AGENT") {
            config.user_agent = agent;
        }
        config
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

impl ReverseAddress {
    fn into_address(self) -> Address {
        let city = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.hamlet)
            .or(self.municipality);
        Address {
            city,
            region: self.state,
            country: self.country,
            country_code: self.country_code,
        }
    }
}

/// Reverse geocoder backed by a Nominatim `reverse` endpoint.
pub struct NominatimClient {
    client: Client,
    url: String,
    zoom: u8,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: config.url,
            zoom: config.zoom,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(NominatimConfig::from_env())
    }
}

#[async_trait]
impl GeocodeClient for NominatimClient {
    #[instrument(skip(self), fields(subsystem = "remote", component = "nominatim", op = "reverse"))]
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Address>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("format", "json".to_string()),
                ("zoom", self.zoom.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Geocode(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Geocode(format!("nominatim returned HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Geocode(e.to_string()))?;

        // A body we cannot read is an answer without usable data, not a failed request.
        let parsed: ReverseResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unparseable geocode response");
                return Ok(None);
            }
        };

        let address = parsed.address.map(ReverseAddress::into_address);
        debug!(found = address.is_some(), "Geocode response");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_fallback_order() {
        let addr = ReverseAddress {
            village: Some("Smallville".to_string()),
            municipality: Some("Lowell County".to_string()),
            ..Default::default()
        }
        .into_address();
        assert_eq!(addr.city.as_deref(), Some("Smallville"));

        let addr = ReverseAddress {
            city: Some("Paris".to_string()),
            town: Some("Ignored".to_string()),
            ..Default::default()
        }
        .into_address();
        assert_eq!(addr.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_state_maps_to_region() {
        let body = r#"{"address":{"town":"Truckee","state":"California","country":"United States","country_code":"us"}}"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        let addr = parsed.address.unwrap().into_address();
        assert_eq!(addr.place_name("us").as_deref(), Some("Truckee, California"));
    }

    #[test]
    fn test_error_body_has_no_address() {
        let parsed: ReverseResponse =
            serde_json::from_str(r#"{"error":"Unable to geocode"}"#).unwrap();
        assert!(parsed.address.is_none());
    }
}
