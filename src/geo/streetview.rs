//! Street View metadata client used to verify that sampled targets have imagery.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Coordinate, GeoError, GeoProvider, RegionBounds, sampling::sample_candidate};

const DEFAULT_METADATA_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
const DEFAULT_SEARCH_RADIUS_M: u32 = 50_000;
/// Attempt ceiling before reporting the location as unavailable.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Runtime configuration describing how to reach the metadata endpoint.
#[derive(Debug, Clone)]
pub struct StreetViewConfig {
    pub api_key: String,
    pub metadata_url: String,
    pub search_radius_m: u32,
    pub max_attempts: u32,
    /// First pause after a failed or throttled request; doubles up to a fixed cap.
    pub initial_backoff: Duration,
}

impl StreetViewConfig {
    /// Configuration pointing at the public endpoint with default search settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            metadata_url: DEFAULT_METADATA_URL.into(),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }

    /// Override the attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Read `STREETVIEW_API_KEY` (required) and `STREETVIEW_METADATA_URL` (optional).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("STREETVIEW_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("STREETVIEW_METADATA_URL") {
            config.metadata_url = url;
        }
        Some(config)
    }
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    status: String,
    #[serde(default)]
    copyright: Option<String>,
    #[serde(default)]
    location: Option<Coordinate>,
}

enum Probe {
    Found(Coordinate),
    /// No imagery near the candidate; draw another one right away.
    Miss,
    /// Quota or transient server trouble; wait before the next request.
    Throttled(String),
    Rejected(String),
}

/// Provider that keeps a random candidate only when an outdoor panorama is nearby.
#[derive(Clone)]
pub struct StreetViewProvider {
    client: Client,
    config: Arc<StreetViewConfig>,
}

impl StreetViewProvider {
    /// Build a provider with a fresh HTTP client.
    pub fn new(config: StreetViewConfig) -> Result<Self, GeoError> {
        let client = Client::builder()
            .build()
            .map_err(|source| GeoError::Provider {
                message: "failed to build HTTP client".into(),
                source: Box::new(source),
            })?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    async fn probe(&self, candidate: Coordinate) -> Result<Probe, GeoError> {
        let location = format!("{},{}", candidate.lat, candidate.lng);
        let radius = self.config.search_radius_m.to_string();
        let response = self
            .client
            .get(&self.config.metadata_url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("source", "outdoor"),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|source| GeoError::Provider {
                message: "metadata request could not be sent".into(),
                source: Box::new(source),
            })?;

        let payload = response
            .json::<MetadataResponse>()
            .await
            .map_err(|source| GeoError::Provider {
                message: "metadata response could not be decoded".into(),
                source: Box::new(source),
            })?;

        match payload.status.as_str() {
            "OK" => match (payload.location, payload.copyright) {
                (Some(found), Some(_)) if found.is_valid() => Ok(Probe::Found(found)),
                _ => Ok(Probe::Miss),
            },
            "ZERO_RESULTS" | "NOT_FOUND" => Ok(Probe::Miss),
            "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR" => Ok(Probe::Throttled(payload.status.clone())),
            other => Ok(Probe::Rejected(other.to_owned())),
        }
    }
}

impl GeoProvider for StreetViewProvider {
    fn sample_valid_coordinate(
        &self,
        bounds: RegionBounds,
    ) -> BoxFuture<'static, Result<Coordinate, GeoError>> {
        let provider = self.clone();
        Box::pin(async move {
            let attempts = provider.config.max_attempts;
            let mut delay = provider.config.initial_backoff;
            for attempt in 1..=attempts {
                let candidate = sample_candidate(&bounds, &mut rand::rng());
                match provider.probe(candidate).await {
                    Ok(Probe::Found(found)) => {
                        debug!(attempt, lat = found.lat, lng = found.lng, "imagery found");
                        return Ok(found);
                    }
                    Ok(Probe::Miss) => continue,
                    Ok(Probe::Rejected(status)) => {
                        return Err(GeoError::Provider {
                            message: format!("metadata endpoint rejected the request ({status})"),
                            source: Box::new(std::io::Error::other(status)),
                        });
                    }
                    Ok(Probe::Throttled(status)) => {
                        warn!(attempt, %status, ?delay, "metadata endpoint throttled; backing off");
                    }
                    Err(err) => {
                        warn!(attempt, error = %err, ?delay, "imagery probe failed; backing off");
                    }
                }
                if attempt < attempts {
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
            Err(GeoError::Unavailable { attempts })
        })
    }
}
